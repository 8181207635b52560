use actix_web::{
    delete, get,
    http::{header, Method},
    post, route, web, HttpRequest, HttpResponse, Responder,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::dates::format_http_date;
use crate::error::{ContentError, StoreError, UpstreamError};
use crate::widgets::{Widget, WidgetSetup};
use crate::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(validate_token)
        .service(validate_database)
        .service(create_widget)
        .service(list_widgets)
        .service(delete_widget)
        .service(widget_feed)
        .service(widget_content);
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseBody {
    token: Option<String>,
    database_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedQuery {
    refresh: Option<String>,
}

#[post("/api/validate-token")]
async fn validate_token(
    body: web::Json<TokenBody>,
    app_data: web::Data<AppState>,
) -> impl Responder {
    let Some(token) = body.token.as_deref().filter(|t| !t.is_empty()) else {
        return bad_request("Token is required");
    };

    let is_valid = app_data.content.verify_credential(token).await;
    let message = if is_valid { "Token is valid" } else { "Invalid token" };
    HttpResponse::Ok().json(json!({ "success": is_valid, "message": message }))
}

#[post("/api/validate-database")]
async fn validate_database(
    body: web::Json<DatabaseBody>,
    app_data: web::Data<AppState>,
) -> impl Responder {
    let (Some(token), Some(database_url)) = (
        body.token.as_deref().filter(|t| !t.is_empty()),
        body.database_url.as_deref().filter(|u| !u.is_empty()),
    ) else {
        return bad_request("Token and database URL are required");
    };

    match app_data.content.describe_source(token, database_url).await {
        Ok(summary) => {
            let message = if summary.has_required_properties {
                "Database is accessible and properly configured"
            } else {
                "Database is accessible but may need 'Name' and 'Cover Photo' properties"
            };
            HttpResponse::Ok().json(json!({
                "success": true,
                "message": message,
                "properties": summary.properties,
            }))
        }
        Err(ContentError::Extraction(_)) => HttpResponse::Ok().json(json!({
            "success": false,
            "message": "Invalid database URL format",
        })),
        Err(ContentError::Upstream(e)) => {
            info!(error = %e, "database validation rejected");
            let message = match &e {
                UpstreamError::Api { message, .. } if !message.is_empty() => message.as_str(),
                _ => "Cannot access database. Check permissions.",
            };
            HttpResponse::Ok().json(json!({ "success": false, "message": message }))
        }
    }
}

#[post("/api/widgets")]
async fn create_widget(
    body: web::Json<WidgetSetup>,
    app_data: web::Data<AppState>,
) -> impl Responder {
    let setup = body.into_inner();
    if let Err(errors) = setup.validate() {
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "message": "Validation failed",
            "errors": errors,
        }));
    }

    let content = &app_data.content;
    let (token_valid, db_valid) = futures::join!(
        content.verify_credential(&setup.notion_token),
        content.verify_source_access(&setup.notion_token, &setup.database_url),
    );

    if !token_valid {
        return bad_request("Invalid Notion token");
    }
    if !db_valid {
        return bad_request("Cannot access Notion database");
    }

    match app_data.widgets.create(setup).await {
        Ok(widget) => {
            info!(widget = %widget.id, token = %widget.token, "widget created");
            HttpResponse::Ok().json(json!({
                "success": true,
                "widget": public_view(&widget),
            }))
        }
        Err(e) => store_failure("Failed to create widget", e),
    }
}

#[get("/api/widgets")]
async fn list_widgets(app_data: web::Data<AppState>) -> impl Responder {
    match app_data.widgets.list().await {
        Ok(widgets) => HttpResponse::Ok().json(json!({
            "success": true,
            "widgets": widgets.iter().map(public_view).collect::<Vec<_>>(),
        })),
        Err(e) => store_failure("Failed to fetch widgets", e),
    }
}

#[delete("/api/widgets/{id}")]
async fn delete_widget(id: web::Path<String>, app_data: web::Data<AppState>) -> impl Responder {
    match app_data.widgets.delete(&id).await {
        Ok(true) => {
            info!(widget = %id, "widget deleted");
            HttpResponse::Ok().json(json!({ "success": true, "message": "Widget deleted" }))
        }
        Ok(false) => not_found(),
        Err(e) => store_failure("Failed to delete widget", e),
    }
}

/// Feed consumed by the embedded grid. `?refresh=true` skips the cache.
#[route("/api/widget/{token}", method = "GET", method = "HEAD")]
async fn widget_feed(
    token: web::Path<String>,
    query: web::Query<FeedQuery>,
    app_data: web::Data<AppState>,
    req: HttpRequest,
) -> impl Responder {
    let widget = match app_data.widgets.get_by_token(&token).await {
        Ok(Some(widget)) => widget,
        Ok(None) => return not_found(),
        Err(e) => return store_failure("Failed to fetch widget", e),
    };

    let bypass_cache = query.refresh.as_deref() == Some("true");
    if bypass_cache {
        info!(token = %widget.token, "cache bypass requested");
    }

    let summary = json!({
        "id": widget.id,
        "title": widget.title,
        "instagramHandle": widget.instagram_handle,
        "isActive": widget.is_active,
    });

    let body = match app_data
        .content
        .fetch_content(&widget.notion_token, &widget.database_url, bypass_cache)
        .await
    {
        Ok(posts) => json!({ "success": true, "widget": summary, "posts": posts }),
        Err(e) => {
            error!(token = %widget.token, error = %e, "failed to fetch Notion data");
            json!({
                "success": true,
                "widget": summary,
                "posts": [],
                "error": format!("Failed to fetch content from Notion: {e}"),
            })
        }
    };

    create_response(&req, &widget, &body, app_data.config.feed_max_age)
}

#[get("/api/widgets/{token}")]
async fn widget_content(
    token: web::Path<String>,
    app_data: web::Data<AppState>,
) -> impl Responder {
    let widget = match app_data.widgets.get_by_token(&token).await {
        Ok(Some(widget)) => widget,
        Ok(None) => return not_found(),
        Err(e) => return store_failure("Failed to fetch widget", e),
    };

    let summary = json!({
        "id": widget.id,
        "title": widget.title,
        "gridSize": widget.grid_size,
        "instagramHandle": widget.instagram_handle,
        "isActive": widget.is_active,
    });

    match app_data
        .content
        .fetch_content(&widget.notion_token, &widget.database_url, false)
        .await
    {
        Ok(posts) => HttpResponse::Ok().json(json!({
            "success": true,
            "widget": summary,
            "content": posts,
        })),
        Err(e) => {
            error!(token = %widget.token, error = %e, "failed to fetch Notion data");
            HttpResponse::Ok().json(json!({
                "success": true,
                "widget": summary,
                "content": [],
                "error": "Failed to fetch content from Notion",
            }))
        }
    }
}

fn create_response(req: &HttpRequest, widget: &Widget, body: &Value, max_age: u32) -> HttpResponse {
    let now = Utc::now();
    let updated = format_http_date(now);
    let payload = body.to_string();

    let mut response = HttpResponse::Ok();
    response.insert_header((header::CONTENT_TYPE, "application/json"));
    response.insert_header((
        header::CACHE_CONTROL,
        format!("public, max-age={max_age}, must-revalidate"),
    ));
    response.insert_header((
        header::ETAG,
        format!("\"{}-{}\"", widget.token, now.timestamp_millis()),
    ));
    response.insert_header((header::LAST_MODIFIED, updated.clone()));
    response.insert_header((header::VARY, "Accept-Encoding"));
    response.insert_header(("X-Widget-Updated", updated));
    response.insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"));

    if req.method() == Method::HEAD {
        response
            .insert_header((header::CONTENT_LENGTH, payload.len()))
            .finish()
    } else {
        response.body(payload)
    }
}

fn public_view(widget: &Widget) -> Value {
    json!({
        "id": widget.id,
        "token": widget.token,
        "title": widget.title,
        "gridSize": widget.grid_size,
        "instagramHandle": widget.instagram_handle,
        "isActive": widget.is_active,
        "createdAt": widget.created_at.to_rfc3339(),
    })
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "success": false, "message": message }))
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "success": false, "message": "Widget not found" }))
}

fn store_failure(message: &str, e: StoreError) -> HttpResponse {
    error!(error = %e, "{message}");
    HttpResponse::InternalServerError().json(json!({ "success": false, "message": message }))
}
