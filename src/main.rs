use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use clap::Parser;
use notion_grid_widget::{database, notion::NotionClient, routes, AppState, Args};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notion_grid_widget=info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let address = format!("{}:{}", args.ip, args.port);

    let conn = database::init_db(&args.db_path).await.map_err(|e| {
        error!(error = %e, path = %args.db_path, "failed to initialize database");
        std::io::Error::new(std::io::ErrorKind::Other, "Database initialization failed")
    })?;

    let notion = NotionClient::new(&args.notion_api_url, &args.notion_version).map_err(|e| {
        error!(error = %e, "failed to build Notion client");
        std::io::Error::new(std::io::ErrorKind::Other, "Notion client initialization failed")
    })?;

    info!(
        cache_lifetime = args.cache_lifetime,
        cache_capacity = args.cache_capacity,
        "content cache configured"
    );

    let app_state = web::Data::new(AppState::new(args, conn.clone(), Arc::new(notion)));

    info!("Server running at http://{}", address);
    let res = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind(&address)?
    .run()
    .await;

    let _ = conn.close().await;
    res
}
