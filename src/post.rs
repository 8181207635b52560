use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dates::parse_post_date;
use crate::notion::Page;

pub const MAX_POSTS: usize = 9;
pub const UNTITLED: &str = "Untitled Post";

const COVER_PROPERTIES: [&str; 5] = ["Cover Photo", "cover photo", "Cover", "Photo", "Image"];
const DATE_PROPERTIES: [&str; 4] = ["Date", "date", "Created", "Published"];
const TITLE_PROPERTIES: [&str; 4] = ["Name", "Title", "name", "title"];

/// A calendar entry reduced to what the grid renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub cover_photo: Option<String>,
    pub date: Option<String>,
    pub url: String,
}

impl Post {
    pub fn from_page(page: &Page) -> Self {
        let props = &page.properties;

        Post {
            id: page.id.clone(),
            title: first_present(props, &TITLE_PROPERTIES)
                .and_then(title_text)
                .unwrap_or_else(|| UNTITLED.to_string()),
            cover_photo: first_yielding(props, &COVER_PROPERTIES, file_url),
            date: first_present(props, &DATE_PROPERTIES).and_then(date_value),
            url: page.url.clone(),
        }
    }
}

/// Keeps posts with a cover photo, newest first, at most [`MAX_POSTS`].
/// Undated posts go last; equal dates keep their incoming order.
pub fn arrange(posts: Vec<Post>) -> Vec<Post> {
    let mut posts: Vec<Post> = posts
        .into_iter()
        .filter(|post| post.cover_photo.is_some())
        .collect();

    posts.sort_by_cached_key(|post| Reverse(post.date.as_deref().and_then(parse_post_date)));
    posts.truncate(MAX_POSTS);
    posts
}

/// The first candidate column the page has, populated or not.
fn first_present<'a>(props: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| props.get(*name))
}

/// The first candidate column that produces a value.
fn first_yielding(
    props: &Map<String, Value>,
    names: &[&str],
    extract: fn(&Value) -> Option<String>,
) -> Option<String> {
    names
        .iter()
        .filter_map(|name| props.get(*name))
        .find_map(extract)
}

fn file_url(prop: &Value) -> Option<String> {
    let file = prop.get("files")?.as_array()?.first()?;
    file.pointer("/file/url")
        .or_else(|| file.pointer("/external/url"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn date_value(prop: &Value) -> Option<String> {
    prop.pointer("/date/start")
        .and_then(Value::as_str)
        .or_else(|| prop.get("created_time").and_then(Value::as_str))
        .map(str::to_string)
}

fn title_text(prop: &Value) -> Option<String> {
    let segment = |key: &str| -> Option<String> {
        prop.get(key)?
            .as_array()?
            .first()?
            .get("plain_text")?
            .as_str()
            .map(str::to_string)
    };
    segment("title").or_else(|| segment("rich_text"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(properties: Value) -> Page {
        Page {
            id: "page-1".into(),
            url: "https://www.notion.so/page-1".into(),
            created_time: Some("2023-01-01T00:00:00.000Z".into()),
            properties: properties.as_object().cloned().unwrap_or_default(),
        }
    }

    fn post(id: &str, cover: Option<&str>, date: Option<&str>) -> Post {
        Post {
            id: id.into(),
            title: id.into(),
            cover_photo: cover.map(str::to_string),
            date: date.map(str::to_string),
            url: format!("https://www.notion.so/{id}"),
        }
    }

    #[test]
    fn normalizes_a_typical_page() {
        let page = page(json!({
            "Name": { "type": "title", "title": [{ "plain_text": "Launch day" }] },
            "Cover Photo": { "type": "files", "files": [{ "name": "a.jpg", "file": { "url": "https://s3/a.jpg" } }] },
            "Date": { "type": "date", "date": { "start": "2024-03-01", "end": null } }
        }));

        let post = Post::from_page(&page);
        assert_eq!(post.id, "page-1");
        assert_eq!(post.title, "Launch day");
        assert_eq!(post.cover_photo.as_deref(), Some("https://s3/a.jpg"));
        assert_eq!(post.date.as_deref(), Some("2024-03-01"));
        assert_eq!(post.url, "https://www.notion.so/page-1");
    }

    #[test]
    fn cover_photo_property_wins_over_image() {
        let page = page(json!({
            "Image": { "files": [{ "external": { "url": "https://cdn/image.png" } }] },
            "Cover Photo": { "files": [{ "external": { "url": "https://cdn/cover.png" } }] }
        }));
        assert_eq!(
            Post::from_page(&page).cover_photo.as_deref(),
            Some("https://cdn/cover.png")
        );
    }

    #[test]
    fn empty_cover_falls_through_to_next_name() {
        let page = page(json!({
            "Cover Photo": { "files": [] },
            "Photo": { "files": [{ "external": { "url": "https://cdn/photo.png" } }] }
        }));
        assert_eq!(
            Post::from_page(&page).cover_photo.as_deref(),
            Some("https://cdn/photo.png")
        );
    }

    #[test]
    fn uploaded_file_preferred_over_external() {
        let page = page(json!({
            "Cover": { "files": [{
                "file": { "url": "https://s3/uploaded.png" },
                "external": { "url": "https://cdn/external.png" }
            }] }
        }));
        assert_eq!(
            Post::from_page(&page).cover_photo.as_deref(),
            Some("https://s3/uploaded.png")
        );
    }

    #[test]
    fn empty_name_column_shadows_later_title_column() {
        let page = page(json!({
            "Name": { "type": "title", "title": [] },
            "Title": { "type": "rich_text", "rich_text": [{ "plain_text": "Caption" }] }
        }));
        assert_eq!(Post::from_page(&page).title, UNTITLED);
    }

    #[test]
    fn empty_date_column_shadows_created_column() {
        let page = page(json!({
            "Date": { "type": "date", "date": null },
            "Created": { "type": "created_time", "created_time": "2024-02-10T09:00:00.000Z" }
        }));
        assert_eq!(Post::from_page(&page).date, None);
    }

    #[test]
    fn date_falls_back_to_created_time_property() {
        let page = page(json!({
            "Created": { "type": "created_time", "created_time": "2024-02-10T09:00:00.000Z" }
        }));
        assert_eq!(
            Post::from_page(&page).date.as_deref(),
            Some("2024-02-10T09:00:00.000Z")
        );
    }

    #[test]
    fn page_without_date_property_has_no_date() {
        let page = page(json!({ "Name": { "title": [] } }));
        assert_eq!(Post::from_page(&page).date, None);
    }

    #[test]
    fn title_from_rich_text_and_default() {
        let rich = page(json!({
            "Title": { "type": "rich_text", "rich_text": [{ "plain_text": "Caption" }, { "plain_text": "ignored" }] }
        }));
        assert_eq!(Post::from_page(&rich).title, "Caption");

        let untitled = page(json!({ "Name": { "title": [] } }));
        assert_eq!(Post::from_page(&untitled).title, UNTITLED);
    }

    #[test]
    fn serializes_camel_case_with_nulls() {
        let value = serde_json::to_value(post("a", Some("https://x/a.png"), None)).unwrap();
        assert_eq!(value["coverPhoto"], "https://x/a.png");
        assert!(value["date"].is_null());
    }

    #[test]
    fn arrange_orders_newest_first_with_undated_last() {
        let posts = vec![
            post("jan", Some("c"), Some("2024-01-01")),
            post("none", Some("c"), None),
            post("mar", Some("c"), Some("2024-03-01")),
        ];
        let ids: Vec<_> = arrange(posts).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["mar", "jan", "none"]);
    }

    #[test]
    fn arrange_drops_posts_without_cover() {
        let posts = vec![
            post("with", Some("c"), Some("2024-01-01")),
            post("without", None, Some("2024-05-01")),
        ];
        let ids: Vec<_> = arrange(posts).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["with"]);
    }

    #[test]
    fn arrange_keeps_nine_newest() {
        let posts: Vec<_> = (1..=15)
            .map(|day| post(&format!("d{day}"), Some("c"), Some(&format!("2024-01-{day:02}"))))
            .collect();
        let ids: Vec<_> = arrange(posts).into_iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            ["d15", "d14", "d13", "d12", "d11", "d10", "d9", "d8", "d7"]
        );
    }

    #[test]
    fn arrange_mixes_date_formats() {
        let posts = vec![
            post("plain", Some("c"), Some("2024-03-01")),
            post("stamp", Some("c"), Some("2024-03-01T12:00:00.000Z")),
        ];
        let ids: Vec<_> = arrange(posts).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["stamp", "plain"]);
    }
}
