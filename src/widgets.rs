use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, params_from_iter, Connection};
use uuid::Uuid;

use crate::error::StoreError;

pub const GRID_SIZE: &str = "3x3";
const TOKEN_LEN: usize = 12;
const COLUMNS: &str = "id, token, notion_token, database_url, title, grid_size, \
                       instagram_handle, is_active, created_at";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    pub id: String,
    pub token: String,
    pub notion_token: String,
    pub database_url: String,
    pub title: String,
    pub grid_size: String,
    pub instagram_handle: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// What the setup form submits.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSetup {
    #[serde(default)]
    pub notion_token: String,
    #[serde(default)]
    pub database_url: String,
    #[serde(default)]
    pub title: String,
    pub grid_size: Option<String>,
    pub instagram_handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl WidgetSetup {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut fail = |field: &'static str, message: &'static str| errors.push(FieldError { field, message });

        if self.notion_token.is_empty() {
            fail("notionToken", "Notion token is required");
        } else if !(self.notion_token.starts_with("ntn_") || self.notion_token.starts_with("secret_")) {
            fail("notionToken", "Token must start with 'ntn_' or 'secret_'");
        }

        if Url::parse(&self.database_url).is_err() {
            fail("databaseUrl", "Must be a valid URL");
        } else if !self.database_url.contains("notion.so") {
            fail("databaseUrl", "Must be a Notion database URL");
        }

        if self.title.is_empty() {
            fail("title", "Widget title is required");
        }

        if self.grid_size.as_deref().is_some_and(|size| size != GRID_SIZE) {
            fail("gridSize", "Grid size must be 3x3");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Widgets persisted in SQLite.
#[derive(Clone)]
pub struct WidgetStore {
    conn: Connection,
}

impl WidgetStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, setup: WidgetSetup) -> Result<Widget, StoreError> {
        let widget = Widget {
            id: Uuid::new_v4().to_string(),
            token: new_public_token(),
            notion_token: setup.notion_token,
            database_url: setup.database_url,
            title: setup.title,
            grid_size: setup.grid_size.unwrap_or_else(|| GRID_SIZE.to_string()),
            instagram_handle: setup.instagram_handle.filter(|h| !h.is_empty()),
            is_active: true,
            created_at: Utc::now(),
        };

        let row = widget.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO widgets (id, token, notion_token, database_url, title, grid_size,
                     instagram_handle, is_active, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    params![
                        row.id,
                        row.token,
                        row.notion_token,
                        row.database_url,
                        row.title,
                        row.grid_size,
                        row.instagram_handle,
                        row.is_active,
                        row.created_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await?;

        Ok(widget)
    }

    pub async fn get_by_token(&self, token: &str) -> Result<Option<Widget>, StoreError> {
        Ok(self.select(Some(("token", token.to_string()))).await?.pop())
    }

    pub async fn list(&self) -> Result<Vec<Widget>, StoreError> {
        self.select(None).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        let removed = self
            .conn
            .call(move |conn| Ok(conn.execute("DELETE FROM widgets WHERE id = ?", params![id])?))
            .await?;
        Ok(removed > 0)
    }

    async fn select(
        &self,
        filter: Option<(&'static str, String)>,
    ) -> Result<Vec<Widget>, StoreError> {
        let rows = self
            .conn
            .call(move |conn| {
                let (clause, args) = match filter {
                    Some((column, value)) => (format!("WHERE {column} = ?"), vec![value]),
                    None => (String::new(), vec![]),
                };
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM widgets {clause} ORDER BY created_at"
                ))?;
                let rows = stmt
                    .query_map(params_from_iter(args), |row| {
                        Ok(WidgetRow {
                            id: row.get(0)?,
                            token: row.get(1)?,
                            notion_token: row.get(2)?,
                            database_url: row.get(3)?,
                            title: row.get(4)?,
                            grid_size: row.get(5)?,
                            instagram_handle: row.get(6)?,
                            is_active: row.get(7)?,
                            created_at: row.get(8)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter().map(WidgetRow::into_widget).collect()
    }
}

fn new_public_token() -> String {
    Uuid::new_v4().simple().to_string()[..TOKEN_LEN].to_string()
}

/// Raw column values; the timestamp is parsed outside the connection thread.
struct WidgetRow {
    id: String,
    token: String,
    notion_token: String,
    database_url: String,
    title: String,
    grid_size: String,
    instagram_handle: Option<String>,
    is_active: bool,
    created_at: String,
}

impl WidgetRow {
    fn into_widget(self) -> Result<Widget, StoreError> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| StoreError::Corrupt(format!("widget {}: created_at: {e}", self.id)))?
            .with_timezone(&Utc);

        Ok(Widget {
            id: self.id,
            token: self.token,
            notion_token: self.notion_token,
            database_url: self.database_url,
            title: self.title,
            grid_size: self.grid_size,
            instagram_handle: self.instagram_handle,
            is_active: self.is_active,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init_memory_db;

    fn setup() -> WidgetSetup {
        WidgetSetup {
            notion_token: "secret_abc".into(),
            database_url: "https://www.notion.so/ws/abcdef0123456789abcdef0123456789?v=1".into(),
            title: "Feed".into(),
            grid_size: None,
            instagram_handle: Some("@acme".into()),
        }
    }

    async fn store() -> WidgetStore {
        WidgetStore::new(init_memory_db().await.unwrap())
    }

    #[test]
    fn valid_setup_passes() {
        assert!(setup().validate().is_ok());
        let ntn = WidgetSetup {
            notion_token: "ntn_123".into(),
            grid_size: Some("3x3".into()),
            ..setup()
        };
        assert!(ntn.validate().is_ok());
    }

    #[test]
    fn setup_errors_are_collected_per_field() {
        let bad = WidgetSetup {
            notion_token: "abc".into(),
            database_url: "https://example.com/db".into(),
            title: "".into(),
            grid_size: Some("4x4".into()),
            instagram_handle: None,
        };
        let fields: Vec<_> = bad.validate().unwrap_err().iter().map(|e| e.field).collect();
        assert_eq!(fields, ["notionToken", "databaseUrl", "title", "gridSize"]);
    }

    #[test]
    fn whitespace_title_is_accepted() {
        let spaced = WidgetSetup {
            title: "  ".into(),
            ..setup()
        };
        assert!(spaced.validate().is_ok());
    }

    #[test]
    fn missing_fields_get_required_messages() {
        let errors = WidgetSetup::default().validate().unwrap_err();
        assert_eq!(errors[0].message, "Notion token is required");
        assert_eq!(errors[1].message, "Must be a valid URL");
    }

    #[test]
    fn public_token_is_twelve_hex_chars() {
        let token = new_public_token();
        assert_eq!(token.len(), 12);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn create_then_lookup_by_token() {
        let store = store().await;
        let widget = store.create(setup()).await.unwrap();

        assert_eq!(widget.grid_size, "3x3");
        assert!(widget.is_active);
        let by_token = store.get_by_token(&widget.token).await.unwrap().unwrap();
        assert_eq!(by_token.id, widget.id);
        assert_eq!(by_token.instagram_handle.as_deref(), Some("@acme"));
        assert_eq!(by_token.created_at.timestamp(), widget.created_at.timestamp());
    }

    #[tokio::test]
    async fn unknown_token_is_none() {
        let store = store().await;
        assert!(store.get_by_token("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_and_delete() {
        let store = store().await;
        let a = store.create(setup()).await.unwrap();
        let b = store.create(setup()).await.unwrap();
        assert_ne!(a.token, b.token);
        assert_eq!(store.list().await.unwrap().len(), 2);

        assert!(store.delete(&a.id).await.unwrap());
        assert!(!store.delete(&a.id).await.unwrap());
        let remaining = store.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b.id);
    }
}
