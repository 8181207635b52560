use tokio_rusqlite::{Connection, Result};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS widgets (
    id TEXT PRIMARY KEY,
    token TEXT NOT NULL UNIQUE,
    notion_token TEXT NOT NULL,
    database_url TEXT NOT NULL,
    title TEXT NOT NULL,
    grid_size TEXT NOT NULL DEFAULT '3x3',
    instagram_handle TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
    )";

pub async fn init_db(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path).await?;
    create_schema(&conn).await?;
    Ok(conn)
}

pub async fn init_memory_db() -> Result<Connection> {
    let conn = Connection::open_in_memory().await?;
    create_schema(&conn).await?;
    Ok(conn)
}

async fn create_schema(conn: &Connection) -> Result<()> {
    conn.call(|conn| {
        conn.execute(SCHEMA, [])?;
        Ok(())
    })
    .await
}
