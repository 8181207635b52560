use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_rusqlite::Connection;

pub mod cache;
pub mod content;
pub mod dates;
pub mod database;
pub mod error;
pub mod locator;
pub mod notion;
pub mod post;
pub mod routes;
pub mod widgets;

use cache::ContentCache;
use content::ContentService;
use notion::NotionApi;
use widgets::WidgetStore;

#[derive(Parser, Debug, Clone)]
#[clap(about, version)]
pub struct Args {
    #[clap(short, long, env = "WIDGET_IP", default_value = "127.0.0.1")]
    pub ip: String,

    #[clap(short, long, env = "WIDGET_PORT", default_value = "3000")]
    pub port: u16,

    #[clap(short, long, env = "WIDGET_DB_PATH", default_value = "data.sqlite")]
    pub db_path: String,

    /// Seconds a fetched post list is served from memory
    #[clap(short, long, env = "WIDGET_CACHE_LIFETIME", default_value = "300")]
    pub cache_lifetime: u64,

    /// Most (token, database) pairs kept in memory at once
    #[clap(long, env = "WIDGET_CACHE_CAPACITY", default_value = "1024")]
    pub cache_capacity: usize,

    /// Browser cache lifetime, in seconds, advertised on the widget feed
    #[clap(long, env = "WIDGET_FEED_MAX_AGE", default_value = "60")]
    pub feed_max_age: u32,

    #[clap(long, env = "NOTION_API_URL", default_value = notion::DEFAULT_API_URL)]
    pub notion_api_url: String,

    #[clap(long, env = "NOTION_VERSION", default_value = notion::DEFAULT_API_VERSION)]
    pub notion_version: String,
}

pub struct AppState {
    pub config: Args,
    pub widgets: WidgetStore,
    pub content: ContentService,
}

impl AppState {
    pub fn new(config: Args, db: Connection, api: Arc<dyn NotionApi>) -> Self {
        let cache = ContentCache::new(
            Duration::from_secs(config.cache_lifetime),
            config.cache_capacity,
        );

        Self {
            widgets: WidgetStore::new(db),
            content: ContentService::new(api, cache),
            config,
        }
    }
}
