use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::ContentCache;
use crate::error::ContentError;
use crate::locator::extract_database_id;
use crate::notion::{DatabaseQuery, NotionApi};
use crate::post::{arrange, Post};

/// How many rows are pulled per fetch before filtering down to the grid.
pub const QUERY_PAGE_SIZE: u32 = 20;
const COVER_FILTER_PROPERTY: &str = "Cover Photo";
const REQUIRED_PROPERTIES: [&str; 2] = ["Name", "Cover Photo"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub database_id: String,
    pub properties: Vec<String>,
    pub has_required_properties: bool,
}

/// Fetches calendar posts from Notion and keeps them around for the cache TTL.
pub struct ContentService {
    api: Arc<dyn NotionApi>,
    cache: ContentCache,
}

impl ContentService {
    pub fn new(api: Arc<dyn NotionApi>, cache: ContentCache) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Up to nine posts with a cover photo, newest first.
    ///
    /// A fresh cache entry is served without touching Notion unless
    /// `bypass_cache` is set. A successful fetch always refreshes the entry;
    /// a failed one leaves the cache alone.
    pub async fn fetch_content(
        &self,
        credential: &str,
        locator: &str,
        bypass_cache: bool,
    ) -> Result<Vec<Post>, ContentError> {
        let database_id = extract_database_id(locator)?;
        let cache_key = ContentCache::key(credential, locator);

        if !bypass_cache {
            if let Some(posts) = self.cache.get(&cache_key).await {
                debug!(database_id = %database_id, count = posts.len(), "serving cached posts");
                return Ok(posts);
            }
        }

        let query = DatabaseQuery::with_files(COVER_FILTER_PROPERTY, QUERY_PAGE_SIZE);
        let (database, response) = futures::try_join!(
            self.api.retrieve_database(credential, &database_id),
            self.api.query_database(credential, &database_id, &query),
        )
        .map_err(|e| {
            warn!(database_id = %database_id, error = %e, "failed to fetch Notion database");
            e
        })?;

        debug!(
            database_id = %database_id,
            properties = ?database.properties.keys().collect::<Vec<_>>(),
            "database schema"
        );
        info!(database_id = %database_id, count = response.results.len(), "found pages in database");

        let posts = arrange(response.results.iter().map(Post::from_page).collect());
        info!(database_id = %database_id, count = posts.len(), "returning posts with cover photos");

        self.cache.insert(cache_key, posts.clone()).await;
        Ok(posts)
    }

    /// Whether Notion accepts the integration token.
    pub async fn verify_credential(&self, credential: &str) -> bool {
        match self.api.users_me(credential).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Notion token validation failed");
                false
            }
        }
    }

    /// Whether the token can read the database the locator points at.
    pub async fn verify_source_access(&self, credential: &str, locator: &str) -> bool {
        match self.describe_source(credential, locator).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Notion database validation failed");
                false
            }
        }
    }

    pub async fn describe_source(
        &self,
        credential: &str,
        locator: &str,
    ) -> Result<SourceSummary, ContentError> {
        let database_id = extract_database_id(locator)?;
        let database = self.api.retrieve_database(credential, &database_id).await?;

        let properties: Vec<String> = database.properties.keys().cloned().collect();
        let has_required_properties = REQUIRED_PROPERTIES
            .iter()
            .all(|name| database.properties.contains_key(*name));

        Ok(SourceSummary {
            database_id,
            properties,
            has_required_properties,
        })
    }
}
