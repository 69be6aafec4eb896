//! Entry store backed by Supabase's PostgREST API.
//!
//! Reads `children` and `entries` with the service-role key; photos are
//! served from the public storage bucket.

use async_trait::async_trait;
use serde::Deserialize;
use unwritten_core::entry::{Child, DateRange, PhotoRef, StoredEntry};
use unwritten_core::error::PipelineError;
use unwritten_core::ports::EntryStore;
use unwritten_core::types::{CalendarDate, ChildId};

use crate::config::SupabaseConfig;
use crate::error::EntryStoreError;

/// `children` row subset.
#[derive(Debug, Deserialize)]
struct ChildRow {
    id: String,
    name: String,
}

/// `entries` row subset.
#[derive(Debug, Deserialize)]
struct EntryRow {
    child_id: String,
    entry_date: CalendarDate,
    #[serde(default)]
    text: String,
    photo_path: Option<String>,
    prompt_used: Option<String>,
}

impl From<EntryRow> for StoredEntry {
    fn from(row: EntryRow) -> Self {
        Self {
            child_id: ChildId(row.child_id),
            entry_date: row.entry_date,
            text: row.text,
            photo_path: row.photo_path.filter(|p| !p.is_empty()),
            prompt: row.prompt_used.filter(|p| !p.trim().is_empty()),
        }
    }
}

pub struct SupabaseEntryStore {
    client: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseEntryStore {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.config.url)
    }

    fn children_query(child_id: &ChildId) -> Vec<(&'static str, String)> {
        vec![
            ("select", "id,name".to_string()),
            ("id", format!("eq.{child_id}")),
            ("limit", "1".to_string()),
        ]
    }

    fn entries_query(child_id: &ChildId, range: &DateRange) -> Vec<(&'static str, String)> {
        vec![
            ("select", "child_id,entry_date,text,photo_path,prompt_used".to_string()),
            ("child_id", format!("eq.{child_id}")),
            ("entry_date", format!("gte.{}", range.start())),
            ("entry_date", format!("lte.{}", range.end())),
            ("order", "entry_date.asc".to_string()),
        ]
    }

    async fn get_rows<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&'static str, String)],
    ) -> Result<Vec<T>, EntryStoreError> {
        let response = self
            .client
            .get(self.rest_url(table))
            .query(query)
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, EntryStoreError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(EntryStoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, EntryStoreError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl EntryStore for SupabaseEntryStore {
    async fn find_child(&self, child_id: &ChildId) -> Result<Option<Child>, PipelineError> {
        let rows: Vec<ChildRow> = self
            .get_rows("children", &Self::children_query(child_id))
            .await?;
        Ok(rows.into_iter().next().map(|row| Child {
            id: ChildId(row.id),
            name: row.name,
        }))
    }

    async fn entries_between(
        &self,
        child_id: &ChildId,
        range: &DateRange,
    ) -> Result<Vec<StoredEntry>, PipelineError> {
        let rows: Vec<EntryRow> = self
            .get_rows("entries", &Self::entries_query(child_id, range))
            .await?;
        tracing::debug!(child_id = %child_id, count = rows.len(), "Fetched entries");
        Ok(rows.into_iter().map(StoredEntry::from).collect())
    }

    fn photo_url(&self, photo_path: &str) -> PhotoRef {
        PhotoRef(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.url,
            self.config.photo_bucket,
            photo_path.trim_start_matches('/')
        ))
    }
}
