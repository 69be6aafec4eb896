//! Range selection: a child's entries for an inclusive date range, ready for
//! layout.

use std::sync::Arc;

use unwritten_core::entry::{clamp_entry_text, Child, DateRange, Entry, MAX_ENTRY_CHARS};
use unwritten_core::error::PipelineError;
use unwritten_core::ports::EntryStore;
use unwritten_core::types::ChildId;

/// A child plus their entries in the requested range, ordered by date with
/// at most one entry per date.
#[derive(Debug, Clone)]
pub struct Selection {
    pub child: Child,
    pub entries: Vec<Entry>,
}

pub struct RangeSelector {
    store: Arc<dyn EntryStore>,
    max_range_days: i64,
}

impl RangeSelector {
    pub fn new(store: Arc<dyn EntryStore>, max_range_days: i64) -> Self {
        Self {
            store,
            max_range_days,
        }
    }

    /// Select `child_id`'s entries within `range`.
    ///
    /// Fails with `Validation` when the range is too long and with
    /// `NotFound` for an unknown child. An empty range is not an error.
    /// Photos are resolved to URLs but not fetched.
    pub async fn select(
        &self,
        child_id: &ChildId,
        range: &DateRange,
    ) -> Result<Selection, PipelineError> {
        range.ensure_max_span(self.max_range_days)?;

        let child = self
            .store
            .find_child(child_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound {
                entity: "Child",
                id: child_id.to_string(),
            })?;

        let mut stored = self.store.entries_between(child_id, range).await?;
        // Stable: among same-date rows the store's first one wins.
        stored.sort_by_key(|e| e.entry_date);

        let mut entries: Vec<Entry> = Vec::with_capacity(stored.len());
        for row in stored {
            if row.child_id != *child_id || !range.contains(row.entry_date) {
                tracing::warn!(
                    child_id = %child_id,
                    entry_date = %row.entry_date,
                    "Entry store returned a row outside the query, skipping"
                );
                continue;
            }
            if entries.last().is_some_and(|e| e.entry_date == row.entry_date) {
                tracing::warn!(
                    child_id = %child_id,
                    entry_date = %row.entry_date,
                    "Duplicate entry for date, keeping the first"
                );
                continue;
            }

            let text = clamp_entry_text(&row.text);
            if text.len() != row.text.len() {
                tracing::warn!(
                    child_id = %child_id,
                    entry_date = %row.entry_date,
                    max_chars = MAX_ENTRY_CHARS,
                    "Entry text over limit, truncated"
                );
            }

            entries.push(Entry {
                photo: row.photo_path.as_deref().map(|p| self.store.photo_url(p)),
                text: text.into_owned(),
                child_id: row.child_id,
                entry_date: row.entry_date,
                prompt: row.prompt,
            });
        }

        tracing::debug!(
            child_id = %child_id,
            start = %range.start(),
            end = %range.end(),
            count = entries.len(),
            "Selected entries"
        );
        Ok(Selection { child, entries })
    }
}
