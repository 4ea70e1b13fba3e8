//! crates/juriscan_core/src/history.rs
//!
//! The local log of completed analyses, newest first, persisted in full on
//! every change.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use tracing::{info, warn};

use crate::domain::{AnalysisResult, HistoryEntry};
use crate::ports::{KeyValueStore, PortError, PortResult};

pub const HISTORY_KEY: &str = "juriscan_history";

/// Default retention cap. Older entries fall off the end.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Question asked before the whole history is wiped.
pub const CLEAR_HISTORY_PROMPT: &str = "Sigur doriți să ștergeți tot istoricul local?";

/// The user's answer to `CLEAR_HISTORY_PROMPT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}

pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    entries: Vec<HistoryEntry>,
    limit: Option<usize>,
}

impl HistoryStore {
    /// Reads the persisted list. Missing or malformed data yields an empty history.
    pub async fn load(store: Arc<dyn KeyValueStore>, limit: Option<usize>) -> Self {
        let entries = match store.get(HISTORY_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Failed to parse history, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read history, starting empty: {}", e);
                Vec::new()
            }
        };
        info!(count = entries.len(), "History loaded.");
        Self { store, entries, limit }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Records a result at the front of the list and persists the whole list.
    ///
    /// The entry is kept in memory even when persisting fails; the error is
    /// returned so the caller can log it.
    pub async fn append(&mut self, result: AnalysisResult) -> (HistoryEntry, PortResult<()>) {
        self.append_at(Local::now(), result).await
    }

    async fn append_at(
        &mut self,
        now: DateTime<Local>,
        result: AnalysisResult,
    ) -> (HistoryEntry, PortResult<()>) {
        let newest = self.entries.first().map(|entry| entry.timestamp);
        let timestamp = match newest {
            Some(previous) if previous >= now.timestamp_millis() => previous + 1,
            _ => now.timestamp_millis(),
        };
        let captured = Local
            .timestamp_millis_opt(timestamp)
            .single()
            .unwrap_or(now);

        let entry = HistoryEntry {
            id: timestamp.to_string(),
            timestamp,
            date_label: date_label(&captured),
            result,
        };
        self.entries.insert(0, entry.clone());
        if let Some(limit) = self.limit {
            self.entries.truncate(limit);
        }
        let persisted = self.persist().await;
        (entry, persisted)
    }

    /// Empties the history, but only once the user has confirmed.
    pub async fn clear(&mut self, confirmation: Confirmation) -> PortResult<bool> {
        if confirmation == Confirmation::Declined {
            return Ok(false);
        }
        self.store.remove(HISTORY_KEY).await?;
        self.entries.clear();
        info!("History cleared.");
        Ok(true)
    }

    async fn persist(&self) -> PortResult<()> {
        let raw = serde_json::to_string(&self.entries)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.store.set(HISTORY_KEY, &raw).await
    }
}

/// Formats a capture time the way the Romanian locale prints it, e.g. `19.10.2026, 14:03:22`.
pub fn date_label<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%d.%m.%Y, %H:%M:%S").to_string()
}
