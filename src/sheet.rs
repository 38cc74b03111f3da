use std::path::PathBuf;

use reqwest::Client;
use thiserror::Error;
use tracing::warn;

use crate::models::MoodEntry;
use crate::store;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("http error: {0}")]
    Http(String),
    #[error("unexpected response status {0}")]
    Status(u16),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Format(String),
}

/// The shared wellbeing table. Read and written whole per interaction;
/// the last writer wins.
#[async_trait::async_trait]
pub trait WellbeingSheet: Send + Sync {
    async fn read_all(&self) -> Result<Vec<MoodEntry>, SheetError>;
    async fn replace_all(&self, entries: &[MoodEntry]) -> Result<(), SheetError>;
}

/// Remote sheet spoken to over HTTP: GET returns the table as CSV, PUT
/// replaces it.
pub struct HttpSheet {
    client: Client,
    url: String,
}

impl HttpSheet {
    pub fn new(url: impl Into<String>) -> Result<Self, SheetError> {
        let client = Client::builder()
            .user_agent("wellbeing-monitor/0.1")
            .build()
            .map_err(|e| SheetError::Http(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl WellbeingSheet for HttpSheet {
    async fn read_all(&self) -> Result<Vec<MoodEntry>, SheetError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SheetError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SheetError::Status(response.status().as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| SheetError::Http(e.to_string()))?;
        Ok(store::parse_mood_csv(body.as_bytes()))
    }

    async fn replace_all(&self, entries: &[MoodEntry]) -> Result<(), SheetError> {
        let body = store::mood_csv_string(entries).map_err(|e| SheetError::Format(e.to_string()))?;
        let response = self
            .client
            .put(&self.url)
            .header("content-type", "text/csv")
            .body(body)
            .send()
            .await
            .map_err(|e| SheetError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SheetError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// File-backed stand-in used when no sheet URL is configured. Same
/// whole-table semantics as the remote one.
pub struct LocalSheet {
    path: PathBuf,
}

impl LocalSheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl WellbeingSheet for LocalSheet {
    async fn read_all(&self) -> Result<Vec<MoodEntry>, SheetError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(store::parse_mood_csv(content.as_bytes()))
    }

    async fn replace_all(&self, entries: &[MoodEntry]) -> Result<(), SheetError> {
        let body = store::mood_csv_string(entries).map_err(|e| SheetError::Format(e.to_string()))?;
        std::fs::write(&self.path, body)?;
        Ok(())
    }
}

/// Read that degrades to an empty table on failure, the app-wide policy
/// for sheet trouble. The warning is the only trace left behind.
pub async fn read_or_empty(sheet: &dyn WellbeingSheet) -> Vec<MoodEntry> {
    match sheet.read_all().await {
        Ok(entries) => entries,
        Err(err) => {
            warn!("wellbeing sheet read failed, continuing with empty table: {err}");
            Vec::new()
        }
    }
}

/// Appends one entry with read-modify-write. Concurrent writers race;
/// the last full-table write wins.
pub async fn append_entry(sheet: &dyn WellbeingSheet, entry: MoodEntry) -> Result<(), SheetError> {
    let mut entries = read_or_empty(sheet).await;
    entries.push(entry);
    sheet.replace_all(&entries).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn entry(email: &str, day: u32, energy: i32, stress: i32) -> MoodEntry {
        MoodEntry {
            email: email.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            energy,
            stress,
        }
    }

    struct BrokenSheet;

    #[async_trait::async_trait]
    impl WellbeingSheet for BrokenSheet {
        async fn read_all(&self) -> Result<Vec<MoodEntry>, SheetError> {
            Err(SheetError::Status(503))
        }

        async fn replace_all(&self, _entries: &[MoodEntry]) -> Result<(), SheetError> {
            Err(SheetError::Status(503))
        }
    }

    #[tokio::test]
    async fn local_sheet_round_trips_whole_table() {
        let dir = TempDir::new().unwrap();
        let sheet = LocalSheet::new(dir.path().join("wellbeing_sheet.csv"));

        assert!(sheet.read_all().await.unwrap().is_empty());

        append_entry(&sheet, entry("ann@school.be", 2, 4, 2)).await.unwrap();
        append_entry(&sheet, entry("bert@school.be", 2, 2, 4)).await.unwrap();

        let table = sheet.read_all().await.unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].email, "ann@school.be");
        assert_eq!(table[1].stress, 4);
    }

    #[tokio::test]
    async fn replace_all_overwrites_previous_table() {
        let dir = TempDir::new().unwrap();
        let sheet = LocalSheet::new(dir.path().join("wellbeing_sheet.csv"));

        sheet.replace_all(&[entry("ann@school.be", 2, 4, 2)]).await.unwrap();
        sheet.replace_all(&[entry("bert@school.be", 3, 1, 5)]).await.unwrap();

        let table = sheet.read_all().await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].email, "bert@school.be");
    }

    #[tokio::test]
    async fn failures_degrade_to_empty_table() {
        let table = read_or_empty(&BrokenSheet).await;
        assert!(table.is_empty());
    }
}
