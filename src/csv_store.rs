//! Flat-file backend: one CSV with the columns `Name,Subject,Rating,Comment`.
//!
//! Every write reads the whole file, appends, and rewrites it through a
//! temporary file. Writes within this process are serialised by `write_lock`.

use async_trait::async_trait;
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{FeedbackError, Result};
use crate::feedback::{FeedbackRecord, NewFeedback, Rating, Subject};
use crate::storage::FeedbackStore;

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Subject")]
    subject: String,
    #[serde(rename = "Rating")]
    rating: Rating,
    #[serde(rename = "Comment")]
    comment: String,
}

impl CsvRow {
    fn into_record(self, id: i64) -> Result<FeedbackRecord> {
        let subject = Subject::from_str(&self.subject)
            .map_err(|e| FeedbackError::InvalidRecord(format!("row {}: {}", id, e)))?;

        Ok(NewFeedback {
            student_name: self.name,
            subject,
            rating: self.rating,
            comments: self.comment,
        }
        .into_record(id, None))
    }
}

impl From<&FeedbackRecord> for CsvRow {
    fn from(record: &FeedbackRecord) -> Self {
        CsvRow {
            name: record.student_name.clone(),
            subject: record.subject.to_string(),
            rating: record.rating,
            comment: record.comments.clone(),
        }
    }
}

pub struct CsvStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load_records(path: &Path) -> Result<Vec<FeedbackRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut rdr = Reader::from_path(path)?;
    let mut records = Vec::new();
    for (index, row) in rdr.deserialize::<CsvRow>().enumerate() {
        records.push(row?.into_record(index as i64 + 1)?);
    }

    Ok(records)
}

fn rewrite_records(path: &Path, records: &[FeedbackRecord]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut wtr = Writer::from_path(&tmp)?;
    for record in records {
        wtr.serialize(CsvRow::from(record))?;
    }
    wtr.flush()?;
    drop(wtr);

    std::fs::rename(&tmp, path)?;
    Ok(())
}

async fn blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| FeedbackError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

#[async_trait]
impl FeedbackStore for CsvStore {
    async fn insert(&self, feedback: NewFeedback) -> Result<FeedbackRecord> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();

        let record = blocking(move || {
            let mut records = load_records(&path)?;
            let record = feedback.into_record(records.len() as i64 + 1, None);
            records.push(record.clone());
            rewrite_records(&path, &records)?;
            Ok(record)
        })
        .await?;

        debug!(id = record.id, path = %self.path.display(), "Appended feedback row");
        Ok(record)
    }

    async fn fetch_all(&self) -> Result<Vec<FeedbackRecord>> {
        let path = self.path.clone();
        blocking(move || load_records(&path)).await
    }
}
