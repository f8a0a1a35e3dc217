// JsonlStore: one JSON object per line, appended to a file.
//
// Appends are serialized through a tokio Mutex and each record goes out in
// a single write, so concurrent checks never interleave partial lines. The
// file is created on first append; reading a missing file yields an empty
// history.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use super::{ViolationRecord, ViolationStore};

pub struct JsonlStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ViolationStore for JsonlStore {
    async fn append(&self, record: &ViolationRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("Failed to serialize violation")?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create directory for {}", self.path.display())
                })?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open violation log {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("Failed to write violation log {}", self.path.display()))?;
        file.flush().await?;

        Ok(())
    }

    async fn history(&self) -> Result<Vec<ViolationRecord>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read violation log {}", self.path.display())
                })
            }
        };

        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ViolationRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, path = %self.path.display(), "Skipping malformed violation record");
                }
            }
        }
        Ok(records)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
