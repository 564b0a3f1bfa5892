use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};
use tracing::debug;

/// Default transcript location, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "logs/chatlog.txt";

/// Which endpoint produced a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    You,
    Peer,
}

impl Direction {
    fn tag(self) -> &'static str {
        match self {
            Direction::You => "You",
            Direction::Peer => "Peer",
        }
    }
}

/// Append-only chat log shared by both message loops. One
/// `[HH:MM:SS] You|Peer: text` line per successful send or receive; errors
/// and status notices never land here.
pub struct Transcript {
    file: Mutex<File>,
    path: PathBuf,
}

impl Transcript {
    /// Opens `path` in append mode, creating it and its parent directory if
    /// absent. The transcript accumulates across process runs.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open log file {}", path.display()))?;

        debug!(path = %path.display(), "transcript ready");
        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record stamped with the current wall-clock time.
    pub async fn append(&self, direction: Direction, text: &str) -> Result<()> {
        self.append_stamped(&current_timestamp(), direction, text)
            .await
    }

    /// Appends one record under a caller-supplied timestamp, so a message
    /// can carry the same stamp on the console and in the log.
    pub async fn append_stamped(
        &self,
        timestamp: &str,
        direction: Direction,
        text: &str,
    ) -> Result<()> {
        let record = format_record(timestamp, direction, text);

        // Whole-line writes under the mutex keep concurrent appends unsplit.
        let mut file = self.file.lock().await;
        file.write_all(record.as_bytes())
            .await
            .with_context(|| format!("failed to append to log file {}", self.path.display()))?;
        file.flush().await?;
        Ok(())
    }
}

/// `[HH:MM:SS]` for the current local time.
pub fn current_timestamp() -> String {
    Local::now().format("[%H:%M:%S]").to_string()
}

fn format_record(timestamp: &str, direction: Direction, text: &str) -> String {
    format!("{timestamp} {}: {text}\n", direction.tag())
}
