//! lgk-audit
//!
//! Append-only activity log. Writes JSON Lines (one entry per line) and
//! retains only the most recent `cap` entries — old history is trimmed on
//! the append that crosses the cap, so the file stays bounded on devices
//! with years of uptime.
//!
//! Logging is bookkeeping, not control flow: callers treat a failed append
//! as a logged non-event, never as a reason to abort the action being
//! recorded.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default retention, matching the UI's history view depth.
pub const DEFAULT_CAP: usize = 500;

/// One recorded user action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub user_id: String,
    pub user_name: String,
    pub role: String,
    /// Short action tag, e.g. `CONTENT_OPEN`, `LOGOUT`, `TEST_SUBMIT`.
    pub action: String,
    pub details: String,
    pub ts_utc: DateTime<Utc>,
}

/// Capped JSONL activity log.
pub struct ActivityLog {
    path: PathBuf,
    cap: usize,
    entries: Vec<ActivityEntry>,
}

impl ActivityLog {
    /// Open (or create) the log at `path`, loading surviving entries.
    /// Undecodable lines are skipped — a torn tail line must not brick the
    /// whole history.
    pub fn open(path: impl AsRef<Path>, cap: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {parent:?}"))?;
        }

        let mut entries = Vec::new();
        if path.exists() {
            let raw = fs::read_to_string(&path).with_context(|| format!("read {path:?}"))?;
            for line in raw.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                if let Ok(entry) = serde_json::from_str::<ActivityEntry>(line) {
                    entries.push(entry);
                }
            }
            if entries.len() > cap {
                entries.drain(..entries.len() - cap);
            }
        }

        Ok(Self { path, cap, entries })
    }

    /// Append one entry, trimming to the cap when crossed.
    pub fn append(
        &mut self,
        user_id: &str,
        user_name: &str,
        role: &str,
        action: &str,
        details: &str,
        now: DateTime<Utc>,
    ) -> Result<&ActivityEntry> {
        let entry = ActivityEntry {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            role: role.to_string(),
            action: action.to_string(),
            details: details.to_string(),
            ts_utc: now,
        };

        self.entries.push(entry);
        if self.entries.len() > self.cap {
            self.entries.drain(..self.entries.len() - self.cap);
            self.rewrite()?;
        } else {
            let line = serde_json::to_string(self.entries.last().expect("just pushed"))
                .context("encode activity entry")?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .with_context(|| format!("open {:?}", self.path))?;
            writeln!(file, "{line}").with_context(|| format!("append {:?}", self.path))?;
        }

        Ok(self.entries.last().expect("just pushed"))
    }

    /// Entries currently retained, oldest first.
    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn rewrite(&self) -> Result<()> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&serde_json::to_string(entry).context("encode activity entry")?);
            out.push('\n');
        }
        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, out).with_context(|| format!("write {tmp:?}"))?;
        fs::rename(&tmp, &self.path).with_context(|| format!("rename {tmp:?}"))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
