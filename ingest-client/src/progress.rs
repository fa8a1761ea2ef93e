//! Shared progress record with merge-only updates.
//!
//! The record lives inside a `watch` channel owned by [`ProgressReporter`].
//! Writers submit partial [`ProgressUpdate`]s which are merged serially under
//! the channel's lock; observers hold a read-only `watch::Receiver`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::trace;

/// Payload entries describing how a session ended
const SESSION_OUTCOME_KEYS: [&str; 2] = ["error_code", "document_upload_id"];

/// Snapshot of ingestion progress as seen by the UI
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressRecord {
    /// Free-text phase label
    pub status: String,
    /// Percentage in [0, 100]; never decreases except on failure reset
    pub progress: f64,
    /// Side-channel data, e.g. detected file type
    pub payload: Map<String, Value>,
}

/// A partial update. Unset fields leave the record untouched and payload
/// entries are merged key by key.
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    status: Option<String>,
    progress: Option<f64>,
    payload: Map<String, Value>,
}

impl ProgressUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    fn apply_to(self, record: &mut ProgressRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(progress) = self.progress {
            let progress = if progress.is_finite() {
                progress.clamp(0.0, 100.0)
            } else {
                0.0
            };
            record.progress = record.progress.max(progress);
        }
        record.payload.extend(self.payload);
    }
}

/// Owner of the progress record. Cheap to clone; all clones write the same record.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Arc<watch::Sender<ProgressRecord>>,
    failed: Arc<AtomicBool>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressRecord {
            status: "pending".to_string(),
            ..Default::default()
        });
        Self {
            tx: Arc::new(tx),
            failed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Read-only view for the UI layer
    pub fn subscribe(&self) -> watch::Receiver<ProgressRecord> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ProgressRecord {
        self.tx.borrow().clone()
    }

    /// Merge an update into the record. Ignored once the session has failed.
    ///
    /// The failed flag is read under the channel lock, so an update racing
    /// with [`fail`](Self::fail) either lands before the reset or not at all.
    pub fn update(&self, update: ProgressUpdate) {
        let failed = &self.failed;
        self.tx.send_if_modified(|record| {
            if failed.load(Ordering::Acquire) {
                trace!(?update, "Dropping progress update after failure");
                return false;
            }
            update.apply_to(record);
            true
        });
    }

    /// Shorthand for a status + progress update
    pub fn report(&self, status: &str, progress: f64) {
        self.update(ProgressUpdate::new().status(status).progress(progress));
    }

    /// Terminal failure: set the error label and reset progress to 0.
    ///
    /// Payload entries are kept, plus any supplied in `update`.
    pub fn fail(&self, status: &str, update: ProgressUpdate) {
        let failed = &self.failed;
        self.tx.send_modify(|record| {
            failed.store(true, Ordering::Release);
            record.status = status.to_string();
            record.progress = 0.0;
            record.payload.extend(update.payload);
        });
    }

    /// Start a new session on this record.
    ///
    /// Clears the failed state and the previous outcome, and lets progress
    /// climb from 0 again. Other payload entries are kept until overwritten.
    pub fn reset(&self) {
        let failed = &self.failed;
        self.tx.send_modify(|record| {
            failed.store(false, Ordering::Release);
            record.status = "pending".to_string();
            record.progress = 0.0;
            for key in SESSION_OUTCOME_KEYS {
                record.payload.remove(key);
            }
        });
    }

    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// A view that scales 0–100 sub-progress into `[start, end]`
    pub fn band(&self, start: f64, end: f64) -> BandReporter {
        BandReporter {
            reporter: self.clone(),
            start,
            end,
        }
    }
}

/// Progress view restricted to a reserved band of the overall range
#[derive(Debug, Clone)]
pub struct BandReporter {
    reporter: ProgressReporter,
    start: f64,
    end: f64,
}

impl BandReporter {
    /// Report `sub_progress` (0–100) for `status`, scaled into the band
    pub fn report(&self, status: &str, sub_progress: f64) {
        self.update(ProgressUpdate::new().status(status).progress(sub_progress));
    }

    /// Merge an update whose progress (if any) is expressed in 0–100 band units
    pub fn update(&self, mut update: ProgressUpdate) {
        if let Some(sub) = update.progress {
            update.progress = Some(self.scale(sub));
        }
        self.reporter.update(update);
    }

    fn scale(&self, sub_progress: f64) -> f64 {
        let fraction = sub_progress.clamp(0.0, 100.0) / 100.0;
        self.start + (self.end - self.start) * fraction
    }
}
