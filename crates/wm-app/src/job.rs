use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;
use wm_core::WorldMode;

const DEFAULT_CAPACITY: usize = 256;
pub const ABANDONED: &str = "Request was cancelled before it finished";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Succeeded,
    /// Finished, but an expected artifact is missing
    Warning,
    Failed,
}

impl RequestStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Pending => "⏳",
            Self::Succeeded => "✅",
            Self::Warning => "⚠️",
            Self::Failed => "❌",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    TextToWorld,
    ImageToWorld,
    TextToScene,
    ImageToScene,
}

impl Operation {
    pub fn uses_image(&self) -> bool {
        matches!(self, Self::ImageToWorld | Self::ImageToScene)
    }

    /// WorldGen mode the operation needs
    pub fn world_mode(&self) -> WorldMode {
        if self.uses_image() {
            WorldMode::ImageToScene
        } else {
            WorldMode::TextToScene
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub id: Uuid,
    pub operation: Operation,
    pub status: RequestStatus,
    pub message: Option<String>,
    pub output_dir: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RequestRecord {
    /// Seconds taken so far, or in total once finished
    pub fn elapsed_secs(&self) -> i64 {
        let end = match self.completed_at {
            Some(completed) if !self.status.is_active() => completed,
            _ => Utc::now(),
        };
        (end - self.created_at).num_seconds()
    }
}

/// Bounded in-memory history of generation requests, newest last
pub struct RequestLog {
    records: Mutex<VecDeque<RequestRecord>>,
    capacity: usize,
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RequestLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    fn with_records<T>(&self, f: impl FnOnce(&mut VecDeque<RequestRecord>) -> T) -> T {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut records)
    }

    /// Record a new pending request. Dropping the returned guard without
    /// finishing it marks the request as failed.
    pub fn begin(&self, operation: Operation) -> PendingRequest<'_> {
        let id = Uuid::new_v4();
        let record = RequestRecord {
            id,
            operation,
            status: RequestStatus::Pending,
            message: None,
            output_dir: None,
            created_at: Utc::now(),
            completed_at: None,
        };

        self.with_records(|records| {
            while records.len() >= self.capacity {
                records.pop_front();
            }
            records.push_back(record);
        });
        PendingRequest {
            log: self,
            id,
            settled: false,
        }
    }

    pub fn attach_dir(&self, id: Uuid, dir_name: &str) {
        self.with_records(|records| {
            if let Some(r) = records.iter_mut().find(|r| r.id == id) {
                r.output_dir = Some(dir_name.to_string());
            }
        });
    }

    pub fn finish(&self, id: Uuid, status: RequestStatus, message: impl Into<String>) {
        let message = message.into();
        self.with_records(|records| {
            if let Some(r) = records.iter_mut().find(|r| r.id == id) {
                r.status = status;
                r.message = Some(message);
                r.completed_at = Some(Utc::now());
            }
        });
    }

    pub fn get(&self, id: Uuid) -> Option<RequestRecord> {
        self.with_records(|records| records.iter().find(|r| r.id == id).cloned())
    }

    /// Newest first
    pub fn list(&self) -> Vec<RequestRecord> {
        self.with_records(|records| records.iter().rev().cloned().collect())
    }
}

/// A request that has been recorded but not yet finished
#[must_use]
pub struct PendingRequest<'a> {
    log: &'a RequestLog,
    id: Uuid,
    settled: bool,
}

impl PendingRequest<'_> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn finish(mut self, status: RequestStatus, message: impl Into<String>) {
        self.log.finish(self.id, status, message);
        self.settled = true;
    }
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Request {} abandoned", self.id);
            self.log.finish(self.id, RequestStatus::Failed, ABANDONED);
        }
    }
}
