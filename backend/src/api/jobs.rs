//! In-memory store of finished conversions, for downloads after an upload.
//!
//! Only the most recent [`MAX_JOBS`] jobs are kept; older ones are evicted
//! first-in first-out.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::transform::pipeline::Conversion;

/// Number of finished jobs kept for download.
pub const MAX_JOBS: usize = 32;

/// A finished conversion.
#[derive(Debug)]
pub struct Job {
    pub id: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub conversion: Conversion,
}

impl Job {
    pub fn new(file_name: impl Into<String>, conversion: Conversion) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            created_at: Utc::now(),
            conversion,
        }
    }
}

/// Global job store used by the HTTP handlers
pub static JOBS: Lazy<JobStore> = Lazy::new(|| JobStore::new(MAX_JOBS));

/// Bounded FIFO of finished jobs.
pub struct JobStore {
    capacity: usize,
    jobs: Mutex<VecDeque<Arc<Job>>>,
}

impl JobStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            jobs: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Store a job, evicting the oldest when full. Returns the stored handle.
    pub fn insert(&self, job: Job) -> Arc<Job> {
        let job = Arc::new(job);
        let mut jobs = self.lock();
        while jobs.len() >= self.capacity {
            jobs.pop_front();
        }
        jobs.push_back(Arc::clone(&job));
        job
    }

    pub fn get(&self, id: &str) -> Option<Arc<Job>> {
        self.lock().iter().find(|j| j.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Arc<Job>>> {
        // a panicked writer cannot leave the deque half-updated
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
