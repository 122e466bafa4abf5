//! Scan budget
//!
//! Bounds a cursor scan by an optional deadline and an optional shared
//! cancellation flag. The executor checks it on every cursor advance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Result, SiftError};

#[derive(Debug, Clone, Default)]
pub struct ScanBudget {
    deadline: Option<Instant>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl ScanBudget {
    /// A budget that never trips
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Trip once `timeout` has elapsed from now
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.deadline = timeout.map(|t| Instant::now() + t);
        self
    }

    /// Trip as soon as `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    pub fn check(&self) -> Result<()> {
        if let Some(flag) = &self.cancelled {
            if flag.load(Ordering::Relaxed) {
                return Err(SiftError::Cancelled("shutdown in progress".to_string()));
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(SiftError::Cancelled("scan deadline exceeded".to_string()));
            }
        }
        Ok(())
    }
}
