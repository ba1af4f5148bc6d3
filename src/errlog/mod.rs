//! Append-only record of recovered caption failures
//!
//! Sinks are best-effort: recording never fails and never masks the failure
//! being returned to the caller.

pub mod file;
pub mod mock;

pub use file::FileErrorLog;
pub use mock::MemoryErrorLog;

use crate::models::CaptionFailure;

pub trait FailureSink: Send + Sync {
    fn record(&self, failure: &CaptionFailure);
}
