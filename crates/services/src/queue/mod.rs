//! Two-slot question buffer with background prefetch.
//!
//! The queue keeps the question on screen plus a bounded number of prefetched
//! questions so that, after the first load, moving on never waits on the
//! network.

mod config;
mod service;
mod state;

pub use config::{QueueConfig, RetryPolicy};
pub use service::{Advance, QuestionQueue};
pub use state::{PrefetchStatus, QueueSnapshot};
