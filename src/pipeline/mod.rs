//! Discovery pipeline.
//!
//! - `cycle`: one pass over the watch list (fetch, extract, classify, store)
//! - `scheduler`: the background loop that repeats cycles until stopped

pub mod cycle;
pub mod scheduler;

pub use cycle::{CycleRunner, FETCH_TIMEOUT, NotificationDedup};
pub use scheduler::{PROGRESS_STEPS, RunState, Scheduler, SharedConfig, share};
