//! Retry policy for segment downloads.
//!
//! A failed attempt is retried after a fixed backoff until the attempt budget
//! is spent. The loop itself is an explicit state machine
//! (`Requesting -> Retrying -> Requesting | Failed`), see `run`.

mod policy;
mod run;

pub use policy::{RetryDecision, RetryPolicy};
pub use run::{run_with_retry, RetryReport};
