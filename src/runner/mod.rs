//! Attempt execution.
//!
//! - AcquisitionAttempt: one list, select and claim round, or a claim-free availability check
//! - RetryLoop: repeats attempts at a fixed interval until a terminal state

mod attempt;
mod retry_loop;

pub use attempt::{AcquisitionAttempt, Availability};
pub use retry_loop::{CANCELLED_REASON, LoopState, RetryLoop};
