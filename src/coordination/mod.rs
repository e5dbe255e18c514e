//! Run coordination
//!
//! Cooperative cancellation shared between an engine run and its owner.

pub mod cancel;

pub use cancel::CancelToken;
