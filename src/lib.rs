//! slotgrab - timed acquisition of scarce, time-released reservations
//!
//! A run waits for the instant a booking site releases its slots, then
//! repeatedly lists candidates, picks the best match for the caller's
//! preference and claims it, until it books, fails fatally, is cancelled or
//! runs out of retry budget. Sites plug in through the [`backend::Backend`]
//! trait; time comes from an injected [`clock::Clock`].

pub mod backend;
pub mod clock;
pub mod coordination;
pub mod domain;
pub mod engine;
pub mod error;
pub mod id;
pub mod matcher;
pub mod observer;
pub mod runner;

pub use error::{Result, SlotgrabError};
