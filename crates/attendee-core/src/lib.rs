//! Core types and trait definitions for the Attendee attendance tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! session decision logic, housekeeping and audits live here as plain
//! functions; the [`service::AttendanceService`] wires them to a store and a
//! notifier supplied by the caller.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod autoclose;
pub mod clock;
pub mod error;
pub mod evaluate;
pub mod ledger;
pub mod notify;
pub mod record;
pub mod school;
pub mod service;
pub mod stats;
pub mod store;
pub mod subject;

pub use error::{Error, Result, ServiceError};
