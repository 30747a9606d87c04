//! Structured logging facility for aggrel
//!
//! - Single initialization point via `init(profile)`
//! - Operation boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use aggrel_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! Each repository operation owns its boundary: exactly one start event and
//! exactly one end or end_error event.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, BoundaryCounts, CapturedEvent, TestCapture};
