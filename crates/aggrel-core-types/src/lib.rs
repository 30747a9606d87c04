//! Core types shared across aggrel facilities
//!
//! This crate provides the canonical vocabulary used by both the error
//! facility and the logging facility:
//!
//! - **Schema constants**: canonical structured-logging field keys and event names

pub mod schema;
