//! tpsync - FANUC teach-pendant program sync over FTP
//!
//! Core engine: address resolution with a persisted per-directory hint,
//! a single-connection transfer session with guaranteed teardown, and
//! pure upload/download planners.

pub mod address;
pub mod engine;
pub mod error;
pub mod interact;
pub mod logger;
pub mod plan;
pub mod session;
