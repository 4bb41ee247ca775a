//! AWS-oriented adapters and handler for instance-alarm reconciliation.
//!
//! This crate owns runtime integration details (the Lambda entry point and
//! the instance inventory, tag store, and alarm control plane adapters).
//! The reconciliation decisions themselves live in `ops_monitor_core`.

pub mod adapters;
pub mod handlers;
