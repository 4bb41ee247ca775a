//! Pure domain for the instance-alarm reconciler.
//!
//! This crate owns deterministic reconciliation behavior: lifecycle-event
//! classification, alarm specs with derived names, and the reconciliation
//! policy. It intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod alarms;
pub mod contract;
pub mod policy;
