//! API-Gateway-fronted order intake.
//!
//! The handler validates a proxy-event order body and writes one flat
//! record through the `OrderStore` adapter; the binary wires the adapter
//! to a DynamoDB table.

pub mod handlers;
