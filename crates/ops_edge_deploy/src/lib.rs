//! Static-site edge distribution provisioning.
//!
//! The plan module owns the deterministic contract (validation, derived
//! origin/caller-reference values); the binary maps a plan onto the
//! content-delivery control plane.

pub mod plan;
