//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `payment` - Payment order lifecycle, state machine and signing

pub mod foundation;
pub mod payment;
