//! Event Checkout - payment order lifecycle for ticketed event registrations.
//!
//! A registrant pays for a registration through a hosted gateway. This crate
//! creates the payment order, signs gateway requests, reconciles gateway
//! notifications into local order state, and marks the ticket sold exactly
//! once.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
