//! Tradewind Core - Shared types and core workflows.
//!
//! This crate provides the types used across all Tradewind components plus
//! the two pieces of logic with real invariants:
//!
//! - [`gate`] - the authorization gate: bearer-token claims resolved against
//!   the *live* account record before any role/status decision is made
//! - [`checkout`] - the trolley→order workflow: atomic stock reservation,
//!   price freezing, and document emission
//!
//! # Architecture
//!
//! The core crate does no I/O of its own. Persistence is reached through
//! small port traits ([`gate::AccountDirectory`], [`checkout::CheckoutTx`])
//! implemented by the server over Postgres and by in-memory fixtures in
//! tests. The optional `postgres` feature adds sqlx encode/decode impls for
//! the ID and enum types.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, roles, statuses
//! - [`gate`] - [`gate::authorize`] and its failure taxonomy
//! - [`checkout`] - `place_order` and the `CheckoutTx` port

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod gate;
pub mod types;

pub use types::*;
