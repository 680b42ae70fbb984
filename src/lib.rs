// =============================================================================
// CLAIM LEDGER — lib.rs
// =============================================================================
//
// Role-gated insurance registry with a hash-linked audit chain:
//   model / store       — entities and their indexed storage
//   access              — role and ownership checks
//   chain / journal     — SHA-256 linked blocks and their durable log
//   registry            — the orchestrator every mutation goes through
//   views               — caller-scoped reads, analytics, identifier helpers
//   events / service    — notifications and the shared async handle
//   api                 — axum HTTP surface
// =============================================================================

pub mod access;
pub mod api;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod journal;
pub mod model;
pub mod registry;
pub mod service;
pub mod store;
pub mod views;

pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use registry::Registry;
pub use service::LedgerService;
