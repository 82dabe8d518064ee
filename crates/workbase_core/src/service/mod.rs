//! Entity persistence services.
//!
//! # Responsibility
//! - Compose reference validation, relationship edits and pagination into
//!   the generic lifecycle engine.
//! - Expose typed per-entity services over that engine.
//!
//! # Invariants
//! - Services never talk to SQLite directly; every access goes through
//!   `DocumentRepository`.

pub mod entity_service;
pub mod lifecycle;
pub mod pagination;
pub mod reference;
pub mod relationship;
