//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the document persistence primitives the entity engine builds on.
//! - Isolate SQLite query details from lifecycle/business orchestration.
//!
//! # Invariants
//! - The repository performs no referential checks; integrity lives above it.
//! - Repository APIs report counts so callers can detect absent documents.

pub mod document_repo;
pub mod filter;
