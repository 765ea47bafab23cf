//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the document-store contract consumed by the vocabulary engine.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Vocabulary::validate_shape()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `AlreadyExists`) in
//!   addition to DB transport errors.

pub mod vocabulary_repo;
