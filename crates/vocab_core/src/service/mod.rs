//! Vocabulary engine services.
//!
//! # Responsibility
//! - Run lifecycle hooks, validation and read projections over the store.
//! - Keep callers decoupled from storage details.
//!
//! # See also
//! - docs/architecture/vocabularies.md

pub mod context;
pub mod error;
pub mod keyword_service;
pub mod locale;
pub mod projection;
pub mod rightsinfo;
pub mod validation;
pub mod vocabulary_service;
