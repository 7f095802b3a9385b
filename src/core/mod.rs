//! Core data model for stowage.
//!
//! This module contains the foundational types used throughout stowage:
//! - Source units and their embed-time fact views
//! - The embedded-library metadata envelope
//! - The per-session catalog index

pub mod catalog;
pub mod library;
pub mod source_unit;

pub use catalog::{Catalog, CatalogBuilder, CatalogError};
pub use library::{tool_version, EmbeddedLibrary, LanguageVersion};
pub use source_unit::{cmp_unit_ids, ExternalUnit, ParsedSourceFile, SourceUnit, UnitFacts};
