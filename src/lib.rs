//! Stowage - embed library sources into compiled artifacts and expand
//! minimal self-contained snippets back out of them.
//!
//! This crate provides the core machinery: the per-session unit catalog,
//! the dependency-closure resolver, cycle-safe component grouping for
//! embed-time dependency merging, content normalization, and the compact
//! text codec the payload is stored with.

pub mod codec;
pub mod container;
pub mod core;
pub mod normalize;
pub mod ops;
pub mod resolver;
pub mod util;

pub use crate::core::{
    Catalog, CatalogBuilder, CatalogError, EmbeddedLibrary, LanguageVersion, ParsedSourceFile,
    SourceUnit, UnitFacts,
};

pub use crate::codec::CodecError;
pub use crate::container::{ContainerError, LoadedLibrary, PayloadEncoding};
pub use crate::normalize::{normalize, NormalizeLevel};
pub use crate::ops::{embed_library, render, EmbedOutcome, ExpandSession};
pub use crate::resolver::CancelToken;
pub use crate::util::{Diagnostic, EmbedConfig, InternedString};
