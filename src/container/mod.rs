//! Embedding container - the wire format and its metadata envelope.
//!
//! The persisted form of a library is a JSON array of per-unit records,
//! stored in a flat string-keyed metadata map either as raw UTF-8 or
//! wrapped by the text codec when size matters. Deserialization is
//! tolerant: unknown fields are ignored and missing optional fields
//! become empty collections. Only a record missing its identity or body
//! is structural corruption.

use std::collections::BTreeMap;

use miette::Diagnostic as MietteDiagnostic;
use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{self, CodecError};
use crate::core::library::{tool_version, EmbeddedLibrary, LanguageVersion};
use crate::core::source_unit::{cmp_unit_ids, SourceUnit};
use crate::util::diagnostic::Diagnostic;

/// Reserved metadata keys.
pub mod keys {
    /// Semantic version of the tool that embedded the library.
    pub const TOOL_VERSION: &str = "Stowage.EmbedderVersion";

    /// Language feature level of the embedded sources.
    pub const LANGUAGE_VERSION: &str = "Stowage.EmbeddedLanguageVersion";

    /// Whether any embedded unit requires an unchecked-memory capability.
    pub const ALLOW_UNSAFE: &str = "Stowage.EmbeddedAllowUnsafe";

    /// Payload stored as raw UTF-8 JSON.
    pub const PAYLOAD_RAW: &str = "Stowage.EmbeddedSourceCode";

    /// Payload stored as codec text over gzipped JSON.
    pub const PAYLOAD_ENCODED: &str = "Stowage.EmbeddedSourceCode.GZipBase32768";

    /// Short content fingerprint of the payload.
    pub const FINGERPRINT: &str = "Stowage.EmbeddedSourceCode.Fingerprint";
}

/// How the payload is stored in the metadata map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadEncoding {
    /// Raw UTF-8 JSON; readable, large.
    Raw,
    /// Codec text over gzip; compact, opaque.
    GzipBase32768,
}

/// Structural error while reading or writing a container.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ContainerError {
    #[error("malformed unit record in embedded payload")]
    #[diagnostic(
        code(stowage::container::malformed),
        help("the payload is not the JSON shape this tool writes; re-embed the library")
    )]
    Malformed(#[source] serde_json::Error),

    #[error("metadata key `{key}` holds an invalid version `{value}`")]
    #[diagnostic(code(stowage::container::invalid_version))]
    InvalidVersion { key: &'static str, value: String },

    #[error("embedded payload could not be decoded")]
    #[diagnostic(code(stowage::container::payload))]
    Payload(#[from] CodecError),

    #[error("embedded payload is not valid UTF-8")]
    #[diagnostic(code(stowage::container::not_utf8))]
    NotUtf8(#[source] std::string::FromUtf8Error),
}

/// One unit as persisted on the wire. Field names are fixed by the
/// format; field order in the file is insignificant.
#[derive(Debug, Serialize, Deserialize)]
struct WireUnit {
    #[serde(rename = "FileName")]
    file_name: String,

    #[serde(rename = "TypeNames", default, skip_serializing_if = "Vec::is_empty")]
    type_names: Vec<String>,

    #[serde(rename = "Usings", default, skip_serializing_if = "Vec::is_empty")]
    usings: Vec<String>,

    #[serde(rename = "Dependencies", default, skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<String>,

    #[serde(rename = "CodeBody")]
    code_body: String,

    #[serde(rename = "Unsafe", default, skip_serializing_if = "is_false")]
    unsafe_flag: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Serialize units to the JSON wire form, sorted by id.
pub fn to_wire(units: &[SourceUnit]) -> Result<String, ContainerError> {
    let mut records: Vec<WireUnit> = units
        .iter()
        .map(|unit| WireUnit {
            file_name: unit.id().to_string(),
            type_names: unit.declared_types().iter().cloned().collect(),
            usings: unit.imports().iter().cloned().collect(),
            dependencies: unit.dependencies().iter().map(|d| d.to_string()).collect(),
            code_body: unit.body().to_string(),
            unsafe_flag: unit.is_unsafe(),
        })
        .collect();

    records.sort_by(|a, b| cmp_unit_ids(&a.file_name, &b.file_name));

    serde_json::to_string(&records).map_err(ContainerError::Malformed)
}

/// Deserialize units from the JSON wire form.
pub fn from_wire(text: &str) -> Result<Vec<SourceUnit>, ContainerError> {
    let records: Vec<WireUnit> =
        serde_json::from_str(text).map_err(ContainerError::Malformed)?;

    Ok(records
        .into_iter()
        .map(|record| {
            SourceUnit::new(
                record.file_name,
                record.type_names.into_iter().collect(),
                record.usings.into_iter().collect(),
                record.code_body,
            )
            .with_dependencies(
                record
                    .dependencies
                    .into_iter()
                    .map(crate::util::InternedString::new)
                    .collect(),
            )
            .with_unsafe(record.unsafe_flag)
        })
        .collect())
}

/// A library read back from metadata, with any advisories raised along
/// the way.
#[derive(Debug)]
pub struct LoadedLibrary {
    pub library: EmbeddedLibrary,
    pub warnings: Vec<Diagnostic>,
}

/// Produce the metadata map for an embedded library.
pub fn to_metadata(
    library: &EmbeddedLibrary,
    encoding: PayloadEncoding,
) -> Result<BTreeMap<String, String>, ContainerError> {
    let wire = to_wire(library.units())?;

    let mut metadata = BTreeMap::new();
    metadata.insert(
        keys::TOOL_VERSION.to_string(),
        library.tool_version().to_string(),
    );
    metadata.insert(
        keys::LANGUAGE_VERSION.to_string(),
        library.language_version().to_string(),
    );
    metadata.insert(
        keys::ALLOW_UNSAFE.to_string(),
        library.requires_unsafe().to_string(),
    );
    metadata.insert(
        keys::FINGERPRINT.to_string(),
        library.content_fingerprint(),
    );

    match encoding {
        PayloadEncoding::Raw => {
            metadata.insert(keys::PAYLOAD_RAW.to_string(), wire);
        }
        PayloadEncoding::GzipBase32768 => {
            metadata.insert(
                keys::PAYLOAD_ENCODED.to_string(),
                codec::encode(wire.as_bytes()),
            );
        }
    }

    Ok(metadata)
}

/// Read a library back from an artifact's metadata map.
///
/// Returns `Ok(None)` when the map carries no payload key: an artifact
/// without an embedding is not an error. Version skew against the
/// running tool is reported as a warning on the returned library.
pub fn from_metadata(
    library_name: &str,
    metadata: &BTreeMap<String, String>,
) -> Result<Option<LoadedLibrary>, ContainerError> {
    let wire = if let Some(encoded) = metadata.get(keys::PAYLOAD_ENCODED) {
        let bytes = codec::decode(encoded)?;
        String::from_utf8(bytes).map_err(ContainerError::NotUtf8)?
    } else if let Some(raw) = metadata.get(keys::PAYLOAD_RAW) {
        raw.clone()
    } else {
        return Ok(None);
    };

    let units = from_wire(&wire)?;

    let embedded_by = match metadata.get(keys::TOOL_VERSION) {
        Some(value) => Version::parse(value).map_err(|_| ContainerError::InvalidVersion {
            key: keys::TOOL_VERSION,
            value: value.clone(),
        })?,
        None => tool_version(),
    };

    let language_version = match metadata.get(keys::LANGUAGE_VERSION) {
        Some(value) => value
            .parse::<LanguageVersion>()
            .map_err(|_| ContainerError::InvalidVersion {
                key: keys::LANGUAGE_VERSION,
                value: value.clone(),
            })?,
        None => LanguageVersion::new(0, 0),
    };

    let requires_unsafe = metadata
        .get(keys::ALLOW_UNSAFE)
        .map(|v| v == "true")
        .unwrap_or(false);

    let library = EmbeddedLibrary::from_stored(
        library_name,
        embedded_by,
        language_version,
        requires_unsafe,
        units,
    );

    let warnings = library.compatibility_warning().into_iter().collect();

    Ok(Some(LoadedLibrary { library, warnings }))
}
