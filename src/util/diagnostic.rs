//! Advisory diagnostics collected during embed and expand sessions.
//!
//! Only structural and codec errors abort an operation; everything else
//! (version skew, skipped libraries) degrades gracefully and surfaces
//! here as advisory output for the host to present.

use std::fmt;

use semver::Version;

/// Common suggestion messages for consistent advisory output.
pub mod suggestions {
    /// Suggestion when a consumed library was embedded by a newer tool.
    pub const NEWER_TOOL: &str = "update this tool to match the version that produced the library";

    /// Suggestion when an embedded payload could not be decoded.
    pub const UNDECODABLE_PAYLOAD: &str =
        "re-embed the library; its stored payload is corrupt or truncated";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// An advisory message with optional context and suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// The library this diagnostic concerns, if any
    pub library: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            library: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Warning,
            context: Vec::new(),
            suggestions: Vec::new(),
            library: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Attach the library the diagnostic concerns.
    pub fn for_library(mut self, library: impl Into<String>) -> Self {
        self.library = Some(library.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}: {}\n", self.severity, self.message));

        if let Some(ref library) = self.library {
            output.push_str(&format!("  --> {}\n", library));
        }

        for ctx in &self.context {
            output.push_str(&format!("  | {}\n", ctx));
        }

        for suggestion in &self.suggestions {
            output.push_str(&format!("  help: {}\n", suggestion));
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Build the advisory raised when a consumed library was embedded by a
/// tool newer than this one. Reported once per offending library.
pub fn version_skew(library: &str, embedded_by: &Version, current: &Version) -> Diagnostic {
    Diagnostic::warning(format!(
        "library `{}` was embedded by a newer tool (v{})",
        library, embedded_by
    ))
    .with_context(format!("this tool is v{}", current))
    .with_suggestion(suggestions::NEWER_TOOL)
    .for_library(library)
}
