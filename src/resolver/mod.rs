//! Dependency resolution over embedded source units.
//!
//! The resolver is pure and deterministic - all I/O happens before
//! resolution. A session builds one immutable catalog and then resolves
//! any number of entry points against it, serially or on a thread pool.

pub mod closure;
pub mod graph;
pub mod scc;

pub use closure::{resolve, resolve_many, resolve_unit};
pub use graph::UnitGraph;
pub use scc::{decompose, Component, SccGraph};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Cooperative cancellation flag shared between a session and its caller.
///
/// None of the algorithms block, so cancellation is only checked between
/// top-level units of work: once per entry point during parallel
/// expansion, once per node during component decomposition.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Resolution stopped because the caller cancelled it.
#[derive(Debug, Error)]
#[error("resolution interrupted by caller")]
pub struct Interrupted;
