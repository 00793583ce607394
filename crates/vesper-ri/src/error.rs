// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the error types returned by the renderer.

use crate::state::ScopeKind;
use std::fmt;
use thiserror::Error;
use vesper_core::DataKind;

/// The broad category of a [`RendererError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Mismatched or out-of-order Begin/End pairs.
    Nesting,
    /// An operation issued outside its required scope, or a malformed motion block.
    Protocol,
    /// A schema key set with a value of the wrong kind.
    TypeMismatch,
    /// A name with no registered value and no default.
    Lookup,
    /// The protocol emitter failed to write.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Nesting => "NestingError",
            ErrorKind::Protocol => "ProtocolError",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::Lookup => "LookupError",
            ErrorKind::Io => "IoError",
        };
        f.write_str(name)
    }
}

/// An error raised synchronously by a renderer call.
///
/// A failing call leaves the renderer state exactly as it was before the call.
#[derive(Debug, Error)]
pub enum RendererError {
    /// An `End` call did not match the innermost open block.
    #[error("cannot end {closing} block: innermost open block is {}", describe_open(.open))]
    MismatchedEnd {
        /// The block kind the caller tried to close.
        closing: ScopeKind,
        /// The innermost open block, if any.
        open: Option<ScopeKind>,
    },
    /// A block was opened where that kind of block may not nest.
    #[error("{opening} block cannot be opened inside an open {open} block")]
    IllegalNesting {
        /// The block kind the caller tried to open.
        opening: ScopeKind,
        /// The already-open block that forbids it.
        open: ScopeKind,
    },
    /// An operation was issued outside the scope it requires.
    #[error("'{operation}' is only valid {requirement}")]
    OutOfScope {
        /// The offending operation.
        operation: &'static str,
        /// Where the operation is allowed, as a human-readable phrase.
        requirement: &'static str,
    },
    /// A motion block received the wrong number of samples.
    #[error("motion block declared {expected} samples but {submitted} were submitted")]
    MotionSampleCount {
        /// Number of sample times given to `motion_begin`.
        expected: usize,
        /// Number of samples submitted so far, including the offending one.
        submitted: usize,
    },
    /// Samples of one motion block do not describe the same kind of thing.
    #[error("motion sample {index} does not match the first sample: {reason}")]
    MotionSampleMismatch {
        /// Zero-based index of the offending sample.
        index: usize,
        /// What differs.
        reason: String,
    },
    /// The sample times passed to `motion_begin` are unusable.
    #[error("invalid motion sample times {times:?}: {reason}")]
    InvalidMotionTimes {
        /// The rejected times.
        times: Vec<f32>,
        /// Why they were rejected.
        reason: &'static str,
    },
    /// A schema key was set with a value of the wrong kind.
    #[error("'{key}' expects {expected} but was given {found}")]
    TypeMismatch {
        /// The full key as passed by the caller.
        key: String,
        /// The kind the schema requires.
        expected: DataKind,
        /// The kind that was supplied.
        found: DataKind,
    },
    /// A name has no registered value and no documented default.
    #[error("no {what} named '{name}'")]
    Lookup {
        /// What was looked up ("coordinate system", "option", "attribute").
        what: &'static str,
        /// The name that was looked up.
        name: String,
    },
    /// The protocol emitter failed to write.
    #[error("protocol emitter failed: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_open(open: &Option<ScopeKind>) -> String {
    match open {
        Some(kind) => kind.to_string(),
        None => "none".to_owned(),
    }
}

impl RendererError {
    /// Returns the broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RendererError::MismatchedEnd { .. } | RendererError::IllegalNesting { .. } => {
                ErrorKind::Nesting
            }
            RendererError::OutOfScope { .. }
            | RendererError::MotionSampleCount { .. }
            | RendererError::MotionSampleMismatch { .. }
            | RendererError::InvalidMotionTimes { .. } => ErrorKind::Protocol,
            RendererError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            RendererError::Lookup { .. } => ErrorKind::Lookup,
            RendererError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn out_of_scope(operation: &'static str, requirement: &'static str) -> Self {
        RendererError::OutOfScope {
            operation,
            requirement,
        }
    }

    pub(crate) fn lookup(what: &'static str, name: &str) -> Self {
        RendererError::Lookup {
            what,
            name: name.to_owned(),
        }
    }
}

/// A `Result` alias for renderer calls.
pub type RendererResult<T> = Result<T, RendererError>;
