//! Error type for the compat-map compiler.
//!
//! Most of the error *kinds* described by the specification are per-statement
//! recoverable: a bad field, an unknown predicate name, an out-of-range
//! group number. Those are logged through [`crate::diagnostics`] and folded
//! into [`crate::compat_info::CompatInfo::error_count`] rather than returned
//! here — see [`crate::compat_info`] for the dispatch loop that does this.
//!
//! `CompatError` is reserved for the handful of conditions that are fatal to
//! the current call: the statement-count abort threshold, an include that
//! could not be resolved at all, or a key whose per-level interpretation
//! table would exceed the implementation cap.

use crate::ast::FileId;

/// Errors that can terminate a compat-map compile or a single internal
/// resolution step.
#[derive(Debug, thiserror::Error)]
pub enum CompatError {
    /// More than [`crate::config::CompileOptions::abandon_after`] statements
    /// failed; the compile was abandoned (§4.6).
    #[error("abandoning compat map: {error_count} errors")]
    Abandoned {
        /// Number of errors accumulated before abandoning.
        error_count: u32,
    },

    /// `group` was outside `1..=num_groups` (§4.6, §8 property 9).
    #[error("illegal group index {group} (must be 1..={max})")]
    GroupOutOfRange {
        /// The offending (1-based, as written by the author) group number.
        group: i64,
        /// `CompileOptions::num_groups`.
        max: u8,
    },

    /// An indicator `index` field was outside `1..=32` (§8 property 10).
    #[error("illegal indicator index {index} (must be 1..=32)")]
    IndicatorIndexOutOfRange {
        /// The offending index.
        index: i64,
    },

    /// Predicate call name did not match any of the five known predicates
    /// (§4.7).
    #[error("unknown match predicate '{0}'")]
    UnknownPredicate(String),

    /// A modifier name did not resolve against the real-modifier table.
    #[error("unknown modifier name '{0}'")]
    UnknownModifier(String),

    /// A keysym name did not resolve via [`crate::registry::KeysymRegistry`].
    #[error("unknown keysym name '{0}'")]
    UnknownKeysym(String),

    /// A field name in an `interpret` or `indicator` body was not recognized.
    #[error("unknown field '{field}' in {context} definition")]
    UnknownField {
        /// The unrecognized field name.
        field: String,
        /// `"interpret"` or `"indicator"`, for the message.
        context: &'static str,
    },

    /// The expression assigned to a field had the wrong shape (e.g. a string
    /// where a mask expression was expected).
    #[error("wrong value type for field '{field}' in {context} definition")]
    WrongFieldType {
        /// The field whose value had the wrong shape.
        field: String,
        /// `"interpret"` or `"indicator"`.
        context: &'static str,
    },

    /// `elem.field = value` was used where only `field = value` (a default
    /// assignment) is legal — e.g. indicator or interpret element fields
    /// cannot be set this way (§7, "Semantic" errors).
    #[error("cannot set defaults through element reference '{0}'")]
    ElementDefault(String),

    /// A statement kind that is not legal inside a compat map file (the
    /// dispatcher only accepts `Include`, `InterpDef`, `GroupCompatDef`,
    /// `IndicatorMapDef`, `VarDef`, `VModDef`).
    #[error("{0} definitions are not allowed in a compat map file")]
    UnexpectedStatement(&'static str),

    /// `ApplyInterpsToKey` would need more than
    /// [`crate::config::CompileOptions::max_interps_per_key`] flattened
    /// `(group, level)` slots (§4.11, the "Structural" cap in §7).
    #[error("key needs {levels} group/level slots, exceeding the cap of {cap}")]
    TooManyLevels {
        /// `num_groups * key.width` for the offending key.
        levels: usize,
        /// The configured cap.
        cap: usize,
    },

    /// The include locator could not resolve a referenced file.
    #[error("could not resolve include '{name}': {reason}")]
    IncludeFailed {
        /// The file name (plus optional map) that failed to resolve.
        name: String,
        /// Human-readable reason from the locator.
        reason: String,
    },

    /// An internal invariant was violated (the `wsgo` — "should go" —
    /// category from §7). Always a bug in this crate, never user input.
    #[error("internal error in file {file_id:?}: {message}")]
    Internal {
        /// The file the compile was processing when the bug was hit.
        file_id: FileId,
        /// Description of the violated invariant.
        message: String,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CompatError>;
