//! The three log categories of §6, implemented over `tracing`.
//!
//! `err` and `warn` are user-visible; `wsgo` ("should go" — an internal
//! invariant that can never actually fail) is logged at `error` level but
//! tagged `wsgo = true` so a structured subscriber can separate it from
//! ordinary user mistakes.

use crate::ast::FileId;

/// Logs a user-visible error. Callers are responsible for bumping whatever
/// `error_count` the diagnostic should count against — this function only
/// logs.
pub fn err(file_id: FileId, message: impl std::fmt::Display) {
    tracing::error!(file_id = file_id.0, "{message}");
}

/// Logs a user-visible warning. Per §7, warnings never increment
/// `error_count`.
pub fn warn(file_id: FileId, message: impl std::fmt::Display) {
    tracing::warn!(file_id = file_id.0, "{message}");
}

/// Logs an internal "should never happen" condition.
pub fn wsgo(file_id: FileId, message: impl std::fmt::Display) {
    tracing::error!(file_id = file_id.0, wsgo = true, "{message}");
}

/// Logs a §4.1 field-collision diagnostic: `chose` is `"first"` when the old
/// (augment-preserved) definition won, `"last"` otherwise.
pub fn collision(file_id: FileId, record: impl std::fmt::Display, field: &str, chose: &'static str) {
    tracing::warn!(
        file_id = file_id.0,
        field,
        chose,
        "multiple definitions of {record}; using {chose}"
    );
}

/// Logs a §4.1 record-level replace: the earlier definition at `record` was
/// wholly discarded in favor of a `merge = Replace` redefinition.
pub fn replaced(file_id: FileId, record: impl std::fmt::Display) {
    tracing::warn!(
        file_id = file_id.0,
        "earlier definition of {record} ignored"
    );
}
