//! Schema errors raised by the report codec.

use thiserror::Error;

/// Malformed report text. The format is authoritative: anything outside the
/// fixed field set and order is rejected rather than repaired, and every
/// variant names the offending block so the operator can find it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// A block header line is not of the form `## <id>: <title>`.
    #[error("line {line}: malformed block header '{text}'")]
    MalformedHeader {
        /// 1-based line number of the header.
        line: usize,
        /// The offending line, verbatim.
        text: String,
    },

    /// A recognised field appeared out of the authoritative order.
    #[error("block {block}: expected field '{expected}', found '{found}'")]
    FieldOrder {
        /// Block id in which the field appeared.
        block: String,
        /// The field the schema requires at this position.
        expected: &'static str,
        /// The recognised field actually found.
        found: String,
    },

    /// A required field is absent or replaced by unrecognised text.
    #[error("block {block}: missing field '{field}'")]
    MissingField {
        /// Block id missing the field.
        block: String,
        /// The absent field label.
        field: &'static str,
    },

    /// A field value failed strict parsing (status, confidence, task
    /// reference, or timestamp).
    #[error("block {block}: invalid {field} value '{value}'")]
    InvalidValue {
        /// Block id holding the value.
        block: String,
        /// Field whose value was rejected.
        field: &'static str,
        /// The rejected value, verbatim.
        value: String,
    },

    /// Non-blank text between two entry blocks.
    #[error("line {line}: unexpected content between entry blocks")]
    StrayContent {
        /// 1-based line number of the stray text.
        line: usize,
    },

    /// Two blocks share one question id.
    #[error("block {block}: duplicate question id")]
    DuplicateBlock {
        /// The duplicated id.
        block: String,
    },
}
