//! Strict text codec for pillar reports.
//!
//! The report format is authoritative, not permissive: each entry block
//! carries a fixed set of fields in a fixed order, and anything unknown or
//! out of order fails with a [`SchemaError`] naming the field and block.
//! Downstream tooling rewrites individual fields in place, so the codec
//! guarantees `serialize(parse(t)) == t` for any `t` produced by
//! [`serialize`], and `parse(serialize(r)) == r` for any well-formed report.
//!
//! Block grammar:
//!
//! ```text
//! ## <id>: <title>
//! Question: <multi-line>
//! Status: <token>
//! Confidence: <token>
//! Answer: <multi-line>
//! Evidence: <multi-line>
//! Human Questions: <multi-line>
//! Kanbus Task: <optional reference>
//! Last Updated: <RFC 3339 UTC>
//! ```
//!
//! Multi-line values run until the next recognised label line; blank lines
//! inside a value are preserved verbatim. Text before the first block and
//! after the last one (report heading, attribution) round-trips untouched.

mod error;

pub use error::SchemaError;

use crate::report::domain::{
    Confidence, PersistedEntryData, PillarId, PillarReport, QuestionEntry, QuestionId,
    QuestionStatus, TaskRef, BLOCK_HEADER_PREFIX, FIELD_LABELS, LABEL_ANSWER, LABEL_CONFIDENCE,
    LABEL_EVIDENCE, LABEL_HUMAN_QUESTIONS, LABEL_KANBUS_TASK, LABEL_LAST_UPDATED, LABEL_QUESTION,
    LABEL_STATUS,
};
use chrono::{DateTime, SecondsFormat, Utc};

/// Parses one pillar report from its text form.
///
/// # Errors
///
/// Returns a [`SchemaError`] naming the offending block and field when the
/// text deviates from the fixed schema.
pub fn parse(pillar: PillarId, text: &str) -> Result<PillarReport, SchemaError> {
    Parser::new(text).run(pillar)
}

/// Serialises a pillar report back to its canonical text form.
///
/// Fields are always emitted in the authoritative order with canonical
/// spacing, independent of how the in-memory report was constructed, so
/// output is byte-deterministic.
#[must_use]
pub fn serialize(report: &PillarReport) -> String {
    let mut out = String::new();
    out.push_str(report.preamble());
    for entry in report.entries() {
        push_block(&mut out, entry);
        out.push('\n');
    }
    out.push_str(report.epilogue());
    out
}

fn push_block(out: &mut String, entry: &QuestionEntry) {
    out.push_str(BLOCK_HEADER_PREFIX);
    out.push_str(entry.id().as_str());
    out.push_str(": ");
    out.push_str(entry.title());
    out.push('\n');
    push_field(out, LABEL_QUESTION, entry.question_text());
    push_field(out, LABEL_STATUS, entry.status().as_str());
    push_field(out, LABEL_CONFIDENCE, entry.confidence().as_str());
    push_field(out, LABEL_ANSWER, entry.answer());
    push_field(out, LABEL_EVIDENCE, entry.evidence());
    push_field(out, LABEL_HUMAN_QUESTIONS, entry.human_questions());
    push_field(
        out,
        LABEL_KANBUS_TASK,
        entry.task_ref().map_or("", TaskRef::as_str),
    );
    push_field(out, LABEL_LAST_UPDATED, &format_timestamp(entry.last_updated()));
}

/// Emits `Label: value` with no trailing space when the value is empty.
fn push_field(out: &mut String, label: &str, value: &str) {
    out.push_str(label);
    out.push(':');
    if !value.is_empty() {
        out.push(' ');
        out.push_str(value);
    }
    out.push('\n');
}

/// Canonical timestamp form: RFC 3339, seconds precision, `Z` suffix.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Returns the recognised label a line starts with, if any.
fn recognized_label(line: &str) -> Option<&'static str> {
    FIELD_LABELS
        .iter()
        .find(|label| {
            line.strip_prefix(**label)
                .is_some_and(|rest| rest.starts_with(':'))
        })
        .copied()
}

/// Splits `line` into its label value, stripping the single canonical space
/// after the colon.
fn label_value<'a>(line: &'a str, label: &str) -> &'a str {
    line.strip_prefix(label)
        .and_then(|rest| rest.strip_prefix(':'))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .unwrap_or_default()
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.split('\n').collect(),
            pos: 0,
        }
    }

    fn current(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    /// 1-based line number for diagnostics.
    const fn line_number(&self) -> usize {
        self.pos + 1
    }

    fn run(mut self, pillar: PillarId) -> Result<PillarReport, SchemaError> {
        let preamble = self.take_preamble();
        let mut report = PillarReport::new(pillar, preamble, String::new());

        while self
            .current()
            .is_some_and(|line| line.starts_with(BLOCK_HEADER_PREFIX))
        {
            let entry = self.parse_block()?;
            if report.entry(entry.id()).is_some() {
                return Err(SchemaError::DuplicateBlock {
                    block: entry.id().to_string(),
                });
            }
            report.push_entry(entry);
            if !self.advance_to_next_block()? {
                break;
            }
        }

        let epilogue = self
            .lines
            .get(self.pos..)
            .map(|rest| rest.join("\n"))
            .unwrap_or_default();
        report.set_epilogue(epilogue);
        Ok(report)
    }

    /// Consumes everything up to the first block header.
    fn take_preamble(&mut self) -> String {
        let mut taken: Vec<&str> = Vec::new();
        while let Some(line) = self.current() {
            if line.starts_with(BLOCK_HEADER_PREFIX) {
                break;
            }
            taken.push(line);
            self.pos += 1;
        }
        if taken.is_empty() || self.current().is_none() {
            // Without a following block the "preamble" is the whole file;
            // leave it to the epilogue path instead.
            self.pos -= taken.len();
            return String::new();
        }
        let mut preamble = taken.join("\n");
        preamble.push('\n');
        preamble
    }

    fn parse_block(&mut self) -> Result<QuestionEntry, SchemaError> {
        let (id, title) = self.parse_header()?;
        let block = id.to_string();

        let question_text = self.parse_multi_line(&block, LABEL_QUESTION)?;
        let status = self.parse_status(&block)?;
        let confidence = self.parse_confidence(&block)?;
        let answer = self.parse_multi_line(&block, LABEL_ANSWER)?;
        let evidence = self.parse_multi_line(&block, LABEL_EVIDENCE)?;
        let human_questions = self.parse_multi_line(&block, LABEL_HUMAN_QUESTIONS)?;
        let task_ref = self.parse_task_ref(&block)?;
        let last_updated = self.parse_last_updated(&block)?;

        Ok(QuestionEntry::from_persisted(PersistedEntryData {
            id,
            title,
            question_text,
            status,
            confidence,
            answer,
            evidence,
            human_questions,
            task_ref,
            last_updated,
        }))
    }

    fn parse_header(&mut self) -> Result<(QuestionId, String), SchemaError> {
        let line_number = self.line_number();
        let line = self.current().unwrap_or_default();
        let header = line.strip_prefix(BLOCK_HEADER_PREFIX).unwrap_or_default();
        let Some((raw_id, raw_title)) = header.split_once(':') else {
            return Err(SchemaError::MalformedHeader {
                line: line_number,
                text: line.to_owned(),
            });
        };
        let id = QuestionId::new(raw_id).map_err(|_| SchemaError::InvalidValue {
            block: raw_id.to_owned(),
            field: "id",
            value: raw_id.to_owned(),
        })?;
        let title = raw_title.strip_prefix(' ').unwrap_or(raw_title).to_owned();
        self.pos += 1;
        Ok((id, title))
    }

    /// Consumes the labelled line for `expected`, failing when a different
    /// recognised label (out of order) or arbitrary text is found instead.
    fn expect_label(&mut self, block: &str, expected: &'static str) -> Result<&'a str, SchemaError> {
        let Some(line) = self.current() else {
            return Err(SchemaError::MissingField {
                block: block.to_owned(),
                field: expected,
            });
        };
        match recognized_label(line) {
            Some(found) if found == expected => {
                self.pos += 1;
                Ok(label_value(line, expected))
            }
            Some(found) => Err(SchemaError::FieldOrder {
                block: block.to_owned(),
                expected,
                found: found.to_owned(),
            }),
            None => Err(SchemaError::MissingField {
                block: block.to_owned(),
                field: expected,
            }),
        }
    }

    /// Parses a multi-line field: the labelled line plus every following
    /// line up to the next recognised label or block header, verbatim.
    fn parse_multi_line(
        &mut self,
        block: &str,
        label: &'static str,
    ) -> Result<String, SchemaError> {
        let mut value = self.expect_label(block, label)?.to_owned();
        while let Some(line) = self.current() {
            if line.starts_with(BLOCK_HEADER_PREFIX) || recognized_label(line).is_some() {
                break;
            }
            value.push('\n');
            value.push_str(line);
            self.pos += 1;
        }
        Ok(value)
    }

    fn parse_status(&mut self, block: &str) -> Result<QuestionStatus, SchemaError> {
        let value = self.expect_label(block, LABEL_STATUS)?;
        QuestionStatus::try_from(value).map_err(|_| SchemaError::InvalidValue {
            block: block.to_owned(),
            field: LABEL_STATUS,
            value: value.to_owned(),
        })
    }

    fn parse_confidence(&mut self, block: &str) -> Result<Confidence, SchemaError> {
        let value = self.expect_label(block, LABEL_CONFIDENCE)?;
        Confidence::try_from(value).map_err(|_| SchemaError::InvalidValue {
            block: block.to_owned(),
            field: LABEL_CONFIDENCE,
            value: value.to_owned(),
        })
    }

    fn parse_task_ref(&mut self, block: &str) -> Result<Option<TaskRef>, SchemaError> {
        let value = self.expect_label(block, LABEL_KANBUS_TASK)?;
        if value.trim().is_empty() {
            return Ok(None);
        }
        TaskRef::new(value.trim())
            .map(Some)
            .map_err(|_| SchemaError::InvalidValue {
                block: block.to_owned(),
                field: LABEL_KANBUS_TASK,
                value: value.to_owned(),
            })
    }

    fn parse_last_updated(&mut self, block: &str) -> Result<DateTime<Utc>, SchemaError> {
        let value = self.expect_label(block, LABEL_LAST_UPDATED)?;
        DateTime::parse_from_rfc3339(value.trim())
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|_| SchemaError::InvalidValue {
                block: block.to_owned(),
                field: LABEL_LAST_UPDATED,
                value: value.to_owned(),
            })
    }

    /// Consumes the blank separator after a block and decides whether
    /// another block follows. Extra blank lines between blocks are the one
    /// permitted boundary normalisation; non-blank content between blocks
    /// is a schema error.
    fn advance_to_next_block(&mut self) -> Result<bool, SchemaError> {
        if self.current() == Some("") {
            self.pos += 1;
        }
        let epilogue_start = self.pos;

        let mut lookahead = self.pos;
        while self
            .lines
            .get(lookahead)
            .is_some_and(|line| line.trim().is_empty())
        {
            lookahead += 1;
        }
        match self.lines.get(lookahead) {
            Some(line) if line.starts_with(BLOCK_HEADER_PREFIX) => {
                self.pos = lookahead;
                Ok(true)
            }
            Some(_)
                if self
                    .lines
                    .get(lookahead..)
                    .is_some_and(|rest| {
                        rest.iter().any(|line| line.starts_with(BLOCK_HEADER_PREFIX))
                    }) =>
            {
                Err(SchemaError::StrayContent {
                    line: lookahead + 1,
                })
            }
            _ => {
                self.pos = epilogue_start;
                Ok(false)
            }
        }
    }
}
