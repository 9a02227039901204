//! Round-trip and schema-enforcement tests for the report codec.

use super::FixedClock;
use crate::report::codec::{SchemaError, parse, serialize};
use crate::report::domain::{
    Confidence, PillarId, PillarReport, QuestionEntry, QuestionId, QuestionStatus,
};
use rstest::{fixture, rstest};

const CANONICAL: &str = "\
# Security

> Attribution: AWS Well-Architected Framework

## SEC-1: How do you securely operate your workload?
Question: How do you securely operate your workload?
Status: unanswered
Confidence: n/a
Answer:
Evidence:
Human Questions:
Kanbus Task:
Last Updated: 2026-08-30T10:00:00Z

## SEC-2: How do you manage identities?
Question: How do you manage identities for people
and machines?
Status: partial
Confidence: low
Answer: Central IdP for people.

Machine identities pending.
Evidence: languages=.rs, ci=github-actions
Human Questions: Which IdP issues machine credentials?
Kanbus Task: kanbus-a1b2c3
Last Updated: 2026-08-30T10:05:00Z

> Attribution: AWS Well-Architected Framework
";

#[fixture]
fn pillar() -> PillarId {
    PillarId::new("security").expect("valid pillar slug")
}

#[rstest]
fn serialize_after_parse_preserves_bytes(pillar: PillarId) {
    let report = parse(pillar, CANONICAL).expect("canonical text should parse");
    assert_eq!(serialize(&report), CANONICAL);
}

#[rstest]
fn parse_recovers_fields_exactly(pillar: PillarId) {
    let report = parse(pillar, CANONICAL).expect("canonical text should parse");

    let first = report
        .entry(&QuestionId::new("SEC-1").expect("valid id"))
        .expect("SEC-1 present");
    assert_eq!(first.status(), QuestionStatus::Unanswered);
    assert_eq!(first.confidence(), Confidence::NotApplicable);
    assert_eq!(first.answer(), "");
    assert!(first.task_ref().is_none());

    let second = report
        .entry(&QuestionId::new("SEC-2").expect("valid id"))
        .expect("SEC-2 present");
    assert_eq!(second.status(), QuestionStatus::Partial);
    assert_eq!(
        second.question_text(),
        "How do you manage identities for people\nand machines?"
    );
    assert_eq!(
        second.answer(),
        "Central IdP for people.\n\nMachine identities pending."
    );
    assert_eq!(
        second.task_ref().map(ToString::to_string),
        Some("kanbus-a1b2c3".to_owned())
    );
}

#[rstest]
fn parse_of_serialized_report_is_lossless(pillar: PillarId) {
    let clock = FixedClock::base();
    let mut report = PillarReport::new(
        pillar.clone(),
        "# Security\n\n".to_owned(),
        "\n> footer\n".to_owned(),
    );
    let mut entry = QuestionEntry::new(
        QuestionId::new("SEC-9").expect("valid id"),
        "Short title",
        "Full question text?",
        &clock,
    );
    entry
        .record_answer("\nanswer with leading blank line\n", Confidence::High, &clock)
        .expect("answer should record");
    entry.append_evidence("finding one", &clock);
    report.push_entry(entry);

    let text = serialize(&report);
    let reparsed = parse(pillar, &text).expect("serialized report should parse");
    assert_eq!(reparsed, report);
}

#[rstest]
fn indented_evidence_survives_the_round_trip(pillar: PillarId) {
    let clock = FixedClock::base();
    let mut report = PillarReport::new(pillar.clone(), "# Security\n\n".to_owned(), String::new());
    let mut entry = QuestionEntry::new(
        QuestionId::new("SEC-9").expect("valid id"),
        "Short title",
        "Full question text?",
        &clock,
    );
    // A scanner line shaped like a field label is stored indented.
    entry.append_evidence("scanner output\nStatus: reported by semgrep", &clock);
    report.push_entry(entry);

    let text = serialize(&report);
    let reparsed = parse(pillar, &text).expect("serialized report should parse");
    assert_eq!(reparsed, report);
    let sec9 = reparsed
        .entry(&QuestionId::new("SEC-9").expect("valid id"))
        .expect("SEC-9 present");
    assert_eq!(sec9.evidence(), "scanner output\n Status: reported by semgrep");
}

#[rstest]
fn entry_order_is_preserved(pillar: PillarId) {
    let report = parse(pillar, CANONICAL).expect("canonical text should parse");
    let ids: Vec<&str> = report
        .entries()
        .iter()
        .map(|entry| entry.id().as_str())
        .collect();
    assert_eq!(ids, ["SEC-1", "SEC-2"]);
}

#[rstest]
fn report_without_blocks_round_trips(pillar: PillarId) {
    let text = "# Security\n\nNothing gathered yet.\n";
    let report = parse(pillar, text).expect("block-free text should parse");
    assert!(report.entries().is_empty());
    assert_eq!(serialize(&report), text);
}

#[rstest]
fn out_of_order_field_is_a_schema_error(pillar: PillarId) {
    let text = "\
## SEC-1: Title
Question: q
Confidence: n/a
Status: unanswered
Answer:
Evidence:
Human Questions:
Kanbus Task:
Last Updated: 2026-08-30T10:00:00Z
";
    let result = parse(pillar, text);
    assert_eq!(
        result,
        Err(SchemaError::FieldOrder {
            block: "SEC-1".to_owned(),
            expected: "Status",
            found: "Confidence".to_owned(),
        })
    );
}

#[rstest]
fn unknown_status_token_is_a_schema_error(pillar: PillarId) {
    let text = "\
## SEC-1: Title
Question: q
Status: resolved
Confidence: n/a
Answer:
Evidence:
Human Questions:
Kanbus Task:
Last Updated: 2026-08-30T10:00:00Z
";
    let result = parse(pillar, text);
    assert_eq!(
        result,
        Err(SchemaError::InvalidValue {
            block: "SEC-1".to_owned(),
            field: "Status",
            value: "resolved".to_owned(),
        })
    );
}

#[rstest]
fn missing_field_is_a_schema_error(pillar: PillarId) {
    let text = "\
## SEC-1: Title
Question: q
Status: unanswered
Confidence: n/a
Answer:
Evidence:
Human Questions:
Last Updated: 2026-08-30T10:00:00Z
";
    let result = parse(pillar, text);
    assert_eq!(
        result,
        Err(SchemaError::FieldOrder {
            block: "SEC-1".to_owned(),
            expected: "Kanbus Task",
            found: "Last Updated".to_owned(),
        })
    );
}

#[rstest]
fn malformed_header_is_a_schema_error(pillar: PillarId) {
    let result = parse(pillar, "## no separator here\n");
    assert_eq!(
        result,
        Err(SchemaError::MalformedHeader {
            line: 1,
            text: "## no separator here".to_owned(),
        })
    );
}

#[rstest]
fn stray_content_between_blocks_is_a_schema_error(pillar: PillarId) {
    let text = "\
## SEC-1: Title
Question: q
Status: unanswered
Confidence: n/a
Answer:
Evidence:
Human Questions:
Kanbus Task:
Last Updated: 2026-08-30T10:00:00Z

orphan line

## SEC-2: Title
Question: q
Status: unanswered
Confidence: n/a
Answer:
Evidence:
Human Questions:
Kanbus Task:
Last Updated: 2026-08-30T10:00:00Z
";
    let result = parse(pillar, text);
    assert_eq!(result, Err(SchemaError::StrayContent { line: 11 }));
}

#[rstest]
fn unknown_field_after_single_line_field_is_a_schema_error(pillar: PillarId) {
    let text = "\
## SEC-1: Title
Question: q
Status: unanswered
Notes: free-form
Confidence: n/a
Answer:
Evidence:
Human Questions:
Kanbus Task:
Last Updated: 2026-08-30T10:00:00Z
";
    let result = parse(pillar, text);
    assert_eq!(
        result,
        Err(SchemaError::MissingField {
            block: "SEC-1".to_owned(),
            field: "Confidence",
        })
    );
}

#[rstest]
fn duplicate_block_id_is_a_schema_error(pillar: PillarId) {
    let block = "\
## SEC-1: Title
Question: q
Status: unanswered
Confidence: n/a
Answer:
Evidence:
Human Questions:
Kanbus Task:
Last Updated: 2026-08-30T10:00:00Z
";
    let text = format!("{block}\n{block}");
    let result = parse(pillar, &text);
    assert_eq!(
        result,
        Err(SchemaError::DuplicateBlock {
            block: "SEC-1".to_owned(),
        })
    );
}

#[rstest]
fn invalid_timestamp_is_a_schema_error(pillar: PillarId) {
    let text = "\
## SEC-1: Title
Question: q
Status: unanswered
Confidence: n/a
Answer:
Evidence:
Human Questions:
Kanbus Task:
Last Updated: yesterday
";
    let result = parse(pillar, text);
    assert_eq!(
        result,
        Err(SchemaError::InvalidValue {
            block: "SEC-1".to_owned(),
            field: "Last Updated",
            value: "yesterday".to_owned(),
        })
    );
}

#[rstest]
fn extra_blank_lines_between_blocks_are_normalized(pillar: PillarId) {
    let block = |id: &str| {
        format!(
            "## {id}: Title
Question: q
Status: unanswered
Confidence: n/a
Answer:
Evidence:
Human Questions:
Kanbus Task:
Last Updated: 2026-08-30T10:00:00Z
"
        )
    };
    let loose = format!("{}\n\n\n{}", block("SEC-1"), block("SEC-2"));
    let canonical = format!("{}\n{}\n", block("SEC-1"), block("SEC-2"));

    let report = parse(pillar, &loose).expect("loose spacing should parse");
    assert_eq!(serialize(&report), canonical);
}
