//! Unit tests for the merge engine, sync engine, and orchestrator.

mod orchestrator_tests;
mod sync_tests;

use crate::assessment::domain::{Catalog, CatalogQuestion};
use crate::report::domain::{PillarId, QuestionEntry, QuestionId};
pub(crate) use crate::report::tests::FixedClock;

pub(crate) fn pillar(slug: &str) -> PillarId {
    PillarId::new(slug).expect("valid pillar slug")
}

pub(crate) fn qid(id: &str) -> QuestionId {
    QuestionId::new(id).expect("valid question id")
}

pub(crate) fn fresh_entry(id: &str) -> QuestionEntry {
    QuestionEntry::new(
        qid(id),
        format!("{id} short title"),
        format!("How does your workload handle {id}?"),
        &FixedClock::base(),
    )
}

/// Two security questions and one reliability question, enough to exercise
/// cross-pillar iteration without drowning assertions in fixtures.
pub(crate) fn sample_catalog() -> Catalog {
    let question = |pillar_slug: &str, id: &str, text: &str| CatalogQuestion {
        pillar: pillar(pillar_slug),
        id: qid(id),
        text: text.to_owned(),
        source_url: format!("https://example.com/{pillar_slug}.html"),
    };
    Catalog {
        questions: vec![
            question("security", "SEC-1", "How do you manage identities?"),
            question("security", "SEC-2", "How do you protect data at rest?"),
            question(
                "reliability",
                "REL-1",
                "How do you design your workload to withstand component failures?",
            ),
        ],
        fetched_at: "2026-08-29T00:00:00+00:00".to_owned(),
    }
}
