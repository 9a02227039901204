//! Catalogue records and the attribution notices derived from them.
//!
//! The question catalogue is fetched once and immutable for an assessment's
//! lifetime; this module only models the records the fetch step cached.

use crate::report::domain::{PillarId, QuestionId};
use serde::{Deserialize, Serialize};

const AWS_WA_BASE: &str = "https://docs.aws.amazon.com/wellarchitected/latest/framework";

const TITLE_LIMIT: usize = 80;

/// One catalogue question, immutable within an assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuestion {
    /// Pillar the question belongs to.
    pub pillar: PillarId,
    /// Stable catalogue identifier, unique within the pillar.
    #[serde(rename = "question_id")]
    pub id: QuestionId,
    /// Full question text, treated as opaque.
    #[serde(rename = "question_text")]
    pub text: String,
    /// Page the question was fetched from, cited in attribution notices.
    #[serde(default)]
    pub source_url: String,
}

/// The cached question catalogue, in fetch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Questions in catalogue order across all pillars.
    pub questions: Vec<CatalogQuestion>,
    /// When the cache was fetched, as recorded by the fetch step.
    #[serde(default)]
    pub fetched_at: String,
}

impl Catalog {
    /// Returns the distinct pillars in canonical order.
    #[must_use]
    pub fn pillars(&self) -> Vec<PillarId> {
        let mut pillars: Vec<PillarId> = Vec::new();
        for question in &self.questions {
            if !pillars.contains(&question.pillar) {
                pillars.push(question.pillar.clone());
            }
        }
        pillars.sort_by(|a, b| a.canonical_rank().cmp(&b.canonical_rank()));
        pillars
    }

    /// Returns the questions of one pillar in catalogue order.
    pub fn for_pillar<'a>(
        &'a self,
        pillar: &'a PillarId,
    ) -> impl Iterator<Item = &'a CatalogQuestion> {
        self.questions
            .iter()
            .filter(move |question| question.pillar == *pillar)
    }
}

/// Truncates a question to the short label used in headers and task titles.
#[must_use]
pub fn short_title(question: &str) -> String {
    let trimmed = question.trim();
    if trimmed.chars().count() <= TITLE_LIMIT {
        return trimmed.to_owned();
    }
    let cut: String = trimmed.chars().take(TITLE_LIMIT - 3).collect();
    format!("{}...", cut.trim_end())
}

/// Returns the framework page for a pillar, used in attribution notices.
#[must_use]
pub fn pillar_url(pillar: &PillarId) -> String {
    format!("{AWS_WA_BASE}/{}.html", pillar.as_str())
}

/// The CC BY-SA attribution notice the framework licence requires in every
/// report file.
#[must_use]
pub fn attribution_notice(source_url: &str) -> String {
    format!(
        "AWS Well-Architected Framework (c) Amazon.com, Inc. or its affiliates. \
         Licensed under Creative Commons Attribution-ShareAlike 4.0 International \
         (CC BY-SA 4.0). Source: {source_url}"
    )
}
