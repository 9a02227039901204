//! Pillar identifiers and the pillar report aggregate.

use super::{QuestionEntry, QuestionId, ReportDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The six framework pillars in their canonical presentation order.
const CANONICAL_PILLARS: [&str; 6] = [
    "operational-excellence",
    "security",
    "reliability",
    "performance-efficiency",
    "cost-optimization",
    "sustainability",
];

/// Kebab-case pillar slug, e.g. `operational-excellence`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PillarId(String);

impl PillarId {
    /// Creates a pillar identifier from a kebab-case slug.
    ///
    /// # Errors
    ///
    /// Returns [`ReportDomainError::InvalidPillarId`] when the slug is
    /// empty or contains characters outside `a-z`, `0-9`, and `-`.
    pub fn new(slug: impl Into<String>) -> Result<Self, ReportDomainError> {
        let slug = slug.into();
        let valid = !slug.is_empty()
            && slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(ReportDomainError::InvalidPillarId(slug));
        }
        Ok(Self(slug))
    }

    /// Returns the slug text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the human presentation title, e.g. `Operational Excellence`.
    #[must_use]
    pub fn title(&self) -> String {
        self.0
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Returns the sort rank: well-known pillars in framework order first,
    /// anything else after them alphabetically. Used wherever pillar
    /// iteration order must be deterministic.
    #[must_use]
    pub fn canonical_rank(&self) -> (usize, &str) {
        let rank = CANONICAL_PILLARS
            .iter()
            .position(|known| *known == self.0)
            .unwrap_or(CANONICAL_PILLARS.len());
        (rank, &self.0)
    }
}

impl fmt::Display for PillarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One pillar's ordered question entries plus the verbatim text that
/// surrounds them in the report file.
///
/// Entry order is catalogue order and is preserved across round-trips; the
/// preamble and epilogue carry the report heading and attribution notices
/// byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PillarReport {
    pillar: PillarId,
    preamble: String,
    entries: Vec<QuestionEntry>,
    epilogue: String,
}

impl PillarReport {
    /// Creates an empty report with the given surrounding text.
    #[must_use]
    pub const fn new(pillar: PillarId, preamble: String, epilogue: String) -> Self {
        Self {
            pillar,
            preamble,
            entries: Vec::new(),
            epilogue,
        }
    }

    /// Returns the pillar this report belongs to.
    #[must_use]
    pub const fn pillar(&self) -> &PillarId {
        &self.pillar
    }

    /// Returns the verbatim text preceding the first entry block.
    #[must_use]
    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// Returns the verbatim text following the final entry block.
    #[must_use]
    pub fn epilogue(&self) -> &str {
        &self.epilogue
    }

    /// Replaces the epilogue text. Used by the codec once the final block
    /// boundary is known.
    pub fn set_epilogue(&mut self, epilogue: String) {
        self.epilogue = epilogue;
    }

    /// Returns the entries in catalogue order.
    #[must_use]
    pub fn entries(&self) -> &[QuestionEntry] {
        &self.entries
    }

    /// Returns mutable access to the entries, preserving order.
    pub fn entries_mut(&mut self) -> &mut [QuestionEntry] {
        &mut self.entries
    }

    /// Appends an entry in catalogue order.
    ///
    /// The report is a pure container: id uniqueness is checked by
    /// [`validate`](super::validate) and by the codec on parse, not here.
    pub fn push_entry(&mut self, entry: QuestionEntry) {
        self.entries.push(entry);
    }

    /// Finds an entry by question id.
    #[must_use]
    pub fn entry(&self, id: &QuestionId) -> Option<&QuestionEntry> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    /// Finds an entry by question id for mutation.
    pub fn entry_mut(&mut self, id: &QuestionId) -> Option<&mut QuestionEntry> {
        self.entries.iter_mut().find(|entry| entry.id() == id)
    }
}
