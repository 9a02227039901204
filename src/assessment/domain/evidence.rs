//! Evidence bundles, blocks, and application fingerprints.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Inventory of the target repository gathered without external scanners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Source language extensions found in the tree.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Infrastructure-as-code tooling detected.
    #[serde(default)]
    pub infra: Vec<String>,
    /// Continuous integration systems detected.
    #[serde(default)]
    pub ci: Vec<String>,
}

impl Inventory {
    /// One-line summary used as the inventory evidence body; empty when
    /// nothing was detected.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut bits = Vec::new();
        if !self.languages.is_empty() {
            bits.push(format!("languages={}", self.languages.join(",")));
        }
        if !self.infra.is_empty() {
            bits.push(format!("infra={}", self.infra.join(",")));
        }
        if !self.ci.is_empty() {
            bits.push(format!("ci={}", self.ci.join(",")));
        }
        bits.join(", ")
    }
}

/// Result of probing one named optional scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScannerOutcome {
    /// The scanner ran and produced raw findings.
    Ok {
        /// Raw scanner output, kept opaque.
        output: serde_json::Value,
    },
    /// The scanner binary is not available on this host.
    Missing,
}

/// The persisted result of one `scan-evidence` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    /// Repository inventory, always gathered.
    #[serde(default)]
    pub inventory: Inventory,
    /// Optional scanner results by scanner name.
    #[serde(default)]
    pub scanners: BTreeMap<String, ScannerOutcome>,
}

impl EvidenceBundle {
    /// Renders the bundle into named evidence blocks ready for merging.
    /// Unavailable scanners are represented separately by the merge
    /// engine's skip notes, not as blocks.
    #[must_use]
    pub fn blocks(&self) -> Vec<EvidenceBlock> {
        let mut blocks = Vec::new();
        let summary = self.inventory.summary();
        if !summary.is_empty() {
            blocks.push(EvidenceBlock::new("inventory", summary));
        }
        for (name, outcome) in &self.scanners {
            if let ScannerOutcome::Ok { output } = outcome {
                blocks.push(EvidenceBlock::new(name.clone(), summarize_findings(output)));
            }
        }
        blocks
    }

    /// Names of scanners that were requested but not available.
    #[must_use]
    pub fn missing_sources(&self) -> Vec<&str> {
        self.scanners
            .iter()
            .filter(|(_, outcome)| **outcome == ScannerOutcome::Missing)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Renders raw scanner output into the one-line digest stored as evidence.
fn summarize_findings(output: &serde_json::Value) -> String {
    let count = output
        .get("results")
        .or_else(|| output.get("Results"))
        .and_then(serde_json::Value::as_array)
        .map_or_else(
            || output.as_array().map_or(1, Vec::len),
            Vec::len,
        );
    format!("{count} finding(s) recorded")
}

/// One unit of evidence attributed to a named source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceBlock {
    source: String,
    body: String,
}

impl EvidenceBlock {
    /// Creates a block from a source name and its findings body.
    #[must_use]
    pub fn new(source: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            body: body.into(),
        }
    }

    /// Returns the source name.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the findings body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Computes the application fingerprint: identical blocks fingerprint
    /// identically, so re-application is detectable in the ledger.
    #[must_use]
    pub fn fingerprint(&self) -> EvidenceFingerprint {
        EvidenceFingerprint::over(&self.source, &self.body)
    }
}

/// SHA-256 fingerprint of one evidence source/body pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceFingerprint(String);

impl EvidenceFingerprint {
    /// Fingerprints a source/body pair.
    #[must_use]
    pub fn over(source: &str, body: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update([0u8]);
        hasher.update(body.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Returns the full hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the 8-character abbreviation used in evidence markers.
    #[must_use]
    pub fn short(&self) -> String {
        self.0.chars().take(8).collect()
    }
}

impl fmt::Display for EvidenceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
