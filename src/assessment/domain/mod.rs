//! Domain model for assessment-wide state.

mod assessment;
mod catalog;
mod error;
mod evidence;

pub use assessment::{EvidenceLedger, LinkageMap, PushedState, TaskLink};
pub use catalog::{Catalog, CatalogQuestion, attribution_notice, pillar_url, short_title};
pub use error::AssessmentDomainError;
pub use evidence::{
    EvidenceBlock, EvidenceBundle, EvidenceFingerprint, Inventory, ScannerOutcome,
};
