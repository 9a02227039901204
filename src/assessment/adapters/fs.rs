//! Filesystem adapters backed by capability-scoped directory handles.
//!
//! All access goes through a [`Dir`] opened once on the assessment (or
//! cache) directory, so nothing here can reach outside the tree it was
//! handed.

use crate::assessment::domain::{Catalog, EvidenceBundle, EvidenceLedger, LinkageMap};
use crate::assessment::ports::{
    AssessmentStore, CatalogError, CatalogResult, CatalogSource, StoreError, StoreResult,
};
use crate::report::domain::PillarId;
use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

const LINKAGE_FILE: &str = "kanbus-map.json";
const LEDGER_FILE: &str = "evidence-ledger.json";
const EVIDENCE_FILE: &str = "evidence.json";
const INDEX_FILE: &str = "index.md";
const CACHE_FILE: &str = "questions.json";

/// [`AssessmentStore`] over one assessment directory.
///
/// Layout: one `<pillar>.md` report per pillar plus the JSON artefacts
/// (`kanbus-map.json`, `evidence-ledger.json`, `evidence.json`) and the
/// `index.md` summary.
#[derive(Debug)]
pub struct FsAssessmentStore {
    dir: Dir,
}

impl FsAssessmentStore {
    /// Opens (creating if needed) the directory for one assessment under
    /// the reports root.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the directory cannot be created or
    /// opened.
    pub fn open(reports_dir: &Utf8Path, assessment: &str) -> StoreResult<Self> {
        let path = reports_dir.join(assessment);
        std::fs::create_dir_all(&path).map_err(|err| StoreError::io(path.as_str(), err))?;
        let dir = Dir::open_ambient_dir(&path, ambient_authority())
            .map_err(|err| StoreError::io(path.as_str(), err))?;
        Ok(Self { dir })
    }

    fn read_optional(&self, name: &str) -> StoreResult<Option<String>> {
        match self.dir.read_to_string(name) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::io(name, err)),
        }
    }

    fn write_text(&self, name: &str, text: &str) -> StoreResult<()> {
        self.dir
            .write(name, text.as_bytes())
            .map_err(|err| StoreError::io(name, err))
    }

    fn read_json<V: DeserializeOwned>(&self, name: &str) -> StoreResult<Option<V>> {
        let Some(text) = self.read_optional(name)? else {
            return Ok(None);
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|err| StoreError::malformed(name, err))
    }

    fn write_json<V: Serialize>(&self, name: &str, value: &V) -> StoreResult<()> {
        let text =
            serde_json::to_string_pretty(value).map_err(|err| StoreError::malformed(name, err))?;
        self.write_text(name, &text)
    }

    fn report_file(pillar: &PillarId) -> String {
        format!("{}.md", pillar.as_str())
    }
}

#[async_trait]
impl AssessmentStore for FsAssessmentStore {
    async fn list_pillars(&self) -> StoreResult<Vec<PillarId>> {
        let entries = self
            .dir
            .entries()
            .map_err(|err| StoreError::io(".", err))?;
        let mut pillars = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::io(".", err))?;
            let name = entry
                .file_name()
                .map_err(|err| StoreError::io(".", err))?;
            let Some(stem) = name.strip_suffix(".md") else {
                continue;
            };
            if name == INDEX_FILE {
                continue;
            }
            if let Ok(pillar) = PillarId::new(stem) {
                pillars.push(pillar);
            }
        }
        pillars.sort_by(|a, b| a.canonical_rank().cmp(&b.canonical_rank()));
        Ok(pillars)
    }

    async fn read_report(&self, pillar: &PillarId) -> StoreResult<Option<String>> {
        self.read_optional(&Self::report_file(pillar))
    }

    async fn write_report(&self, pillar: &PillarId, text: &str) -> StoreResult<()> {
        debug!(pillar = %pillar, bytes = text.len(), "writing report");
        self.write_text(&Self::report_file(pillar), text)
    }

    async fn read_linkage(&self) -> StoreResult<Option<LinkageMap>> {
        self.read_json(LINKAGE_FILE)
    }

    async fn write_linkage(&self, linkage: &LinkageMap) -> StoreResult<()> {
        self.write_json(LINKAGE_FILE, linkage)
    }

    async fn read_ledger(&self) -> StoreResult<Option<EvidenceLedger>> {
        self.read_json(LEDGER_FILE)
    }

    async fn write_ledger(&self, ledger: &EvidenceLedger) -> StoreResult<()> {
        self.write_json(LEDGER_FILE, ledger)
    }

    async fn read_evidence(&self) -> StoreResult<Option<EvidenceBundle>> {
        self.read_json(EVIDENCE_FILE)
    }

    async fn write_evidence(&self, bundle: &EvidenceBundle) -> StoreResult<()> {
        self.write_json(EVIDENCE_FILE, bundle)
    }

    async fn write_index(&self, text: &str) -> StoreResult<()> {
        self.write_text(INDEX_FILE, text)
    }
}

/// [`CatalogSource`] reading the fetched `questions.json` cache.
#[derive(Debug)]
pub struct FsCatalogSource {
    cache_dir: camino::Utf8PathBuf,
}

impl FsCatalogSource {
    /// Reads the catalogue cache from the given directory.
    #[must_use]
    pub fn new(cache_dir: impl Into<camino::Utf8PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }
}

#[async_trait]
impl CatalogSource for FsCatalogSource {
    async fn load(&self) -> CatalogResult<Catalog> {
        let dir = match Dir::open_ambient_dir(&self.cache_dir, ambient_authority()) {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::NotFetched);
            }
            Err(err) => return Err(CatalogError::Io(std::sync::Arc::new(err))),
        };
        let text = match dir.read_to_string(CACHE_FILE) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::NotFetched);
            }
            Err(err) => return Err(CatalogError::Io(std::sync::Arc::new(err))),
        };
        serde_json::from_str(&text).map_err(|err| CatalogError::Malformed(err.to_string()))
    }
}
