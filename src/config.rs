//! Explicit configuration for assessment operations.
//!
//! All process-wide state (report locations, the question cache, the tracker
//! binary) travels in [`AssessmentConfig`] rather than being read ambiently,
//! so the engine can run against in-memory fakes in tests.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};

/// Default directory holding pillar report trees.
pub const REPORTS_DIR_DEFAULT: &str = "reports";

/// Cache directory suffix under the user's home directory.
const CACHE_DIR_SUFFIX: &str = ".cache/well-architected";

/// Configuration for one assessment's operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentConfig {
    /// Directory containing per-assessment report subdirectories.
    pub reports_dir: Utf8PathBuf,
    /// Directory holding the fetched question catalogue cache.
    pub cache_dir: Utf8PathBuf,
    /// Assessment name; also the report subdirectory name.
    pub assessment: String,
    /// Name of the Kanbus tracker binary to invoke.
    pub kanbus_program: String,
}

impl AssessmentConfig {
    /// Creates a configuration with default locations for the given
    /// assessment name.
    #[must_use]
    pub fn new(assessment: impl Into<String>) -> Self {
        Self {
            reports_dir: Utf8PathBuf::from(REPORTS_DIR_DEFAULT),
            cache_dir: default_cache_dir(),
            assessment: assessment.into(),
            kanbus_program: "kanbus".to_owned(),
        }
    }

    /// Overrides the reports directory.
    #[must_use]
    pub fn with_reports_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.reports_dir = dir.into();
        self
    }

    /// Overrides the catalogue cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }
}

/// Returns the default catalogue cache directory under `$HOME`, falling back
/// to the working directory when `$HOME` is unset.
#[must_use]
pub fn default_cache_dir() -> Utf8PathBuf {
    std::env::var("HOME").map_or_else(
        |_| Utf8PathBuf::from(CACHE_DIR_SUFFIX),
        |home| Utf8PathBuf::from(home).join(CACHE_DIR_SUFFIX),
    )
}

/// Derives the default assessment slug from a target directory name and the
/// given date, e.g. `my-service-20260830`.
#[must_use]
pub fn assessment_slug(target_dir: &Utf8Path, today: DateTime<Utc>) -> String {
    let name = target_dir
        .file_name()
        .filter(|name| !name.is_empty())
        .unwrap_or("assessment");
    format!("{name}-{}", today.format("%Y%m%d"))
}
