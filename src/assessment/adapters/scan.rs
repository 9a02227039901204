//! Repository inventory detection and command-line evidence scanners.

use crate::assessment::domain::Inventory;
use crate::assessment::ports::{EvidenceScanner, ScanError, ScanResult};
use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// Source file extensions recognised as languages.
const LANGUAGE_EXTENSIONS: [&str; 7] = ["py", "js", "ts", "go", "java", "rb", "rs"];

/// Walks the target tree and reports the languages, infrastructure
/// tooling, and CI systems it finds. The walk skips `.git`.
///
/// # Errors
///
/// Returns [`ScanError::Io`] when the target directory cannot be read.
pub fn detect_inventory(target: &Utf8Path) -> ScanResult<Inventory> {
    let io_err = |err| ScanError::Io {
        scanner: "inventory".to_owned(),
        source: Arc::new(err),
    };
    let dir = Dir::open_ambient_dir(target, ambient_authority()).map_err(io_err)?;

    let mut languages = BTreeSet::new();
    let mut infra = BTreeSet::new();
    walk(&dir, "", &mut |path| {
        if let Some(ext) = Utf8Path::new(path).extension() {
            let ext = ext.to_ascii_lowercase();
            if LANGUAGE_EXTENSIONS.contains(&ext.as_str()) {
                languages.insert(format!(".{ext}"));
            }
            if ext == "tf" {
                infra.insert("terraform".to_owned());
            }
        }
        let name = Utf8Path::new(path).file_name().unwrap_or(path);
        if name == "template.yaml" || name == "template.yml" {
            infra.insert("sam".to_owned());
        }
        if name == "serverless.yml" {
            infra.insert("serverless".to_owned());
        }
        if path.ends_with(".yaml") && path.split('/').any(|part| part == "helm") {
            infra.insert("helm".to_owned());
        }
    })
    .map_err(io_err)?;

    let mut ci = BTreeSet::new();
    if dir.try_exists(".github/workflows").unwrap_or(false) {
        ci.insert("github-actions".to_owned());
    }
    if dir.try_exists(".gitlab-ci.yml").unwrap_or(false) {
        ci.insert("gitlab".to_owned());
    }
    if dir.try_exists("Jenkinsfile").unwrap_or(false) {
        ci.insert("jenkins".to_owned());
    }

    Ok(Inventory {
        languages: languages.into_iter().collect(),
        infra: infra.into_iter().collect(),
        ci: ci.into_iter().collect(),
    })
}

fn walk(dir: &Dir, prefix: &str, visit: &mut impl FnMut(&str)) -> std::io::Result<()> {
    for entry in dir.entries()? {
        let entry = entry?;
        let name = entry.file_name()?;
        if name == ".git" {
            continue;
        }
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(&entry.open_dir()?, &path, visit)?;
        } else if file_type.is_file() {
            visit(&path);
        }
    }
    Ok(())
}

/// [`EvidenceScanner`] invoking an external analysis binary that emits
/// JSON on stdout, with the target path appended to its arguments.
#[derive(Debug, Clone)]
pub struct CommandScanner {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandScanner {
    /// Creates a scanner for an arbitrary JSON-emitting command.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        args: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: args.into_iter().collect(),
        }
    }

    /// The semgrep static-analysis scanner.
    #[must_use]
    pub fn semgrep() -> Self {
        Self::new(
            "semgrep",
            "semgrep",
            ["--json", "--config", "auto"].map(str::to_owned),
        )
    }

    /// The trivy filesystem vulnerability scanner.
    #[must_use]
    pub fn trivy() -> Self {
        Self::new("trivy", "trivy", ["fs", "--format", "json"].map(str::to_owned))
    }
}

/// Whether `program` resolves to an executable file on `PATH`.
fn on_path(program: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| dir.join(program).is_file())
}

#[async_trait]
impl EvidenceScanner for CommandScanner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn available(&self) -> bool {
        on_path(&self.program)
    }

    async fn collect(&self, target: &Utf8Path) -> ScanResult<serde_json::Value> {
        debug!(scanner = %self.name, target = %target, "running scanner");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(target.as_str())
            .output()
            .await
            .map_err(|err| ScanError::Io {
                scanner: self.name.clone(),
                source: Arc::new(err),
            })?;
        if !output.status.success() {
            return Err(ScanError::Execution {
                scanner: self.name.clone(),
                message: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        serde_json::from_slice(&output.stdout).map_err(|err| ScanError::Execution {
            scanner: self.name.clone(),
            message: err.to_string(),
        })
    }
}
