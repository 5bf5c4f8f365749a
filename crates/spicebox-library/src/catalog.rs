//! Queryable catalog of library definitions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::device::DeviceType;
use crate::entry::{ModelEntry, ParsedLibrary, SubcircuitEntry};
use crate::error::Error;
use crate::parser::parse_library;

/// File extensions treated as SPICE library text (compared case-insensitively).
pub const LIBRARY_EXTENSIONS: &[&str] = &[
    "lib", "mod", "model", "sub", "subckt", "cir", "sp", "spi", "spice", "inc", "txt", "ckt",
];

/// Whether a path looks like a library file.
pub fn is_library_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| LIBRARY_EXTENSIONS.iter().any(|l| l.eq_ignore_ascii_case(ext)))
}

/// Outcome of one [`LibraryCatalog::index`] call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub files_scanned: usize,
    pub models_found: usize,
    pub subcircuits_found: usize,
    /// Paths that could not be read or walked.
    pub errors: Vec<String>,
    /// Recoverable problems inside files that were indexed.
    pub warnings: Vec<String>,
}

/// Search parameters.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Case-insensitive substring of the entry name; empty matches everything.
    pub query: String,
    /// Restrict to models of this device type. Subcircuits are excluded.
    pub device_type: Option<String>,
    /// Maximum entries returned per list.
    pub limit: Option<usize>,
    pub include_parameters: bool,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_parameters(mut self) -> Self {
        self.include_parameters = true;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelMatch {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcircuit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubcircuitMatch {
    pub name: String,
    pub nodes: Vec<String>,
    pub node_count: usize,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub models: Vec<ModelMatch>,
    pub subcircuits: Vec<SubcircuitMatch>,
    /// Matches before truncation to the limit.
    pub total_models: usize,
    pub total_subcircuits: usize,
}

impl SearchResults {
    pub fn count(&self) -> usize {
        self.models.len() + self.subcircuits.len()
    }
}

/// Models and subcircuits indexed from library files.
///
/// Entries are grouped by originating file so re-indexing a file replaces
/// what was read from it before. Names are not unique: a search returns every
/// definition that matches, whichever file it came from.
#[derive(Debug, Default)]
pub struct LibraryCatalog {
    files: IndexMap<PathBuf, ParsedLibrary>,
}

impl LibraryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every library file under the given paths (directories are walked
    /// recursively; plain files are indexed directly).
    pub fn index<P: AsRef<Path>>(&mut self, paths: &[P]) -> IndexReport {
        let mut report = IndexReport::default();

        for root in paths {
            let root = root.as_ref();
            if !root.exists() {
                let err = Error::MissingPath(root.to_path_buf());
                warn!("{}", err);
                report.errors.push(err.to_string());
                continue;
            }

            for entry in WalkDir::new(root).follow_links(true) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let err = Error::Walk {
                            path: e.path().unwrap_or(root).to_path_buf(),
                            message: e.to_string(),
                        };
                        warn!("{}", err);
                        report.errors.push(err.to_string());
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !is_library_file(entry.path()) {
                    continue;
                }
                if let Err(err) = self.index_file(entry.path(), &mut report) {
                    warn!("{}", err);
                    report.errors.push(err.to_string());
                }
            }
        }

        info!(
            files = report.files_scanned,
            models = report.models_found,
            subcircuits = report.subcircuits_found,
            errors = report.errors.len(),
            "indexed library paths"
        );
        report
    }

    fn index_file(&mut self, path: &Path, report: &mut IndexReport) -> crate::Result<()> {
        let bytes = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        let parsed = parse_library(&text, path);

        debug!(
            file = %path.display(),
            models = parsed.models.len(),
            subcircuits = parsed.subcircuits.len(),
            "parsed library file"
        );
        for warning in &parsed.warnings {
            warn!("{}", warning);
        }

        report.files_scanned += 1;
        report.models_found += parsed.models.len();
        report.subcircuits_found += parsed.subcircuits.len();
        report.warnings.extend(parsed.warnings.iter().cloned());

        // Keyed by the canonical path so `libs`, `./libs` and an absolute
        // spelling of the same file share one entry.
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.files.insert(key, parsed);
        Ok(())
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelEntry> {
        self.files.values().flat_map(|f| f.models.iter())
    }

    pub fn subcircuits(&self) -> impl Iterator<Item = &SubcircuitEntry> {
        self.files.values().flat_map(|f| f.subcircuits.iter())
    }

    pub fn model_count(&self) -> usize {
        self.models().count()
    }

    pub fn subcircuit_count(&self) -> usize {
        self.subcircuits().count()
    }

    pub fn is_empty(&self) -> bool {
        self.model_count() == 0 && self.subcircuit_count() == 0
    }

    /// Find models and subcircuits by name.
    pub fn search(&self, query: &SearchQuery) -> SearchResults {
        let needle = query.query.trim().to_lowercase();
        let name_matches = |name: &str| needle.is_empty() || name.to_lowercase().contains(&needle);
        let type_filter = query.device_type.as_deref().map(DeviceType::from_filter);
        let limit = query.limit.unwrap_or(usize::MAX);

        let models: Vec<&ModelEntry> = self
            .models()
            .filter(|m| name_matches(&m.name))
            .filter(|m| type_filter.as_ref().is_none_or(|t| &m.device_type == t))
            .collect();
        let subcircuits: Vec<&SubcircuitEntry> = if type_filter.is_some() {
            Vec::new()
        } else {
            self.subcircuits().filter(|s| name_matches(&s.name)).collect()
        };

        SearchResults {
            total_models: models.len(),
            total_subcircuits: subcircuits.len(),
            models: models
                .into_iter()
                .take(limit)
                .map(|m| ModelMatch {
                    name: m.name.clone(),
                    device_type: m.device_type.clone(),
                    file: m.file.display().to_string(),
                    subcircuit: m.subcircuit.clone(),
                    parameters: query.include_parameters.then(|| m.parameters.clone()),
                })
                .collect(),
            subcircuits: subcircuits
                .into_iter()
                .take(limit)
                .map(|s| SubcircuitMatch {
                    name: s.name.clone(),
                    nodes: s.nodes.clone(),
                    node_count: s.node_count(),
                    file: s.file.display().to_string(),
                    parameters: query.include_parameters.then(|| s.parameters.clone()),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_extensions() {
        assert!(is_library_file(Path::new("a/b/diodes.LIB")));
        assert!(is_library_file(Path::new("x.spice")));
        assert!(is_library_file(Path::new("x.Ckt")));
        assert!(!is_library_file(Path::new("x.rs")));
        assert!(!is_library_file(Path::new("README")));
    }

    #[test]
    fn test_empty_catalog_search() {
        let catalog = LibraryCatalog::new();
        let results = catalog.search(&SearchQuery::new(""));
        assert_eq!(results.count(), 0);
        assert!(catalog.is_empty());
    }
}
