//! Corpus sources: where role documents come from.
//!
//! The extraction engine only ever sees `&[RoleDocument]`. A
//! [`CorpusSource`] is the seam where documents are produced, either handed
//! over already parsed ([`InMemoryCorpus`]) or read from a directory of YAML /
//! JSON files ([`DirectoryCorpus`]).

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::corpus::parse::parse_document;
use crate::domain::{MalformedDocument, MineError, MineResult, RoleDocument};

/// Documents plus the malformed nodes skipped while producing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedCorpus {
    pub documents: Vec<RoleDocument>,
    pub malformed: Vec<MalformedDocument>,
}

/// Injectable producer of role documents.
pub trait CorpusSource: Send + Sync {
    /// Short label for logs and reports.
    fn describe(&self) -> String;

    fn load(&self) -> MineResult<LoadedCorpus>;
}

/// Documents supplied directly by the caller.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    documents: Vec<RoleDocument>,
}

impl InMemoryCorpus {
    pub fn new(documents: Vec<RoleDocument>) -> Self {
        Self { documents }
    }
}

impl CorpusSource for InMemoryCorpus {
    fn describe(&self) -> String {
        format!("in-memory ({} documents)", self.documents.len())
    }

    fn load(&self) -> MineResult<LoadedCorpus> {
        Ok(LoadedCorpus {
            documents: self.documents.clone(),
            malformed: Vec::new(),
        })
    }
}

/// A directory of `*.yaml`, `*.yml` and `*.json` role documents, one role per
/// file.
#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    root: PathBuf,
}

impl DirectoryCorpus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Corpus files sorted by name so document order is reproducible.
    fn corpus_files(&self) -> MineResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_file() && document_format(&path).is_some() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Yaml,
    Json,
}

fn document_format(path: &Path) -> Option<DocumentFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => Some(DocumentFormat::Yaml),
        Some("json") => Some(DocumentFormat::Json),
        _ => None,
    }
}

fn decode(path: &Path, format: DocumentFormat) -> Result<Value, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("unreadable: {}", e))?;
    match format {
        DocumentFormat::Yaml => {
            serde_yaml::from_str(&text).map_err(|e| format!("invalid YAML: {}", e))
        }
        DocumentFormat::Json => {
            serde_json::from_str(&text).map_err(|e| format!("invalid JSON: {}", e))
        }
    }
}

impl CorpusSource for DirectoryCorpus {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn load(&self) -> MineResult<LoadedCorpus> {
        if !self.root.is_dir() {
            return Err(MineError::MissingCorpusLocation {
                path: self.root.clone(),
            });
        }

        let files = self.corpus_files()?;
        let mut corpus = LoadedCorpus::default();

        for path in &files {
            let origin = path.display().to_string();
            let Some(format) = document_format(path) else {
                continue;
            };

            let raw = match decode(path, format) {
                Ok(raw) => raw,
                Err(reason) => {
                    let malformed = MalformedDocument::document(origin, reason);
                    warn!(event = "corpus.malformed", error = %malformed);
                    corpus.malformed.push(malformed);
                    continue;
                }
            };

            match parse_document(&raw, &origin) {
                Ok(parsed) => {
                    for m in &parsed.malformed {
                        warn!(event = "corpus.malformed", error = %m);
                    }
                    corpus.malformed.extend(parsed.malformed);
                    corpus.documents.push(parsed.document);
                }
                Err(malformed) => {
                    warn!(event = "corpus.malformed", error = %malformed);
                    corpus.malformed.push(malformed);
                }
            }
        }

        info!(
            event = "corpus.loaded",
            root = %self.root.display(),
            files = files.len(),
            documents = corpus.documents.len(),
            malformed = corpus.malformed.len(),
        );
        Ok(corpus)
    }
}
