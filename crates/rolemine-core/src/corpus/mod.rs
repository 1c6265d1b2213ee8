//! Corpus ingest and action sequence extraction.
//!
//! Provides:
//! - [`source::CorpusSource`] — where documents come from (memory or a directory)
//! - [`parse::parse_document`] — raw structured value → typed `RoleDocument`
//! - [`selector::select`] — canonical revision selection
//! - [`extractor::extract_corpus`] — per-role canonical action sequences

pub mod extractor;
pub mod parse;
pub mod selector;
pub mod source;

pub use extractor::{extract, extract_corpus, CorpusSequences, RoleSequence};
pub use parse::{parse_block, parse_document, ParsedDocument};
pub use selector::select;
pub use source::{CorpusSource, DirectoryCorpus, InMemoryCorpus, LoadedCorpus};
