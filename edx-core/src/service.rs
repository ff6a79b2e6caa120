//! Collaborator seams: text-generation services and the corpus store.

use crate::error::{EdxError, Result};
use crate::metric::Metric;
use crate::state::StateName;
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Prefix of a values reply that reports a transport failure instead of data.
pub const API_ERROR_PREFIX: &str = "API Error:";

pub fn is_api_error(reply: &str) -> bool {
    reply.trim_start().starts_with(API_ERROR_PREFIX)
}

/// Input for a values request.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuesRequest {
    pub corpus: String,
    pub query: String,
    pub states: Vec<StateName>,
    /// `None` asks for all available metrics.
    pub metrics: Option<Vec<Metric>>,
}

/// Input for a narration request.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationRequest {
    pub corpus: String,
    pub query: String,
    pub states: Vec<StateName>,
    /// The finished value table in reply grammar.
    pub values_text: String,
}

/// Produces a loosely formatted text reply listing numeric values.
///
/// Never fails: transport failures come back as a string starting with
/// [`API_ERROR_PREFIX`].
#[async_trait]
pub trait ValuesService: Send + Sync {
    async fn values(&self, request: &ValuesRequest) -> String;
}

/// Produces prose describing the values.
#[async_trait]
pub trait NarrationService: Send + Sync {
    async fn narrate(&self, request: &NarrationRequest) -> Result<String>;
}

/// State name to reference text. `Ok(None)` means no corpus exists for the state.
pub trait CorpusLookup: Send + Sync {
    fn lookup(&self, state: StateName) -> Result<Option<String>>;
}

/// Corpus files `"<State>_training_corpus.txt"` under one folder.
#[derive(Debug, Clone)]
pub struct CorpusFolder {
    root: PathBuf,
}

impl CorpusFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl CorpusLookup for CorpusFolder {
    fn lookup(&self, state: StateName) -> Result<Option<String>> {
        let path = self.root.join(state.corpus_file_name());
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                debug!("Loaded corpus for {} from {}", state, path.display());
                Ok(Some(text))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("No corpus file at {}", path.display());
                Ok(None)
            }
            Err(source) => Err(EdxError::CorpusRead {
                state: state.name().to_string(),
                source,
            }),
        }
    }
}

/// In-memory corpus, mostly for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryCorpus {
    blobs: HashMap<StateName, String>,
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, state: StateName, text: impl Into<String>) -> Self {
        self.blobs.insert(state, text.into());
        self
    }
}

impl CorpusLookup for MemoryCorpus {
    fn lookup(&self, state: StateName) -> Result<Option<String>> {
        Ok(self.blobs.get(&state).cloned())
    }
}

/// Reference text for a set of states, concatenated in the order given.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CorpusContext {
    pub text: String,
    pub missing: Vec<StateName>,
}

impl CorpusContext {
    pub fn collect(lookup: &dyn CorpusLookup, states: &[StateName]) -> Result<CorpusContext> {
        let mut context = CorpusContext::default();
        for state in states {
            match lookup.lookup(*state)? {
                Some(blob) => {
                    context.text.push_str(&format!("\n--- {} ---\n", state));
                    context.text.push_str(&blob);
                }
                None => context.missing.push(*state),
            }
        }
        Ok(context)
    }

    /// Fail on the first state without a corpus.
    pub fn require_all(self) -> Result<CorpusContext> {
        match self.missing.first() {
            Some(state) => Err(EdxError::CorpusNotFound(state.name().to_string())),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn state(name: &str) -> StateName {
        StateName::lookup(name).unwrap()
    }

    fn fixture_corpus() -> CorpusFolder {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures/corpus");
        CorpusFolder::new(root)
    }

    #[test]
    fn test_api_error_prefix() {
        assert!(is_api_error("API Error: connection refused"));
        assert!(!is_api_error("2023 Kerala\nNDVI: 0.4"));
    }

    #[test]
    fn test_corpus_folder_reads_fixture() {
        let text = fixture_corpus().lookup(state("Kerala")).unwrap().unwrap();
        assert!(text.contains("Kerala"));
    }

    #[test]
    fn test_corpus_folder_missing_file_is_none() {
        assert!(fixture_corpus().lookup(state("Sikkim")).unwrap().is_none());
    }

    #[test]
    fn test_corpus_context_concatenates_in_order() {
        let corpus = MemoryCorpus::new()
            .with(state("Goa"), "goa text")
            .with(state("Kerala"), "kerala text");
        let context = CorpusContext::collect(&corpus, &[state("Goa"), state("Kerala")]).unwrap();
        assert_eq!(context.text, "\n--- Goa ---\ngoa text\n--- Kerala ---\nkerala text");
        assert!(context.missing.is_empty());
    }

    #[test]
    fn test_missing_corpus_is_reported() {
        let corpus = MemoryCorpus::new().with(state("Goa"), "");
        let context = CorpusContext::collect(&corpus, &[state("Goa"), state("Assam")]).unwrap();
        assert_eq!(context.missing, vec![state("Assam")]);
        let err = context.require_all().unwrap_err();
        assert_eq!(err.to_string(), "No data file for Assam.");
    }
}
