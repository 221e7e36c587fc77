use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A statement and the reply the bot learned for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub statement: String,
    pub response: String,
}

#[derive(Debug, Deserialize)]
struct CorpusFile {
    conversations: Vec<Vec<String>>,
}

/// Where a named corpus comes from.
#[derive(Debug, Clone)]
pub enum CorpusSource {
    File { name: String, path: PathBuf },
    Inline { name: String, conversations: Vec<Vec<String>> },
}

impl CorpusSource {
    /// `<dir>/<name>.json`
    pub fn in_dir(dir: &Path, name: &str) -> Self {
        Self::File {
            name: name.to_string(),
            path: dir.join(format!("{}.json", name)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Inline { name, .. } => name,
        }
    }

    fn conversations(&self) -> Result<Vec<Vec<String>>, String> {
        match self {
            Self::Inline { conversations, .. } => Ok(conversations.clone()),
            Self::File { path, .. } => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
                let corpus: CorpusFile = serde_json::from_str(&raw)
                    .map_err(|e| format!("cannot parse {}: {}", path.display(), e))?;
                Ok(corpus.conversations)
            }
        }
    }
}

/// Result of trying one corpus.
#[derive(Debug, Clone)]
pub enum TrainingOutcome {
    Trained { corpus: String, rules: Vec<Rule> },
    Unavailable { corpus: String, reason: String },
}

/// Tries corpora in order and keeps the first one that yields rules.
#[derive(Debug, Clone, Default)]
pub struct CorpusTrainer {
    sources: Vec<CorpusSource>,
}

impl CorpusTrainer {
    pub fn new(sources: Vec<CorpusSource>) -> Self {
        Self { sources }
    }

    pub fn from_dir(dir: &Path, names: &[String]) -> Self {
        Self::new(names.iter().map(|name| CorpusSource::in_dir(dir, name)).collect())
    }

    pub fn try_source(source: &CorpusSource) -> TrainingOutcome {
        let corpus = source.name().to_string();
        match source.conversations() {
            Ok(conversations) => {
                let rules = rules_from(&conversations);
                if rules.is_empty() {
                    TrainingOutcome::Unavailable {
                        corpus,
                        reason: "corpus has no statement/response pairs".to_string(),
                    }
                } else {
                    TrainingOutcome::Trained { corpus, rules }
                }
            }
            Err(reason) => TrainingOutcome::Unavailable { corpus, reason },
        }
    }

    /// Every attempt in order, stopping at the first success.
    pub fn train(&self) -> Vec<TrainingOutcome> {
        let mut outcomes = Vec::new();
        for source in &self.sources {
            let outcome = Self::try_source(source);
            match &outcome {
                TrainingOutcome::Trained { corpus, rules } => {
                    info!("Trained on corpus '{}' ({} rules)", corpus, rules.len());
                    outcomes.push(outcome);
                    return outcomes;
                }
                TrainingOutcome::Unavailable { corpus, reason } => {
                    warn!("Corpus '{}' unavailable: {}", corpus, reason);
                    outcomes.push(outcome);
                }
            }
        }

        warn!("Corpus training skipped (no corpus available)");
        outcomes
    }
}

// Consecutive lines of a conversation become statement -> response pairs
fn rules_from(conversations: &[Vec<String>]) -> Vec<Rule> {
    conversations
        .iter()
        .flat_map(|lines| {
            lines.windows(2).map(|pair| Rule {
                statement: pair[0].clone(),
                response: pair[1].clone(),
            })
        })
        .collect()
}
