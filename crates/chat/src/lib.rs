//! Rule-based chatbot trained from statement/response corpora

pub mod corpus;

pub use corpus::{CorpusSource, CorpusTrainer, Rule, TrainingOutcome};

use std::collections::HashSet;
use tracing::debug;

pub const DEFAULT_BOT_NAME: &str = "MapBot";
pub const DEFAULT_RESPONSE: &str = "I am sorry, but I do not understand.";
const MIN_SIMILARITY: f32 = 0.2;

pub struct ChatBot {
    name: String,
    corpus: Option<String>,
    rules: Vec<(HashSet<String>, Rule)>,
}

impl ChatBot {
    pub fn untrained(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            corpus: None,
            rules: Vec::new(),
        }
    }

    /// Runs the trainer and learns from whichever corpus succeeded, if any.
    pub fn train(name: impl Into<String>, trainer: &CorpusTrainer) -> Self {
        let mut bot = Self::untrained(name);
        for outcome in trainer.train() {
            if let TrainingOutcome::Trained { corpus, rules } = outcome {
                bot.learn(&corpus, rules);
            }
        }
        bot
    }

    pub fn learn(&mut self, corpus: &str, rules: Vec<Rule>) {
        self.rules.extend(
            rules
                .into_iter()
                .map(|rule| (tokens(&rule.statement), rule)),
        );
        self.corpus = Some(corpus.to_string());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the corpus the bot learned from, if any.
    pub fn corpus(&self) -> Option<&str> {
        self.corpus.as_deref()
    }

    pub fn is_trained(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Reply of the closest known statement, or the default response.
    pub fn respond(&self, message: &str) -> String {
        let query = tokens(message);

        let mut best: Option<(f32, &Rule)> = None;
        for (statement, rule) in &self.rules {
            let score = jaccard(&query, statement);
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, rule));
            }
        }

        match best {
            Some((score, rule)) if score >= MIN_SIMILARITY => {
                debug!("Matched '{}' with similarity {:.2}", rule.statement, score);
                rule.response.clone()
            }
            _ => DEFAULT_RESPONSE.to_string(),
        }
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trained() -> ChatBot {
        let trainer = CorpusTrainer::new(vec![CorpusSource::Inline {
            name: "english".to_string(),
            conversations: vec![
                vec!["Hello".to_string(), "Hi there!".to_string()],
                vec![
                    "Where is the castle?".to_string(),
                    "The castle is above Malá Strana.".to_string(),
                ],
                vec!["How are you?".to_string(), "I am doing well.".to_string()],
            ],
        }]);
        ChatBot::train(DEFAULT_BOT_NAME, &trainer)
    }

    #[test]
    fn test_exact_statement_gets_its_response() {
        let bot = trained();
        assert!(bot.is_trained());
        assert_eq!(bot.corpus(), Some("english"));
        assert_eq!(bot.respond("hello"), "Hi there!");
    }

    #[test]
    fn test_closest_statement_wins() {
        let bot = trained();
        assert_eq!(
            bot.respond("where is the old castle"),
            "The castle is above Malá Strana."
        );
    }

    #[test]
    fn test_unknown_message_gets_default() {
        let bot = trained();
        assert_eq!(bot.respond("quantum chromodynamics"), DEFAULT_RESPONSE);
        assert_eq!(bot.respond(""), DEFAULT_RESPONSE);
    }

    #[test]
    fn test_untrained_bot_still_answers() {
        let bot = ChatBot::train(DEFAULT_BOT_NAME, &CorpusTrainer::default());
        assert!(!bot.is_trained());
        assert_eq!(bot.corpus(), None);
        assert_eq!(bot.respond("Hello"), DEFAULT_RESPONSE);
        assert_eq!(bot.name(), "MapBot");
    }
}
