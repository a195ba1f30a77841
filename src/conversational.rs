//! Conversational response handler
//!
//! Owns the intent catalog and the fitted classifier. Each utterance is
//! classified, and one of the predicted intent's canned responses is chosen
//! uniformly at random with a caller-supplied random source.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::chat_log::ChatLog;
use crate::classifier::{ClassifierConfig, IntentClassifier};
use crate::intents::IntentCatalog;
use crate::models::{ChatLogEntry, ChatReply};
use crate::Result;

/// Answer used when the predicted tag has no intent in the catalog
pub const FALLBACK_RESPONSE: &str = "Sorry, I didn't understand that.";

/// Replies that end an interactive session
const FAREWELL_REPLIES: &[&str] = &["goodbye", "bye"];

/// Immutable chatbot: catalog plus fitted model
#[derive(Debug)]
pub struct Chatbot {
    catalog: IntentCatalog,
    classifier: IntentClassifier,
}

impl Chatbot {
    /// Fit a classifier on `catalog` with default parameters
    pub fn train(catalog: IntentCatalog) -> Result<Self> {
        Self::train_with_config(catalog, &ClassifierConfig::default())
    }

    pub fn train_with_config(catalog: IntentCatalog, config: &ClassifierConfig) -> Result<Self> {
        let classifier = IntentClassifier::fit_with_config(&catalog, config)?;
        Ok(Self::from_parts(catalog, classifier))
    }

    /// Pair an already fitted classifier with a catalog
    pub fn from_parts(catalog: IntentCatalog, classifier: IntentClassifier) -> Self {
        Self {
            catalog,
            classifier,
        }
    }

    pub fn catalog(&self) -> &IntentCatalog {
        &self.catalog
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    /// Most likely intent tag for `text`
    pub fn predict(&self, text: &str) -> &str {
        self.classifier.predict(text)
    }

    /// One response for `text`
    pub fn respond<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> &str {
        self.answer(text, rng).0
    }

    /// Respond and append the turn to `log`.
    ///
    /// A failed log write is reported in `log_warning`; the answer is
    /// returned regardless.
    pub fn chat<R: Rng + ?Sized>(&self, text: &str, rng: &mut R, log: Option<&ChatLog>) -> ChatReply {
        let (answer, tag) = self.answer(text, rng);

        let log_warning = log.and_then(|log| {
            log.append(&ChatLogEntry::now(text, answer))
                .err()
                .map(|e| {
                    warn!(path = %log.path().display(), error = %e, "Chat log write failed");
                    e.to_string()
                })
        });

        ChatReply {
            answer: answer.to_string(),
            tag: tag.map(str::to_string),
            log_warning,
        }
    }

    fn answer<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> (&str, Option<&str>) {
        let tag = self.classifier.predict(text);

        let chosen = self
            .catalog
            .get(tag)
            .and_then(|intent| intent.responses.choose(rng));

        match chosen {
            Some(response) => {
                debug!(tag = %tag, "Predicted intent");
                (response.as_str(), Some(tag))
            }
            None => {
                warn!(tag = %tag, "Predicted tag missing from catalog, using fallback");
                (FALLBACK_RESPONSE, None)
            }
        }
    }
}

/// Whether a bot reply closes the conversation
pub fn is_farewell(reply: &str) -> bool {
    let normalized = reply
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase();

    FAREWELL_REPLIES.contains(&normalized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    const DEFINITIONS: &str = r#"[
        {"tag": "greeting", "patterns": ["hi", "hello", "hey there", "good morning"],
         "responses": ["Hello!", "Hi there!", "Greetings, friend."]},
        {"tag": "farewell", "patterns": ["bye", "goodbye", "see you later", "talk to you soon"],
         "responses": ["Goodbye!"]},
        {"tag": "thanks", "patterns": ["thanks", "thank you", "much appreciated", "thanks a lot"],
         "responses": ["You're welcome!", "Happy to help."]}
    ]"#;

    fn chatbot() -> Chatbot {
        Chatbot::train(IntentCatalog::from_json_str(DEFINITIONS).unwrap()).unwrap()
    }

    #[test]
    fn test_greeting_scenario() {
        let bot = chatbot();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let answer = bot.respond("hi", &mut rng);
            assert!(answer == "Hello!" || answer == "Hi there!" || answer == "Greetings, friend.");
        }
    }

    #[test]
    fn test_single_response_pool_is_deterministic() {
        let bot = chatbot();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..10 {
            assert_eq!(bot.respond("goodbye", &mut rng), "Goodbye!");
        }
    }

    #[test]
    fn test_patterns_answered_from_own_intent() {
        let bot = chatbot();
        let mut rng = StdRng::seed_from_u64(1);

        for intent in bot.catalog().iter() {
            for pattern in &intent.patterns {
                let answer = bot.respond(pattern, &mut rng);
                assert!(
                    intent.responses.iter().any(|r| r == answer),
                    "pattern {:?} answered with {:?}",
                    pattern,
                    answer
                );
            }
        }
    }

    #[test]
    fn test_every_response_reachable() {
        let bot = chatbot();
        let mut rng = StdRng::seed_from_u64(2024);
        let pool = &bot.catalog().get("greeting").unwrap().responses;

        let seen: HashSet<&str> = (0..200).map(|_| bot.respond("hello", &mut rng)).collect();

        assert_eq!(seen.len(), pool.len());
        assert!(pool.iter().all(|r| seen.contains(r.as_str())));
    }

    #[test]
    fn test_same_seed_same_answers() {
        let bot = chatbot();
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);

        for input in ["hi", "thanks", "hey there", "good morning"] {
            assert_eq!(bot.respond(input, &mut a), bot.respond(input, &mut b));
        }
    }

    #[test]
    fn test_unknown_tag_falls_back() {
        let trained_on = IntentCatalog::from_json_str(
            r#"[
                {"tag": "weather", "patterns": ["is it raining", "weather today"], "responses": ["No idea."]},
                {"tag": "time", "patterns": ["what time is it", "current time"], "responses": ["Late."]}
            ]"#,
        )
        .unwrap();
        let classifier = IntentClassifier::fit(&trained_on).unwrap();
        let bot = Chatbot::from_parts(IntentCatalog::from_json_str(DEFINITIONS).unwrap(), classifier);

        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(bot.respond("is it raining", &mut rng), FALLBACK_RESPONSE);

        let reply = bot.chat("is it raining", &mut rng, None);
        assert_eq!(reply.answer, FALLBACK_RESPONSE);
        assert!(reply.tag.is_none());
    }

    #[test]
    fn test_chat_logs_turn() {
        let bot = chatbot();
        let dir = tempfile::tempdir().unwrap();
        let log = ChatLog::new(dir.path().join("chat_log.csv"));
        let mut rng = StdRng::seed_from_u64(5);

        let reply = bot.chat("goodbye", &mut rng, Some(&log));
        assert_eq!(reply.answer, "Goodbye!");
        assert_eq!(reply.tag.as_deref(), Some("farewell"));
        assert!(reply.log_warning.is_none());

        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_input, "goodbye");
        assert_eq!(entries[0].bot_response, "Goodbye!");
    }

    #[test]
    fn test_log_failure_still_answers() {
        let bot = chatbot();
        let log = ChatLog::new("/definitely/not/here/chat_log.csv");
        let mut rng = StdRng::seed_from_u64(5);

        let reply = bot.chat("thank you", &mut rng, Some(&log));
        assert!(reply.answer == "You're welcome!" || reply.answer == "Happy to help.");
        assert!(reply.log_warning.is_some());
    }

    #[test]
    fn test_bundled_catalog_recovers_patterns() {
        let catalog = IntentCatalog::from_json_str(include_str!("../intents.json")).unwrap();
        let bot = Chatbot::train(catalog).unwrap();

        for example in bot.catalog().training_set() {
            assert_eq!(bot.predict(example.pattern), example.tag, "pattern: {}", example.pattern);
        }
    }

    #[test]
    fn test_is_farewell() {
        assert!(is_farewell("Goodbye!"));
        assert!(is_farewell("  bye. "));
        assert!(!is_farewell("Goodbye and good luck!"));
        assert!(!is_farewell("Hello!"));
    }
}
