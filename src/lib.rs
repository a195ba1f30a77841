//! Intent Chatbot
//!
//! A small rule-based conversational agent that:
//! - Loads a fixed catalog of intents (tag, patterns, responses)
//! - Fits a TF-IDF n-gram vectorizer and a linear classifier once at startup
//! - Answers each utterance with a random canned response of the predicted intent
//! - Appends every turn to a CSV conversation log
//!
//! PIPELINE:
//! LOAD CATALOG → FIT → (VECTORIZE → CLASSIFY → PICK RESPONSE → LOG) per turn

pub mod api;
pub mod chat_log;
pub mod classifier;
pub mod config;
pub mod conversational;
pub mod error;
pub mod intents;
pub mod models;
pub mod session;
pub mod vectorizer;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use classifier::{ClassifierConfig, IntentClassifier};
pub use conversational::{Chatbot, FALLBACK_RESPONSE};
pub use intents::IntentCatalog;
