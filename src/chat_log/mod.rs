//! Conversation log
//!
//! Append-only CSV file with one row per chat turn. Every append opens the
//! file, writes the whole record in a single call and closes it again, so
//! separate writers never interleave rows.

use crate::error::ChatbotError;
use crate::models::ChatLogEntry;
use crate::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Header row written when the log is created
pub const LOG_HEADER: [&str; 3] = ["User Input", "Chatbot Response", "Timestamp"];

/// Handle to the CSV conversation log on disk
#[derive(Debug, Clone)]
pub struct ChatLog {
    path: PathBuf,
}

impl ChatLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the log with its header row if it is missing or empty
    pub fn ensure_exists(&self) -> Result<()> {
        let mut file = self.open_for_append()?;

        if file.metadata()?.len() == 0 {
            file.write_all(&encode_record(&LOG_HEADER)?)?;
            info!(path = %self.path.display(), "Created chat log");
        }

        Ok(())
    }

    /// Append one turn.
    ///
    /// An empty log gets the header in the same write as the first row.
    pub fn append(&self, entry: &ChatLogEntry) -> Result<()> {
        let mut file = self.open_for_append()?;

        let mut buffer = if file.metadata()?.len() == 0 {
            encode_record(&LOG_HEADER)?
        } else {
            Vec::new()
        };
        buffer.extend(encode_record(&[
            entry.user_input.as_str(),
            entry.bot_response.as_str(),
            entry.timestamp.as_str(),
        ])?);

        file.write_all(&buffer)?;

        debug!(path = %self.path.display(), "Appended chat log entry");
        Ok(())
    }

    fn open_for_append(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                ChatbotError::LogError(format!(
                    "Failed to open chat log {}: {}",
                    self.path.display(),
                    e
                ))
            })
    }

    /// All logged turns in submission order, header excluded.
    /// A missing log reads as empty. Header rows are skipped wherever they
    /// appear, so writers that raced on a fresh file lose no turns.
    pub fn read_all(&self) -> Result<Vec<ChatLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().eq(LOG_HEADER.iter().copied()) {
                continue;
            }
            let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();

            entries.push(ChatLogEntry {
                user_input: field(0),
                bot_response: field(1),
                timestamp: field(2),
            });
        }

        Ok(entries)
    }
}

/// Encode one CSV row, quoting as needed
fn encode_record(fields: &[&str]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(fields)?;

    writer
        .into_inner()
        .map_err(|e| ChatbotError::LogError(format!("Failed to encode chat log row: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log() -> (tempfile::TempDir, ChatLog) {
        let dir = tempfile::tempdir().unwrap();
        let log = ChatLog::new(dir.path().join("chat_log.csv"));
        (dir, log)
    }

    #[test]
    fn test_created_with_header() {
        let (_dir, log) = temp_log();
        log.ensure_exists().unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents, "User Input,Chatbot Response,Timestamp\n");

        // Second call leaves the file alone
        log.ensure_exists().unwrap();
        assert_eq!(std::fs::read_to_string(log.path()).unwrap(), contents);
    }

    #[test]
    fn test_round_trip_in_order() {
        let (_dir, log) = temp_log();

        let turns = vec![
            ("hi", "Hello!"),
            ("how are you, bot?", "Fine, \"thanks\""),
            ("multi\nline", "ok"),
            ("bye", "Goodbye!"),
        ];
        for (user, bot) in &turns {
            log.append(&ChatLogEntry::now(*user, *bot)).unwrap();
        }

        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), turns.len());
        for (entry, (user, bot)) in entries.iter().zip(&turns) {
            assert_eq!(entry.user_input, *user);
            assert_eq!(entry.bot_response, *bot);
            assert!(!entry.timestamp.is_empty());
        }

        let rows = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(log.path())
            .unwrap()
            .records()
            .count();
        assert_eq!(rows, turns.len() + 1);
    }

    #[test]
    fn test_empty_existing_log_gets_header() {
        let (_dir, log) = temp_log();
        std::fs::write(log.path(), "").unwrap();

        log.append(&ChatLogEntry::now("hi", "Hello!")).unwrap();
        log.append(&ChatLogEntry::now("bye", "Goodbye!")).unwrap();

        let inputs: Vec<_> = log
            .read_all()
            .unwrap()
            .into_iter()
            .map(|e| e.user_input)
            .collect();
        assert_eq!(inputs, vec!["hi", "bye"]);

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert!(contents.starts_with("User Input,Chatbot Response,Timestamp\n"));
    }

    #[test]
    fn test_repeated_header_skipped() {
        let (_dir, log) = temp_log();
        std::fs::write(
            log.path(),
            "User Input,Chatbot Response,Timestamp\n\
             hi,Hello!,2024-01-01 10:00:00.000000\n\
             User Input,Chatbot Response,Timestamp\n\
             bye,Goodbye!,2024-01-01 10:00:01.000000\n",
        )
        .unwrap();

        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].bot_response, "Goodbye!");
    }

    #[test]
    fn test_missing_log_reads_empty() {
        let (_dir, log) = temp_log();
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_unwritable_location() {
        let log = ChatLog::new("/definitely/not/here/chat_log.csv");
        let err = log.append(&ChatLogEntry::now("hi", "Hello!")).unwrap_err();
        assert!(matches!(err, ChatbotError::LogError(_)));
    }
}
