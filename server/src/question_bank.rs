//! Loading and lookup of the pre-generated question dataset.
//!
//! The dataset is a CSV file with one row per question, columns
//! `room,question,option1,option2,option3,option4,answer`, produced by the
//! offline generator. It is parsed once at startup into an immutable mapping
//! from room name to its ordered question list; any malformed row is fatal so
//! a partial bank is never served.

use indexmap::IndexMap;
use log::info;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Error raised while loading the question dataset.
///
/// Either variant aborts startup; the server never runs with a partial bank.
#[derive(Debug, Error)]
pub enum BankError {
    #[error("failed to read question dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed question dataset: {0}")]
    Format(#[from] csv::Error),
}

/// Raw CSV row as produced by the question generator.
#[derive(Debug, Deserialize)]
struct QuestionRow {
    room: String,
    question: String,
    option1: String,
    option2: String,
    option3: String,
    option4: String,
    answer: String,
}

/// One multiple-choice question.
///
/// `answer` is the 1-based position of the correct option, stored as text so
/// answer checking is a plain string comparison against the client's line.
#[derive(Debug, Clone)]
pub struct Question {
    pub text: String,
    pub options: [String; 4],
    pub answer: String,
}

/// Immutable mapping from room name to its ordered question sequence.
///
/// Question order within a room is preserved exactly as read, and room
/// listing order follows first appearance in the dataset.
#[derive(Debug, Default)]
pub struct QuestionBank {
    rooms: IndexMap<String, Vec<Question>>,
}

impl QuestionBank {
    /// Loads the bank from a CSV file on disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BankError> {
        let file = File::open(path.as_ref())?;
        let bank = Self::from_reader(file)?;
        info!(
            "Loaded {} questions across {} rooms from {}",
            bank.question_count(),
            bank.room_count(),
            path.as_ref().display()
        );
        Ok(bank)
    }

    /// Parses the bank from any reader producing the CSV dataset.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, BankError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut rooms: IndexMap<String, Vec<Question>> = IndexMap::new();

        for row in csv_reader.deserialize() {
            let row: QuestionRow = row?;
            let question = Question {
                text: row.question,
                options: [row.option1, row.option2, row.option3, row.option4],
                answer: row.answer,
            };
            rooms.entry(row.room).or_default().push(question);
        }

        Ok(Self { rooms })
    }

    /// Returns the ordered question list for a room, if the room exists.
    pub fn questions(&self, room: &str) -> Option<&[Question]> {
        self.rooms.get(room).map(Vec::as_slice)
    }

    /// Returns true if the room name resolves in the bank.
    pub fn contains(&self, room: &str) -> bool {
        self.rooms.contains_key(room)
    }

    /// Room names in dataset order, including rooms nobody has joined.
    pub fn room_names(&self) -> impl Iterator<Item = &str> {
        self.rooms.keys().map(String::as_str)
    }

    /// Number of rooms in the bank.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Total number of questions across all rooms.
    pub fn question_count(&self) -> usize {
        self.rooms.values().map(Vec::len).sum()
    }
}
