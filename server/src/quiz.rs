//! Per-session quiz state machine and scoring
//!
//! Drives one session through its room's ordered question sequence:
//! `Idle -> AwaitingAnswer(1) -> ... -> AwaitingAnswer(N) -> Completed`, with
//! `Disconnected` reachable from anywhere. The machine itself is pure state
//! plus scoring; the connection handler in the `network` module feeds it
//! answer lines and delivers its messages, and is the only place the
//! `Disconnected` transition can originate (a failed read).
//!
//! Scores are exact non-negative integers: 10 points per correct answer,
//! nothing else.

use crate::question_bank::{Question, QuestionBank};
use std::time::{Duration, Instant};

/// Points awarded per correctly answered question.
pub const POINTS_PER_CORRECT: u32 = 10;

/// Lifecycle state of one connected session's handler.
///
/// `Idle` is a registered session waiting at the command prompt; an attempt
/// in flight means the command loop is occupied by the quiz flow until the
/// attempt completes or the connection drops.
#[derive(Debug)]
pub enum SessionState {
    /// At the command prompt, attached to no room
    Idle,
    /// Mid-attempt, awaiting the answer to the attempt's current question
    InQuiz(QuizAttempt),
}

/// One pass of a session through a room's question sequence.
///
/// Created on `/join` with a fresh zero score and start timestamp; earlier
/// attempts never influence a new one (only the leaderboard remembers them).
#[derive(Debug)]
pub struct QuizAttempt {
    room: String,
    index: usize,
    score: u32,
    started: Instant,
}

/// Outcome of checking one submitted answer.
#[derive(Debug, PartialEq, Eq)]
pub enum AnswerFeedback {
    Correct,
    Wrong {
        /// The correct 1-based option identifier, echoed back to the client
        expected: String,
    },
}

impl AnswerFeedback {
    /// The per-answer feedback line sent to the client.
    pub fn message(&self) -> String {
        match self {
            AnswerFeedback::Correct => format!("Correct! +{} points", POINTS_PER_CORRECT),
            AnswerFeedback::Wrong { expected } => {
                format!("Wrong! Correct answer was {}", expected)
            }
        }
    }
}

/// Final score and elapsed time of a finished or abandoned attempt.
#[derive(Debug)]
pub struct AttemptSummary {
    pub score: u32,
    pub elapsed: Duration,
}

impl QuizAttempt {
    /// Starts a new attempt for a room, resetting score to 0 and recording
    /// the start time.
    pub fn new(room: &str) -> Self {
        Self {
            room: room.to_string(),
            index: 0,
            score: 0,
            started: Instant::now(),
        }
    }

    /// Room this attempt runs in.
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Score accumulated so far in this attempt.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// 1-based number of the question currently awaiting an answer.
    pub fn question_number(&self) -> usize {
        self.index + 1
    }

    /// The question currently awaiting an answer, or `None` once the
    /// sequence is exhausted.
    pub fn current_question<'a>(&self, bank: &'a QuestionBank) -> Option<&'a Question> {
        bank.questions(&self.room)?.get(self.index)
    }

    /// True once every question in the sequence has been answered.
    pub fn is_complete(&self, bank: &QuestionBank) -> bool {
        bank.questions(&self.room)
            .map_or(true, |qs| self.index >= qs.len())
    }

    /// Checks one answer line against the current question and advances.
    ///
    /// The received text is trimmed of surrounding whitespace and compared
    /// to the stored identifier by exact equality. Returns `None` if the
    /// attempt is already complete.
    pub fn submit_answer(&mut self, raw: &str, bank: &QuestionBank) -> Option<AnswerFeedback> {
        let question = self.current_question(bank)?;
        let feedback = if raw.trim() == question.answer {
            self.score += POINTS_PER_CORRECT;
            AnswerFeedback::Correct
        } else {
            AnswerFeedback::Wrong {
                expected: question.answer.clone(),
            }
        };
        self.index += 1;
        Some(feedback)
    }

    /// Closes the attempt, whether completed or cut short, yielding the
    /// final score and elapsed time to fold into the leaderboard.
    pub fn finish(self) -> AttemptSummary {
        AttemptSummary {
            score: self.score,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Renders a question block: header line plus the four numbered options.
pub fn format_question(number: usize, question: &Question) -> String {
    let mut block = format!("Question {}: {}", number, question.text);
    for (i, option) in question.options.iter().enumerate() {
        block.push_str(&format!("\n{}. {}", i + 1, option));
    }
    block
}

/// Completion summary sent to the finishing client.
pub fn completion_message(summary: &AttemptSummary) -> String {
    format!(
        "Quiz completed! Your score: {} (Time: {:.1}s)",
        summary.score,
        summary.elapsed.as_secs_f64()
    )
}

/// Room broadcast announcing the final score of a session that left
/// mid-attempt.
pub fn partial_score_message(username: &str, summary: &AttemptSummary) -> String {
    format!(
        "Final score for {}: {} (Time: {:.1}s)",
        username,
        summary.score,
        summary.elapsed.as_secs_f64()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bank() -> QuestionBank {
        let csv = "\
room,question,option1,option2,option3,option4,answer
Algorithms,First question,a,b,c,d,1
Algorithms,Second question,a,b,c,d,3
Algorithms,Third question,a,b,c,d,2
";
        QuestionBank::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_new_attempt_starts_at_question_one_with_zero_score() {
        let bank = test_bank();
        let attempt = QuizAttempt::new("Algorithms");

        assert_eq!(attempt.score(), 0);
        assert_eq!(attempt.question_number(), 1);
        assert_eq!(
            attempt.current_question(&bank).unwrap().text,
            "First question"
        );
        assert!(!attempt.is_complete(&bank));
    }

    #[test]
    fn test_correct_answer_scores_ten() {
        let bank = test_bank();
        let mut attempt = QuizAttempt::new("Algorithms");

        let feedback = attempt.submit_answer("1", &bank).unwrap();
        assert_eq!(feedback, AnswerFeedback::Correct);
        assert_eq!(attempt.score(), 10);
        assert_eq!(attempt.question_number(), 2);
    }

    #[test]
    fn test_wrong_answer_reports_expected_identifier() {
        let bank = test_bank();
        let mut attempt = QuizAttempt::new("Algorithms");

        let feedback = attempt.submit_answer("4", &bank).unwrap();
        assert_eq!(
            feedback,
            AnswerFeedback::Wrong {
                expected: "1".to_string()
            }
        );
        assert_eq!(attempt.score(), 0);
        // Wrong answers still advance the sequence
        assert_eq!(attempt.question_number(), 2);
    }

    #[test]
    fn test_answer_comparison_trims_whitespace() {
        let bank = test_bank();
        let mut attempt = QuizAttempt::new("Algorithms");

        let feedback = attempt.submit_answer("  1 \r\n", &bank).unwrap();
        assert_eq!(feedback, AnswerFeedback::Correct);
    }

    #[test]
    fn test_score_is_ten_times_correct_count_regardless_of_order() {
        let bank = test_bank();

        // Answers "1","3","2" are correct; try hitting different subsets
        let cases: Vec<(Vec<&str>, u32)> = vec![
            (vec!["1", "3", "2"], 30),
            (vec!["1", "3", "4"], 20),
            (vec!["2", "3", "2"], 20),
            (vec!["4", "4", "4"], 0),
            (vec!["1", "1", "2"], 20),
        ];

        for (answers, expected_score) in cases {
            let mut attempt = QuizAttempt::new("Algorithms");
            for answer in &answers {
                attempt.submit_answer(answer, &bank).unwrap();
            }
            assert!(attempt.is_complete(&bank));
            assert_eq!(attempt.score(), expected_score, "answers {:?}", answers);
        }
    }

    #[test]
    fn test_attempt_completes_after_last_question() {
        let bank = test_bank();
        let mut attempt = QuizAttempt::new("Algorithms");

        attempt.submit_answer("1", &bank).unwrap();
        attempt.submit_answer("3", &bank).unwrap();
        assert!(!attempt.is_complete(&bank));
        attempt.submit_answer("2", &bank).unwrap();
        assert!(attempt.is_complete(&bank));

        // No further questions, no further feedback
        assert!(attempt.current_question(&bank).is_none());
        assert!(attempt.submit_answer("1", &bank).is_none());
    }

    #[test]
    fn test_fresh_attempt_resets_score() {
        let bank = test_bank();

        let mut first = QuizAttempt::new("Algorithms");
        first.submit_answer("1", &bank).unwrap();
        assert_eq!(first.score(), 10);

        let second = QuizAttempt::new("Algorithms");
        assert_eq!(second.score(), 0);
        assert_eq!(second.question_number(), 1);
    }

    #[test]
    fn test_finish_reports_partial_score() {
        let bank = test_bank();
        let mut attempt = QuizAttempt::new("Algorithms");

        attempt.submit_answer("1", &bank).unwrap();
        attempt.submit_answer("3", &bank).unwrap();

        let summary = attempt.finish();
        assert_eq!(summary.score, 20);
    }

    #[test]
    fn test_question_block_formatting() {
        let bank = test_bank();
        let attempt = QuizAttempt::new("Algorithms");
        let question = attempt.current_question(&bank).unwrap();

        let block = format_question(attempt.question_number(), question);
        assert_eq!(block, "Question 1: First question\n1. a\n2. b\n3. c\n4. d");
    }

    #[test]
    fn test_feedback_messages() {
        assert_eq!(AnswerFeedback::Correct.message(), "Correct! +10 points");
        assert_eq!(
            AnswerFeedback::Wrong {
                expected: "2".to_string()
            }
            .message(),
            "Wrong! Correct answer was 2"
        );
    }

    #[test]
    fn test_summary_messages_round_elapsed_to_one_decimal() {
        let summary = AttemptSummary {
            score: 20,
            elapsed: Duration::from_millis(1234),
        };
        assert_eq!(
            completion_message(&summary),
            "Quiz completed! Your score: 20 (Time: 1.2s)"
        );
        assert_eq!(
            partial_score_message("alice", &summary),
            "Final score for alice: 20 (Time: 1.2s)"
        );
    }
}
