use quiz_core::model::{Quiz, QuizId, QuizText};

use crate::error::SessionError;

/// How a `play` round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Every pending quiz was answered correctly.
    Won,
    /// The round stopped at a wrong answer.
    Lost,
}

/// Something a session reports back to its own client.
#[derive(Debug)]
pub enum SessionEvent {
    /// Sent once when the session starts.
    Welcome,
    Help,
    Credits,
    Listed(Vec<Quiz>),
    Shown(Quiz),
    /// `edit` accepted the id; the current texts are shown before prompting.
    Editing(Quiz),
    Added(Quiz),
    Updated(Quiz),
    Deleted(QuizId),
    /// Result of a single `test`.
    Verdict { correct: bool },
    /// Correct answer inside a round, with the score so far.
    PlayCorrect { score: u32 },
    RoundOver { score: u32, outcome: RoundOutcome },
    UnknownCommand(String),
    Goodbye,
    Failed(SessionError),
}

/// What the client should be asked next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Command,
    QuestionText,
    AnswerText,
    /// Ask a stored quiz's question.
    Quiz(QuizText),
}

/// Everything produced by one input line.
#[derive(Debug)]
pub struct SessionReply {
    pub events: Vec<SessionEvent>,
    pub prompt: Prompt,
    /// The client asked to quit; the host should close this session.
    pub close: bool,
}
