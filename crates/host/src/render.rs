//! Plain-text rendering of session output.

use quiz_core::model::Quiz;
use services::{ErrorKind, Prompt, RoundOutcome, SessionEvent};

const BANNER: &str = "=== CORE Quiz ===";

const AUTHORS: &[&str] = &["ALVARO"];

const HELP: &[&str] = &[
    "Commands:",
    "   h|help - Show this help.",
    "   list - List the existing quizzes.",
    "   show <id> - Show the question and answer of the given quiz.",
    "   add - Add a new quiz interactively.",
    "   delete <id> - Delete the given quiz.",
    "   edit <id> - Edit the given quiz.",
    "   test <id> - Try the given quiz.",
    "   p|play - Play: answer every quiz in random order.",
    "   credits - Credits.",
    "   q|quit - Leave.",
];

fn pair(quiz: &Quiz) -> String {
    format!(
        "[{}]: {} => {}",
        quiz.id(),
        quiz.question(),
        quiz.answer()
    )
}

/// Text shown for one event, newline-terminated.
#[must_use]
pub fn event(event: &SessionEvent) -> String {
    let mut out = match event {
        SessionEvent::Welcome => BANNER.to_owned(),
        SessionEvent::Help => HELP.join("\n"),
        SessionEvent::Credits => {
            let mut lines = vec!["Authors of the practice:".to_owned()];
            lines.extend(AUTHORS.iter().map(|author| format!("   {author}")));
            lines.join("\n")
        }
        SessionEvent::Listed(quizzes) => quizzes
            .iter()
            .map(|q| format!(" [{}]: {}", q.id(), q.question()))
            .collect::<Vec<_>>()
            .join("\n"),
        SessionEvent::Shown(quiz) => format!(" {}", pair(quiz)),
        SessionEvent::Editing(quiz) => format!(" Editing {}", pair(quiz)),
        SessionEvent::Added(quiz) => format!(" Added {}", pair(quiz)),
        SessionEvent::Updated(quiz) => format!(" Changed {}", pair(quiz)),
        SessionEvent::Deleted(id) => format!(" Deleted quiz {id}."),
        SessionEvent::Verdict { correct: true } => "Your answer is correct.\nCORRECT".to_owned(),
        SessionEvent::Verdict { correct: false } => {
            "Your answer is incorrect.\nINCORRECT".to_owned()
        }
        SessionEvent::PlayCorrect { score } => format!("CORRECT - hits: {score}"),
        SessionEvent::RoundOver {
            score,
            outcome: RoundOutcome::Won,
        } => format!("No questions left. End of game. Score: {score}"),
        SessionEvent::RoundOver {
            score,
            outcome: RoundOutcome::Lost,
        } => format!("INCORRECT\nEnd of game. Score: {score}"),
        SessionEvent::UnknownCommand(keyword) => format!(
            "Unknown command: '{keyword}'\nUse 'help' to see all available commands."
        ),
        SessionEvent::Goodbye => "Bye!".to_owned(),
        SessionEvent::Failed(err) => match err.kind() {
            ErrorKind::ValidationError => format!("The quiz is invalid: {err}"),
            ErrorKind::PersistenceError => format!("Could not save the quiz store: {err}"),
            _ => format!("Error: {err}"),
        },
    };
    out.push('\n');
    out
}

/// Prompt text; no trailing newline so the reply is typed on the same line.
#[must_use]
pub fn prompt(prompt: &Prompt) -> String {
    match prompt {
        Prompt::Command => "quiz > ".to_owned(),
        Prompt::QuestionText => " Enter the question: ".to_owned(),
        Prompt::AnswerText => " Enter the answer: ".to_owned(),
        Prompt::Quiz(question) => format!("{question}? "),
    }
}
