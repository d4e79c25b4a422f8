use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use quiz_core::model::{Quiz, QuizDraft, QuizId};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::command::{Command, parse_id_arg};
use super::round::PlayRound;
use super::view::{Prompt, RoundOutcome, SessionEvent, SessionReply};
use crate::error::{QuizServiceError, SessionError};
use crate::quiz_service::QuizService;

/// Where a finished two-step draft goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DraftTarget {
    New,
    Existing(QuizId),
}

#[derive(Debug)]
enum State {
    Idle,
    AwaitingQuestionText {
        target: DraftTarget,
    },
    AwaitingAnswerText {
        target: DraftTarget,
        question: String,
    },
    Testing {
        quiz: Quiz,
    },
    PlayingRound {
        round: PlayRound,
        current: Quiz,
    },
}

/// Observable phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingQuestionText,
    AwaitingAnswerText,
    Testing,
    PlayingRound,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Per-client command session.
///
/// Each input line advances an explicit state machine, so multi-step commands
/// (`add`, `edit`, `test`, `play`) resume on the next line instead of blocking.
/// Dropping a session mid-command discards its pending state; nothing reaches
/// the store until a command completes.
pub struct Session {
    quizzes: Arc<QuizService>,
    rng: StdRng,
    state: State,
    score: u32,
    closed: bool,
}

impl Session {
    #[must_use]
    pub fn new(quizzes: Arc<QuizService>) -> Self {
        Self::with_rng(quizzes, StdRng::from_os_rng())
    }

    /// Session with a deterministic question order.
    #[must_use]
    pub fn with_seed(quizzes: Arc<QuizService>, seed: u64) -> Self {
        Self::with_rng(quizzes, StdRng::seed_from_u64(seed))
    }

    fn with_rng(quizzes: Arc<QuizService>, rng: StdRng) -> Self {
        Self {
            quizzes,
            rng,
            state: State::Idle,
            score: 0,
            closed: false,
        }
    }

    /// Output for a newly connected client.
    #[must_use]
    pub fn greeting(&self) -> SessionReply {
        SessionReply {
            events: vec![SessionEvent::Welcome],
            prompt: self.prompt(),
            close: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        match self.state {
            State::Idle => SessionState::Idle,
            State::AwaitingQuestionText { .. } => SessionState::AwaitingQuestionText,
            State::AwaitingAnswerText { .. } => SessionState::AwaitingAnswerText,
            State::Testing { .. } => SessionState::Testing,
            State::PlayingRound { .. } => SessionState::PlayingRound,
        }
    }

    /// Score of the running round, or of the last finished one.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Ids still to be asked in the running round; empty outside a round.
    #[must_use]
    pub fn pending(&self) -> usize {
        match &self.state {
            State::PlayingRound { round, .. } => round.remaining(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn prompt(&self) -> Prompt {
        match &self.state {
            State::Idle => Prompt::Command,
            State::AwaitingQuestionText { .. } => Prompt::QuestionText,
            State::AwaitingAnswerText { .. } => Prompt::AnswerText,
            State::Testing { quiz } | State::PlayingRound { current: quiz, .. } => {
                Prompt::Quiz(quiz.question().clone())
            }
        }
    }

    /// Feed one line of input to the session.
    ///
    /// Command errors never escape: they are reported as
    /// `SessionEvent::Failed` and the session returns to `Idle`.
    pub async fn handle_line(&mut self, line: &str) -> SessionReply {
        let mut events = Vec::new();
        let state = std::mem::replace(&mut self.state, State::Idle);

        let outcome = match state {
            State::Idle => self.run_command(Command::parse(line), &mut events).await,
            State::AwaitingQuestionText { target } => {
                self.state = State::AwaitingAnswerText {
                    target,
                    question: line.to_owned(),
                };
                Ok(())
            }
            State::AwaitingAnswerText { target, question } => {
                self.finish_draft(target, QuizDraft::new(question, line), &mut events)
                    .await
            }
            State::Testing { quiz } => {
                events.push(SessionEvent::Verdict {
                    correct: quiz.is_correct(line),
                });
                Ok(())
            }
            State::PlayingRound { round, current } => {
                self.answer_round(round, &current, line, &mut events).await
            }
        };

        if let Err(err) = outcome {
            debug!("command failed: {err}");
            self.state = State::Idle;
            events.push(SessionEvent::Failed(err));
        }

        SessionReply {
            events,
            prompt: self.prompt(),
            close: self.closed,
        }
    }

    async fn run_command(
        &mut self,
        command: Command,
        events: &mut Vec<SessionEvent>,
    ) -> Result<(), SessionError> {
        match command {
            Command::Empty => {}
            Command::Help => events.push(SessionEvent::Help),
            Command::Credits => events.push(SessionEvent::Credits),
            Command::Quit => {
                self.closed = true;
                events.push(SessionEvent::Goodbye);
            }
            Command::Unknown(keyword) => events.push(SessionEvent::UnknownCommand(keyword)),
            Command::List => events.push(SessionEvent::Listed(self.quizzes.list().await?)),
            Command::Show(arg) => {
                let id = parse_id_arg(arg.as_deref())?;
                events.push(SessionEvent::Shown(self.quizzes.get(id).await?));
            }
            Command::Delete(arg) => {
                let id = parse_id_arg(arg.as_deref())?;
                self.quizzes.delete(id).await?;
                events.push(SessionEvent::Deleted(id));
            }
            Command::Add => {
                self.state = State::AwaitingQuestionText {
                    target: DraftTarget::New,
                };
            }
            Command::Edit(arg) => {
                let id = parse_id_arg(arg.as_deref())?;
                let quiz = self.quizzes.get(id).await?;
                events.push(SessionEvent::Editing(quiz));
                self.state = State::AwaitingQuestionText {
                    target: DraftTarget::Existing(id),
                };
            }
            Command::Test(arg) => {
                let id = parse_id_arg(arg.as_deref())?;
                let quiz = self.quizzes.get(id).await?;
                self.state = State::Testing { quiz };
            }
            Command::Play => self.start_round(events).await?,
        }
        Ok(())
    }

    async fn finish_draft(
        &mut self,
        target: DraftTarget,
        draft: QuizDraft,
        events: &mut Vec<SessionEvent>,
    ) -> Result<(), SessionError> {
        match target {
            DraftTarget::New => {
                let quiz = self.quizzes.create(draft).await?;
                events.push(SessionEvent::Added(quiz));
            }
            DraftTarget::Existing(id) => {
                let quiz = self.quizzes.update(id, draft).await?;
                events.push(SessionEvent::Updated(quiz));
            }
        }
        Ok(())
    }

    async fn start_round(&mut self, events: &mut Vec<SessionEvent>) -> Result<(), SessionError> {
        let ids = self.quizzes.list().await?.iter().map(Quiz::id).collect::<Vec<_>>();
        debug!("starting round over {} quizzes", ids.len());
        self.score = 0;
        self.next_question(PlayRound::new(ids), events).await
    }

    /// Ask the next pending quiz, or end the round as won when none are left.
    async fn next_question(
        &mut self,
        mut round: PlayRound,
        events: &mut Vec<SessionEvent>,
    ) -> Result<(), SessionError> {
        while let Some(id) = round.draw(&mut self.rng) {
            match self.quizzes.get(id).await {
                Ok(current) => {
                    self.state = State::PlayingRound { round, current };
                    return Ok(());
                }
                // Deleted by another session after the round started.
                Err(QuizServiceError::NotFound(_)) => {
                    warn!("quiz {id} disappeared during a round, skipping it");
                }
                Err(err) => return Err(err.into()),
            }
        }

        self.score = round.score();
        events.push(SessionEvent::RoundOver {
            score: self.score,
            outcome: RoundOutcome::Won,
        });
        Ok(())
    }

    async fn answer_round(
        &mut self,
        mut round: PlayRound,
        current: &Quiz,
        line: &str,
        events: &mut Vec<SessionEvent>,
    ) -> Result<(), SessionError> {
        if !current.is_correct(line) {
            self.score = round.score();
            events.push(SessionEvent::RoundOver {
                score: self.score,
                outcome: RoundOutcome::Lost,
            });
            return Ok(());
        }

        round.record_correct();
        self.score = round.score();
        events.push(SessionEvent::PlayCorrect { score: self.score });
        self.next_question(round, events).await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("score", &self.score)
            .field("pending", &self.pending())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    async fn service_with(quizzes: &[(&str, &str)]) -> Arc<QuizService> {
        let svc = QuizService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        for (question, answer) in quizzes {
            svc.create(QuizDraft::new(*question, *answer)).await.unwrap();
        }
        Arc::new(svc)
    }

    fn failed_kind(reply: &SessionReply) -> Option<crate::ErrorKind> {
        reply.events.iter().find_map(|e| match e {
            SessionEvent::Failed(err) => Some(err.kind()),
            _ => None,
        })
    }

    #[tokio::test]
    async fn greeting_welcomes_at_the_command_prompt() {
        let session = Session::with_seed(service_with(&[]).await, 1);
        let reply = session.greeting();
        assert!(matches!(reply.events.as_slice(), [SessionEvent::Welcome]));
        assert_eq!(reply.prompt, Prompt::Command);
        assert!(!reply.close);
    }

    #[tokio::test]
    async fn blank_line_just_prompts_again() {
        let mut session = Session::with_seed(service_with(&[]).await, 1);
        let reply = session.handle_line("").await;
        assert!(reply.events.is_empty());
        assert_eq!(reply.prompt, Prompt::Command);
    }

    #[tokio::test]
    async fn show_requires_numeric_id() {
        let mut session = Session::with_seed(service_with(&[("Q", "A")]).await, 1);

        let reply = session.handle_line("show").await;
        assert_eq!(failed_kind(&reply), Some(crate::ErrorKind::MissingParameter));

        let reply = session.handle_line("show one").await;
        assert_eq!(failed_kind(&reply), Some(crate::ErrorKind::NotANumber));

        let reply = session.handle_line("show 9").await;
        assert_eq!(failed_kind(&reply), Some(crate::ErrorKind::NotFound));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_reports_verdict_without_touching_score() {
        let mut session = Session::with_seed(service_with(&[("Capital of Italy", "Rome")]).await, 1);

        let reply = session.handle_line("test 1").await;
        assert_eq!(
            reply.prompt,
            Prompt::Quiz(quiz_core::model::QuizText::parse("Capital of Italy").unwrap())
        );
        assert_eq!(session.state(), SessionState::Testing);

        let reply = session.handle_line("  rOME ").await;
        assert!(matches!(
            reply.events.as_slice(),
            [SessionEvent::Verdict { correct: true }]
        ));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.score(), 0);

        session.handle_line("test 1").await;
        let reply = session.handle_line("Milan").await;
        assert!(matches!(
            reply.events.as_slice(),
            [SessionEvent::Verdict { correct: false }]
        ));
    }

    #[tokio::test]
    async fn add_walks_through_both_prompts() {
        let svc = service_with(&[]).await;
        let mut session = Session::with_seed(Arc::clone(&svc), 1);

        assert_eq!(session.handle_line("add").await.prompt, Prompt::QuestionText);
        assert_eq!(session.state(), SessionState::AwaitingQuestionText);
        assert_eq!(
            session.handle_line(" Capital of Spain ").await.prompt,
            Prompt::AnswerText
        );
        let reply = session.handle_line("Madrid").await;

        assert!(matches!(reply.events.as_slice(), [SessionEvent::Added(_)]));
        assert_eq!(session.state(), SessionState::Idle);
        let stored = svc.list().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].question().as_str(), "Capital of Spain");
    }

    #[tokio::test]
    async fn add_with_blank_answer_stores_nothing() {
        let svc = service_with(&[]).await;
        let mut session = Session::with_seed(Arc::clone(&svc), 1);

        session.handle_line("add").await;
        session.handle_line("Question").await;
        let reply = session.handle_line("   ").await;

        assert_eq!(failed_kind(&reply), Some(crate::ErrorKind::ValidationError));
        assert_eq!(reply.prompt, Prompt::Command);
        assert_eq!(svc.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn edit_checks_id_before_prompting() {
        let svc = service_with(&[("Q", "A")]).await;
        let mut session = Session::with_seed(Arc::clone(&svc), 1);

        let reply = session.handle_line("edit 5").await;
        assert_eq!(failed_kind(&reply), Some(crate::ErrorKind::NotFound));
        assert_eq!(reply.prompt, Prompt::Command);

        let reply = session.handle_line("edit 1").await;
        assert!(matches!(reply.events.as_slice(), [SessionEvent::Editing(_)]));
        session.handle_line("New question").await;
        let reply = session.handle_line("New answer").await;
        assert!(matches!(reply.events.as_slice(), [SessionEvent::Updated(_)]));

        let quiz = svc.get(QuizId::new(1)).await.unwrap();
        assert_eq!(quiz.question().as_str(), "New question");
    }

    #[tokio::test]
    async fn empty_store_round_is_won_with_zero() {
        let mut session = Session::with_seed(service_with(&[]).await, 1);
        let reply = session.handle_line("play").await;

        assert!(matches!(
            reply.events.as_slice(),
            [SessionEvent::RoundOver {
                score: 0,
                outcome: RoundOutcome::Won
            }]
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn wrong_answer_ends_round_with_current_score() {
        let svc = service_with(&[("Q1", "A1"), ("Q2", "A2"), ("Q3", "A3")]).await;
        let mut session = Session::with_seed(svc, 3);

        let reply = session.handle_line("p").await;
        let Prompt::Quiz(question) = reply.prompt else {
            panic!("expected a question");
        };
        let answer = question.as_str().replace('Q', "A");
        session.handle_line(&answer).await;
        assert_eq!(session.score(), 1);
        assert_eq!(session.pending(), 1);

        let reply = session.handle_line("definitely wrong").await;
        assert!(matches!(
            reply.events.as_slice(),
            [SessionEvent::RoundOver {
                score: 1,
                outcome: RoundOutcome::Lost
            }]
        ));
        assert_eq!(reply.prompt, Prompt::Command);
        assert_eq!(session.pending(), 0);
    }

    #[tokio::test]
    async fn quiz_deleted_mid_round_is_skipped() {
        let svc = service_with(&[("Q1", "A1"), ("Q2", "A2")]).await;
        let mut session = Session::with_seed(Arc::clone(&svc), 11);

        let reply = session.handle_line("play").await;
        let Prompt::Quiz(first) = reply.prompt else {
            panic!("expected a question");
        };
        let other = if first.as_str() == "Q1" { 2 } else { 1 };
        svc.delete(QuizId::new(other)).await.unwrap();

        let reply = session.handle_line(&first.as_str().replace('Q', "A")).await;
        assert!(matches!(
            reply.events.as_slice(),
            [
                SessionEvent::PlayCorrect { score: 1 },
                SessionEvent::RoundOver {
                    score: 1,
                    outcome: RoundOutcome::Won
                }
            ]
        ));
    }

    #[tokio::test]
    async fn quit_closes_the_session() {
        let mut session = Session::with_seed(service_with(&[]).await, 1);
        let reply = session.handle_line("quit").await;
        assert!(reply.close);
        assert!(session.is_closed());
        assert!(matches!(reply.events.as_slice(), [SessionEvent::Goodbye]));
    }

    #[tokio::test]
    async fn unknown_command_is_reported() {
        let mut session = Session::with_seed(service_with(&[]).await, 1);
        let reply = session.handle_line("fly away").await;
        assert!(matches!(
            reply.events.as_slice(),
            [SessionEvent::UnknownCommand(k)] if k == "fly"
        ));
        assert!(!reply.close);
    }
}
