mod ids;
mod quiz;
mod seed;
mod text;

pub use ids::{ParseIdError, QuizId};
pub use quiz::{Quiz, QuizDraft, QuizValidationError, ValidatedQuiz};
pub use seed::default_quizzes;
pub use text::{QuizText, TextError};
