use crate::model::QuizDraft;

/// Quizzes written to a freshly created store.
#[must_use]
pub fn default_quizzes() -> Vec<QuizDraft> {
    [
        ("Capital of Italy", "Rome"),
        ("Capital of France", "Paris"),
        ("Capital of Spain", "Madrid"),
        ("Capital of Portugal", "Lisbon"),
    ]
    .into_iter()
    .map(|(question, answer)| QuizDraft::new(question, answer))
    .collect()
}
