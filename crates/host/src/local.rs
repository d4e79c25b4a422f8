use std::io;
use std::sync::Arc;

use services::{QuizService, Session};
use tokio::io::BufReader;

use crate::driver::{SessionEnd, drive};

/// Run the single terminal session on stdin/stdout.
///
/// # Errors
///
/// Returns any I/O error from the terminal.
pub async fn run_local(quizzes: Arc<QuizService>) -> io::Result<SessionEnd> {
    let session = Session::new(quizzes);
    drive(session, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}
