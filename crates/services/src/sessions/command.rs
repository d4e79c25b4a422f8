use quiz_core::model::QuizId;

use crate::error::SessionError;

/// One line of user input, split into a command keyword and its argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    List,
    Show(Option<String>),
    Add,
    Delete(Option<String>),
    Edit(Option<String>),
    Test(Option<String>),
    Play,
    Credits,
    Quit,
    /// A blank line.
    Empty,
    Unknown(String),
}

impl Command {
    /// Keywords accepted at the command prompt, aliases included.
    pub const KEYWORDS: &'static [&'static str] = &[
        "h", "help", "list", "show", "add", "delete", "edit", "test", "p", "play", "credits", "q",
        "quit",
    ];

    /// Parse a command line. The keyword is case-insensitive; only the first
    /// argument is kept.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return Self::Empty;
        };
        let arg = words.next().map(str::to_owned);

        match keyword.to_lowercase().as_str() {
            "h" | "help" => Self::Help,
            "list" => Self::List,
            "show" => Self::Show(arg),
            "add" => Self::Add,
            "delete" => Self::Delete(arg),
            "edit" => Self::Edit(arg),
            "test" => Self::Test(arg),
            "p" | "play" => Self::Play,
            "credits" => Self::Credits,
            "q" | "quit" => Self::Quit,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

/// Id validation shared by `show`, `test`, `edit` and `delete`.
///
/// # Errors
///
/// Returns `SessionError::MissingParameter` when no argument was given and
/// `SessionError::NotANumber` unless the whole argument is an integer.
pub fn parse_id_arg(arg: Option<&str>) -> Result<QuizId, SessionError> {
    let raw = arg.ok_or(SessionError::MissingParameter)?;
    raw.parse::<QuizId>()
        .map_err(|_| SessionError::NotANumber { raw: raw.to_owned() })
}
