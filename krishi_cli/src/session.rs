// krishi_cli/src/session.rs

use krishi_core::{QueryRequest, UserType};

/// Per-conversation state. Owned by the input loop and consulted for every
/// query; nothing about the conversation lives in globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub language: String,
    pub user_type: Option<UserType>,
}

/// What one line typed at the prompt means.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Empty,
    Exit,
    Help,
    SetLanguage(String),
    SetUserType(Option<UserType>),
    Query(String),
    Invalid(String),
}

impl Session {
    pub fn new(language: impl Into<String>, user_type: Option<UserType>) -> Self {
        Self {
            language: language.into(),
            user_type,
        }
    }

    pub fn parse(line: &str) -> Input {
        let line = line.trim();
        if line.is_empty() {
            return Input::Empty;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            return Input::Exit;
        }
        let Some(command) = line.strip_prefix(':') else {
            return Input::Query(line.to_string());
        };

        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("help"), None) => Input::Help,
            (Some("lang"), Some(code)) => Input::SetLanguage(code.to_string()),
            (Some("user"), Some("none")) => Input::SetUserType(None),
            (Some("user"), Some(label)) => match UserType::parse(label) {
                Some(user_type) => Input::SetUserType(Some(user_type)),
                None => Input::Invalid(format!("unknown user type '{}'", label)),
            },
            _ => Input::Invalid(format!("unknown command ':{}'", command)),
        }
    }

    /// Applies a settings change. Returns `false` for inputs that are not one.
    pub fn apply(&mut self, input: &Input) -> bool {
        match input {
            Input::SetLanguage(code) => {
                self.language = code.clone();
                true
            }
            Input::SetUserType(user_type) => {
                self.user_type = *user_type;
                true
            }
            _ => false,
        }
    }

    pub fn request(&self, text: &str) -> QueryRequest {
        QueryRequest {
            raw_text: text.to_string(),
            user_type: self.user_type,
            target_language: Some(self.language.clone()),
        }
    }
}

pub const HELP: &str = "Type a question, or:
  :lang <code>           reply language (e.g. hi, mr, en)
  :user farmer|buyer|none
  :help
  exit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_query() {
        assert_eq!(
            Session::parse("  pyaz ka bhav kya hai "),
            Input::Query("pyaz ka bhav kya hai".to_string())
        );
        assert_eq!(Session::parse("   "), Input::Empty);
        assert_eq!(Session::parse("EXIT"), Input::Exit);
    }

    #[test]
    fn commands_change_the_session() {
        let mut session = Session::new("en", None);

        let input = Session::parse(":lang hi");
        assert!(session.apply(&input));
        assert_eq!(session.language, "hi");

        let input = Session::parse(":user Buyer");
        assert!(session.apply(&input));
        assert_eq!(session.user_type, Some(UserType::Buyer));

        let input = Session::parse(":user none");
        assert!(session.apply(&input));
        assert_eq!(session.user_type, None);

        assert!(!session.apply(&Session::parse("hello")));
    }

    #[test]
    fn bad_commands_are_reported() {
        assert!(matches!(Session::parse(":user trader"), Input::Invalid(_)));
        assert!(matches!(Session::parse(":lang"), Input::Invalid(_)));
        assert!(matches!(Session::parse(":volume 3"), Input::Invalid(_)));
        assert_eq!(Session::parse(":help"), Input::Help);
    }

    #[test]
    fn request_carries_session_settings() {
        let session = Session::new("mr", Some(UserType::Farmer));
        let request = session.request("kanda");
        assert_eq!(request.raw_text, "kanda");
        assert_eq!(request.target_language.as_deref(), Some("mr"));
        assert_eq!(request.user_type, Some(UserType::Farmer));
    }
}
