use crate::cli::chat::conversation::Message;

/// Per-session mutable state. One instance lives for the duration of an
/// interactive run and is dropped with it; nothing here is persisted.
#[derive(Debug, Default)]
pub struct SessionState {
    pub conversation_history: Vec<Message>,
    pub api_key: String,
    pub access_credential: String,
    pub is_authenticated: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chat input is only forwarded to the model once both gates are open.
    pub fn chat_unlocked(&self) -> bool {
        !self.api_key.is_empty() && self.is_authenticated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_with_documented_defaults() {
        let session = SessionState::new();

        assert!(session.conversation_history.is_empty());
        assert_eq!(session.api_key, "");
        assert_eq!(session.access_credential, "");
        assert!(!session.is_authenticated);
        assert!(!session.chat_unlocked());
    }

    #[test]
    fn chat_unlocks_only_with_both_key_and_auth() {
        let mut session = SessionState::new();

        session.api_key = "key".to_string();
        assert!(!session.chat_unlocked());

        session.is_authenticated = true;
        assert!(session.chat_unlocked());

        session.api_key.clear();
        assert!(!session.chat_unlocked());
    }
}
