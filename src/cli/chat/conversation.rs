use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::chat::session::SessionState;
use crate::gemini_client::ReplyProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Support Bot",
        }
    }
}

/// One turn of the transcript. Immutable once appended; turns are only ever
/// removed by a full history clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatStats {
    pub total: usize,
    pub user_count: usize,
    pub bot_count: usize,
}

/// Owns the reply provider and drives the transcript in the session state:
/// append the user turn, ask the provider, append whatever comes back.
pub struct ConversationManager {
    provider: Box<dyn ReplyProvider + Send + Sync>,
}

impl ConversationManager {
    pub fn new(provider: Box<dyn ReplyProvider + Send + Sync>) -> Self {
        Self { provider }
    }

    /// Send one user message and record the exchange. Blank input is a
    /// no-op. The provider's result is appended as the assistant turn even
    /// when it is an error string; failures surface as conversation content,
    /// not as a separate error channel.
    pub async fn send_message(&self, session: &mut SessionState, user_text: &str) {
        if user_text.trim().is_empty() {
            return;
        }

        session
            .conversation_history
            .push(Message::user(user_text));

        debug!(
            "Requesting reply, history length {}",
            session.conversation_history.len()
        );

        let reply = self
            .provider
            .generate_reply(user_text, &session.conversation_history, &session.api_key)
            .await;

        session.conversation_history.push(Message::assistant(reply));
    }

    pub fn clear_history(&self, session: &mut SessionState) {
        session.conversation_history.clear();
    }

    /// Render the whole transcript as a plain-text document for download.
    pub fn export_transcript(&self, session: &SessionState) -> String {
        let mut export = String::from("Mental Health Support Chat Export\n");
        export.push_str(&format!(
            "Generated: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        export.push_str(&"=".repeat(50));
        export.push_str("\n\n");

        for msg in &session.conversation_history {
            export.push_str(&format!("{}: {}\n\n", msg.role.display_name(), msg.content));
        }

        export
    }

    pub fn stats(&self, session: &SessionState) -> ChatStats {
        let user_count = session
            .conversation_history
            .iter()
            .filter(|m| m.role == Role::User)
            .count();
        let bot_count = session
            .conversation_history
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count();

        ChatStats {
            total: session.conversation_history.len(),
            user_count,
            bot_count,
        }
    }
}

/// Timestamped filename for a transcript download.
pub fn export_filename() -> String {
    format!(
        "mental_health_chat_{}.txt",
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::gemini_client::{GeminiClient, MISSING_KEY_TEXT};

    /// Canned-reply provider so tests never touch the network.
    struct StubProvider {
        reply: String,
    }

    #[async_trait]
    impl ReplyProvider for StubProvider {
        async fn generate_reply(&self, _: &str, _: &[Message], _: &str) -> String {
            self.reply.clone()
        }
    }

    fn manager_with_reply(reply: &str) -> ConversationManager {
        ConversationManager::new(Box::new(StubProvider {
            reply: reply.to_string(),
        }))
    }

    #[tokio::test]
    async fn blank_input_does_not_touch_history() {
        let manager = manager_with_reply("unused");
        let mut session = SessionState::new();

        manager.send_message(&mut session, "").await;
        manager.send_message(&mut session, "   ").await;
        manager.send_message(&mut session, "\t\n").await;

        assert!(session.conversation_history.is_empty());
    }

    #[tokio::test]
    async fn send_appends_user_turn_then_assistant_turn() {
        let manager = manager_with_reply("I'm listening.");
        let mut session = SessionState::new();

        manager.send_message(&mut session, "I feel anxious").await;

        assert_eq!(
            session.conversation_history,
            vec![
                Message::user("I feel anxious"),
                Message::assistant("I'm listening."),
            ]
        );
    }

    #[tokio::test]
    async fn missing_key_reply_is_recorded_as_an_assistant_turn() {
        // The real client with no key configured: the instructional string
        // comes back without any network I/O and still lands in history.
        let manager = ConversationManager::new(Box::new(GeminiClient::new().unwrap()));
        let mut session = SessionState::new();

        manager.send_message(&mut session, "Hello").await;

        assert_eq!(session.conversation_history.len(), 2);
        assert_eq!(session.conversation_history[0], Message::user("Hello"));
        assert_eq!(
            session.conversation_history[1],
            Message::assistant(MISSING_KEY_TEXT)
        );
    }

    #[tokio::test]
    async fn connection_error_text_is_stored_like_any_reply() {
        let error_text =
            "Connection error: Please check your internet connection and API key. Error: timed out";
        let manager = manager_with_reply(error_text);
        let mut session = SessionState::new();

        manager.send_message(&mut session, "Hello").await;

        assert_eq!(session.conversation_history.len(), 2);
        let reply = &session.conversation_history[1];
        assert_eq!(reply.role, Role::Assistant);
        assert!(reply.content.contains("Connection error"));
    }

    #[tokio::test]
    async fn clear_then_stats_reports_all_zeros() {
        let manager = manager_with_reply("hi");
        let mut session = SessionState::new();

        manager.send_message(&mut session, "one").await;
        manager.send_message(&mut session, "two").await;
        manager.clear_history(&mut session);

        assert_eq!(
            manager.stats(&session),
            ChatStats {
                total: 0,
                user_count: 0,
                bot_count: 0
            }
        );
    }

    #[tokio::test]
    async fn stats_counts_turns_by_role() {
        let manager = manager_with_reply("hi");
        let mut session = SessionState::new();

        manager.send_message(&mut session, "one").await;
        manager.send_message(&mut session, "two").await;
        session.conversation_history.push(Message::user("pending"));

        assert_eq!(
            manager.stats(&session),
            ChatStats {
                total: 5,
                user_count: 3,
                bot_count: 2
            }
        );
    }

    #[test]
    fn export_renders_display_roles_in_order() {
        let manager = manager_with_reply("unused");
        let mut session = SessionState::new();
        session.conversation_history.push(Message::user("Hi"));
        session
            .conversation_history
            .push(Message::assistant("Hello!"));

        let export = manager.export_transcript(&session);

        assert!(export.starts_with("Mental Health Support Chat Export\n"));
        assert!(export.contains("Generated: "));
        assert!(export.contains(&"=".repeat(50)));

        let you = export.find("You: Hi\n").unwrap();
        let bot = export.find("Support Bot: Hello!\n").unwrap();
        assert!(you < bot);
    }

    #[test]
    fn export_filename_matches_the_download_pattern() {
        let name = export_filename();

        assert!(name.starts_with("mental_health_chat_"));
        assert!(name.ends_with(".txt"));
        // mental_health_chat_YYYYMMDD_HHMMSS.txt
        assert_eq!(name.len(), "mental_health_chat_".len() + 15 + 4);
        let stamp = &name["mental_health_chat_".len()..name.len() - 4];
        assert!(stamp
            .chars()
            .all(|c| c.is_ascii_digit() || c == '_'));
    }
}
