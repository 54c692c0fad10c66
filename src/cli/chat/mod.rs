pub mod auth;
pub mod conversation;
pub mod prompt;
pub mod session;

use std::env;
use std::fs;
use std::io::Write;
use std::process::ExitCode;

use color_print::cformat;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use eyre::{bail, Result};
use rustyline::error::ReadlineError;
use tracing::info;

use crate::cli::chat::auth::{AuthResult, PASSWORD_HINT};
use crate::cli::chat::conversation::{export_filename, ConversationManager, Role};
use crate::cli::chat::session::SessionState;
use crate::gemini_client::GeminiClient;

const WELCOME_TEXT: &str = "
Mental Health Support Chatbot

I'm here to listen and provide support.
Remember: I'm not a replacement for professional therapy.

/apikey {key}      Configure your Gemini API key
/login {password}  Unlock the chat
/help              Show the help dialogue
/quit              Quit the application
";

const HELP_TEXT: &str = "
Mental Health Support Chat CLI

/apikey {key}      Configure your Gemini API key
/login {password}  Log in with the access password
/logout            Log out
/clear             Clear the conversation history
/refresh           Redraw the transcript
/stats             Show message counts
/export            Save the transcript to a text file
/crisis            Show crisis resources
/hint              Show the password hint
/tips              Show mental health tips
/help              Show this help dialogue
/quit              Quit the application
";

const CRISIS_TEXT: &str = "
Crisis Resources

Emergency Help:
- Emergency: 911
- Suicide Prevention: 988
- Crisis Text: 741741
- SAMHSA: 1-800-662-4357

If you're experiencing a crisis, please contact emergency services immediately.
";

const TIPS_TEXT: &str = "
Mental Health Tips

Getting Support:
- Be open and honest about your feelings
- Take your time to express yourself
- Remember that seeking help shows strength
- Consider professional therapy for ongoing support

Self-Care:
- Practice mindfulness and breathing exercises
- Prioritize good sleep habits
- Stay physically active
- Connect with supportive people
";

const GREETING_TEXT: &str = "Hello! I'm here to provide emotional support and listen to you. \
How are you feeling today? This is a safe space to share your thoughts and feelings.";

pub struct ChatContext {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    session: SessionState,
    manager: Option<ConversationManager>,
    initial_api_key: Option<String>,
}

impl ChatContext {
    pub fn new(
        output: Box<dyn Write>,
        input: Option<String>,
        interactive: bool,
        api_key: Option<String>,
    ) -> Self {
        Self {
            output,
            input,
            interactive,
            session: SessionState::new(),
            manager: None,
            initial_api_key: api_key,
        }
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        // Initialize the Gemini-backed conversation manager
        let client = match GeminiClient::new() {
            Ok(client) => client,
            Err(e) => {
                writeln!(self.output, "Failed to initialize Gemini client: {}", e)?;
                return Ok(ExitCode::FAILURE);
            }
        };
        self.manager = Some(ConversationManager::new(Box::new(client)));

        // Seed the session key from the flag or the environment; either way
        // it can still be replaced with /apikey at runtime.
        if let Some(key) = self.initial_api_key.take() {
            self.session.api_key = key;
        } else if let Ok(key) = env::var("GEMINI_API_KEY") {
            self.session.api_key = key;
        }

        if self.interactive {
            self.print_welcome()?;
        }

        // Handle non-interactive mode (single message)
        if let Some(input) = self.input.take() {
            self.handle_input(&input).await?;
            return Ok(ExitCode::SUCCESS);
        }

        if self.interactive {
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    fn print_welcome(&mut self) -> Result<()> {
        writeln!(self.output, "{}", WELCOME_TEXT)?;
        writeln!(self.output, "{}", CRISIS_TEXT)?;

        if self.session.api_key.is_empty() {
            writeln!(
                self.output,
                "{}",
                cformat!("<yellow>Please configure your Gemini API key with /apikey.</yellow>")
            )?;
        } else {
            writeln!(
                self.output,
                "{}",
                cformat!("<green>API key configured.</green>")
            )?;
        }
        writeln!(
            self.output,
            "Password required for access. Log in with /login."
        )?;

        Ok(())
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;

        loop {
            let prompt_text = prompt::generate_prompt();
            let readline = rl.readline(&prompt_text);

            match readline {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    rl.add_history_entry(line.as_str());

                    if line.trim() == "/quit" {
                        break;
                    }

                    if let Err(e) = self.handle_input(&line).await {
                        writeln!(self.output, "Error: {}", e)?;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    writeln!(self.output, "Error: {}", e)?;
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_input(&mut self, input: &str) -> Result<()> {
        let trimmed = input.trim();
        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or("");
        let arg = parts.next().map(str::trim).unwrap_or("");

        match command {
            "/help" => {
                writeln!(self.output, "{}", HELP_TEXT)?;
            }
            "/crisis" => {
                writeln!(self.output, "{}", CRISIS_TEXT)?;
            }
            "/tips" => {
                writeln!(self.output, "{}", TIPS_TEXT)?;
            }
            "/hint" => {
                writeln!(self.output, "Password hint: {}", PASSWORD_HINT)?;
            }
            "/apikey" => {
                if arg.is_empty() {
                    writeln!(self.output, "Usage: /apikey {{key}}")?;
                } else {
                    self.session.api_key = arg.to_string();
                    writeln!(
                        self.output,
                        "{}",
                        cformat!("<green>API key configured!</green>")
                    )?;
                }
            }
            "/login" => {
                if arg.is_empty() {
                    writeln!(self.output, "Usage: /login {{password}}")?;
                } else {
                    match auth::attempt_login(&mut self.session, arg) {
                        AuthResult::Granted => {
                            writeln!(
                                self.output,
                                "{}",
                                cformat!("<green>Access granted! Welcome, you are logged in.</green>")
                            )?;
                        }
                        AuthResult::Denied => {
                            writeln!(
                                self.output,
                                "{}",
                                cformat!("<red>Incorrect password.</red>")
                            )?;
                        }
                    }
                }
            }
            "/logout" => {
                auth::logout(&mut self.session);
                writeln!(self.output, "Logged out.")?;
            }
            "/clear" => {
                let Some(manager) = self.manager.as_ref() else {
                    bail!("Conversation manager not initialized");
                };
                manager.clear_history(&mut self.session);
                writeln!(self.output, "Chat cleared!")?;
            }
            "/stats" => {
                let Some(manager) = self.manager.as_ref() else {
                    bail!("Conversation manager not initialized");
                };
                let stats = manager.stats(&self.session);
                writeln!(
                    self.output,
                    "Messages: {} | You: {} | Bot: {}",
                    stats.total, stats.user_count, stats.bot_count
                )?;
            }
            "/export" => {
                self.export_chat()?;
            }
            "/refresh" => {
                self.render_transcript(true)?;
            }
            _ if command.starts_with('/') => {
                writeln!(
                    self.output,
                    "Unknown command: {}. Type /help for the command list.",
                    command
                )?;
            }
            _ => {
                self.process_chat_input(trimmed).await?;
            }
        }

        Ok(())
    }

    async fn process_chat_input(&mut self, input: &str) -> Result<()> {
        // Both gates must be open before anything reaches the model.
        if self.session.api_key.is_empty() {
            writeln!(
                self.output,
                "{}",
                cformat!("<yellow>Please configure your API key to continue (/apikey).</yellow>")
            )?;
            return Ok(());
        }
        if !self.session.is_authenticated {
            writeln!(
                self.output,
                "{}",
                cformat!("<yellow>Authentication required. Please log in with /login.</yellow>")
            )?;
            return Ok(());
        }

        writeln!(self.output, "Thinking about your message...")?;

        let Some(manager) = self.manager.as_ref() else {
            bail!("Conversation manager not initialized");
        };
        manager.send_message(&mut self.session, input).await;

        self.render_latest_exchange()?;

        Ok(())
    }

    /// Print the newest user/assistant pair after a send.
    fn render_latest_exchange(&mut self) -> Result<()> {
        let len = self.session.conversation_history.len();
        let start = len.saturating_sub(2);
        for msg in &self.session.conversation_history[start..] {
            let line = match msg.role {
                Role::User => cformat!("<cyan>You:</cyan> {}", msg.content),
                Role::Assistant => cformat!("<magenta>Support Bot:</magenta> {}", msg.content),
            };
            writeln!(self.output, "{}", line)?;
        }
        Ok(())
    }

    /// Redraw the whole transcript from session state, optionally clearing
    /// the screen first. An empty transcript shows the standing greeting.
    fn render_transcript(&mut self, clear_screen: bool) -> Result<()> {
        if clear_screen {
            execute!(self.output, Clear(ClearType::All), MoveTo(0, 0))?;
        }

        if self.session.conversation_history.is_empty() {
            writeln!(
                self.output,
                "{}",
                cformat!("<magenta>Support Bot:</magenta> {}", GREETING_TEXT)
            )?;
            return Ok(());
        }

        for msg in &self.session.conversation_history {
            let line = match msg.role {
                Role::User => cformat!("<cyan>You:</cyan> {}", msg.content),
                Role::Assistant => cformat!("<magenta>Support Bot:</magenta> {}", msg.content),
            };
            writeln!(self.output, "{}", line)?;
        }

        Ok(())
    }

    fn export_chat(&mut self) -> Result<()> {
        if self.session.conversation_history.is_empty() {
            writeln!(self.output, "Nothing to export yet.")?;
            return Ok(());
        }

        let Some(manager) = self.manager.as_ref() else {
            bail!("Conversation manager not initialized");
        };
        let transcript = manager.export_transcript(&self.session);
        let filename = export_filename();
        fs::write(&filename, transcript)?;

        info!("Transcript exported to {}", filename);
        writeln!(self.output, "Chat saved to {}", filename)?;

        Ok(())
    }
}
