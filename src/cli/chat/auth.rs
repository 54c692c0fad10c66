use tracing::info;

use crate::cli::chat::session::SessionState;

/// Shared access password. Plain equality against a compiled-in literal;
/// this gates access to the chat, it is not real authentication. Kept behind
/// this module so a proper credential check can replace it without touching
/// callers.
const CORRECT_PASSWORD: &str = "mental_health_2024";

pub const PASSWORD_HINT: &str = "Format: mental_health_YYYY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Granted,
    Denied,
}

/// Compare a submitted password against the fixed constant. The outcome of
/// the latest attempt always wins: a failed attempt after an earlier
/// successful login drops the authenticated flag again.
pub fn attempt_login(session: &mut SessionState, submitted: &str) -> AuthResult {
    if submitted == CORRECT_PASSWORD {
        session.is_authenticated = true;
        session.access_credential = submitted.to_string();
        info!("Login attempt granted");
        AuthResult::Granted
    } else {
        session.is_authenticated = false;
        info!("Login attempt denied");
        AuthResult::Denied
    }
}

pub fn logout(session: &mut SessionState) {
    session.is_authenticated = false;
    session.access_credential.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_password_is_granted() {
        let mut session = SessionState::new();

        assert_eq!(
            attempt_login(&mut session, "mental_health_2024"),
            AuthResult::Granted
        );
        assert!(session.is_authenticated);
        assert_eq!(session.access_credential, "mental_health_2024");
    }

    #[test]
    fn any_other_password_is_denied() {
        let mut session = SessionState::new();

        for wrong in ["", "mental_health_2023", "MENTAL_HEALTH_2024", "password"] {
            assert_eq!(attempt_login(&mut session, wrong), AuthResult::Denied);
            assert!(!session.is_authenticated);
        }
    }

    #[test]
    fn failed_attempt_overwrites_an_earlier_grant() {
        let mut session = SessionState::new();

        attempt_login(&mut session, "mental_health_2024");
        assert!(session.is_authenticated);

        // Last attempt wins, even after a successful login.
        attempt_login(&mut session, "wrong");
        assert!(!session.is_authenticated);
    }

    #[test]
    fn logout_clears_flag_and_credential() {
        let mut session = SessionState::new();

        attempt_login(&mut session, "mental_health_2024");
        logout(&mut session);

        assert!(!session.is_authenticated);
        assert_eq!(session.access_credential, "");
    }
}
