//! Session lifecycle state machine.
//!
//! The session token moves through `NoSession -> Starting -> Active`
//! and back. `Starting` doubles as the guard that prevents a second
//! session-start request while one is outstanding.

/// Token stamped onto requests when the host is the offline sentinel.
pub const DUMMY_TOKEN: &str = "dummy_token";

/// Externally observable session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No token held and no start request underway
    NoSession,
    /// A session-start request is outstanding
    Starting,
    /// A token is held and stamped onto dispatched requests
    Active,
}

/// Internal session state owned by the client.
#[derive(Debug, Default)]
pub(crate) enum SessionState {
    #[default]
    NoSession,
    Starting,
    Active {
        token: String,
    },
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::NoSession => SessionPhase::NoSession,
            SessionState::Starting => SessionPhase::Starting,
            SessionState::Active { .. } => SessionPhase::Active,
        }
    }

    /// Current token, if a session is active.
    pub fn token(&self) -> Option<&str> {
        match self {
            SessionState::Active { token } => Some(token),
            _ => None,
        }
    }

    /// Arm the start guard. Returns false when a session is already
    /// active or starting, in which case no start request may be sent.
    pub fn begin_start(&mut self) -> bool {
        match self {
            SessionState::NoSession => {
                *self = SessionState::Starting;
                true
            }
            _ => false,
        }
    }

    /// Store a freshly issued token. Applies from any state; a token
    /// arriving after the guard was cleared still wins.
    pub fn complete_start(&mut self, token: String) {
        *self = SessionState::Active { token };
    }

    /// Disarm the start guard. Leaves an active session untouched.
    pub fn abort_start(&mut self) {
        if matches!(self, SessionState::Starting) {
            *self = SessionState::NoSession;
        }
    }

    /// Forget the session entirely.
    pub fn clear(&mut self) {
        *self = SessionState::NoSession;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_start_arms_only_from_no_session() {
        let mut state = SessionState::default();
        assert!(state.begin_start());
        assert_eq!(state.phase(), SessionPhase::Starting);
        assert!(!state.begin_start());

        state.complete_start("tok-1".to_string());
        assert!(!state.begin_start());
        assert_eq!(state.token(), Some("tok-1"));
    }

    #[test]
    fn test_abort_start_spares_active_sessions() {
        let mut state = SessionState::Starting;
        state.abort_start();
        assert_eq!(state.phase(), SessionPhase::NoSession);

        let mut state = SessionState::Active {
            token: "tok-2".to_string(),
        };
        state.abort_start();
        assert_eq!(state.token(), Some("tok-2"));
    }

    #[test]
    fn test_complete_start_overrides_any_state() {
        let mut state = SessionState::default();
        state.complete_start("tok-3".to_string());
        assert_eq!(state.phase(), SessionPhase::Active);

        state.complete_start("tok-4".to_string());
        assert_eq!(state.token(), Some("tok-4"));
    }

    #[test]
    fn test_clear_resets_to_no_session() {
        let mut state = SessionState::Active {
            token: "tok-5".to_string(),
        };
        state.clear();
        assert_eq!(state.phase(), SessionPhase::NoSession);
        assert_eq!(state.token(), None);
    }
}
