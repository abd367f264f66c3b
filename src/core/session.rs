//! Session state gate for gameplay-dependent actions.

/// Coarse gameplay state. Systems with destructive side effects consult it
/// before acting; the library default is `Playing` so embedding hosts that
/// never change state get full behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    Menu,
    #[default]
    Playing,
    Paused,
    GameOver,
}

impl SessionState {
    /// Whether cutting may run in this state.
    pub fn allows_cutting(self) -> bool {
        matches!(self, SessionState::Playing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_playing_allows_cutting() {
        assert!(SessionState::Playing.allows_cutting());
        assert!(!SessionState::Menu.allows_cutting());
        assert!(!SessionState::Paused.allows_cutting());
        assert!(!SessionState::GameOver.allows_cutting());
    }

    #[test]
    fn test_default_is_playing() {
        assert_eq!(SessionState::default(), SessionState::Playing);
    }
}
