use std::fmt;

use thiserror::Error;

/// Host-observable emulator lifecycle.
///
/// `Uninitialized → Ready → Running ⇄ Paused → Halted → Ready`; every other
/// edge is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum LifecycleState {
    /// No program has been loaded yet.
    #[default]
    Uninitialized,
    /// A program is loaded and the clocks are idle.
    Ready,
    /// Both clocks are ticking.
    Running,
    /// Clocks are alive but their ticks are suppressed.
    Paused,
    /// Run finished; a new program may be loaded.
    Halted,
}

impl LifecycleState {
    /// Every state, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Uninitialized,
        Self::Ready,
        Self::Running,
        Self::Paused,
        Self::Halted,
    ];

    /// Returns `true` when `self → next` is on the transition whitelist.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Uninitialized | Self::Halted, Self::Ready)
                | (Self::Ready | Self::Paused, Self::Running)
                | (Self::Ready | Self::Running | Self::Paused, Self::Halted)
                | (Self::Running, Self::Paused)
        )
    }

    /// Returns `true` when a program may be loaded from this state.
    #[must_use]
    pub const fn accepts_program(self) -> bool {
        self.can_transition_to(Self::Ready)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Halted => "halted",
        };
        f.write_str(name)
    }
}

/// Rejected lifecycle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum LifecycleError {
    /// Requested edge is not on the whitelist; state is unchanged.
    #[error("cannot transition from {from} to {to}")]
    InvalidTransition {
        /// State at the time of the request.
        from: LifecycleState,
        /// Requested target state.
        to: LifecycleState,
    },
}

#[cfg(test)]
mod tests {
    use super::{LifecycleError, LifecycleState};
    use rstest::rstest;

    #[test]
    fn default_state_is_uninitialized() {
        assert_eq!(LifecycleState::default(), LifecycleState::Uninitialized);
    }

    #[rstest]
    #[case(LifecycleState::Uninitialized, LifecycleState::Ready)]
    #[case(LifecycleState::Ready, LifecycleState::Running)]
    #[case(LifecycleState::Ready, LifecycleState::Halted)]
    #[case(LifecycleState::Running, LifecycleState::Paused)]
    #[case(LifecycleState::Running, LifecycleState::Halted)]
    #[case(LifecycleState::Paused, LifecycleState::Running)]
    #[case(LifecycleState::Paused, LifecycleState::Halted)]
    #[case(LifecycleState::Halted, LifecycleState::Ready)]
    fn whitelisted_transitions_are_allowed(
        #[case] from: LifecycleState,
        #[case] to: LifecycleState,
    ) {
        assert!(from.can_transition_to(to));
    }

    #[test]
    fn exactly_eight_transitions_are_whitelisted() {
        let allowed = LifecycleState::ALL
            .iter()
            .flat_map(|from| LifecycleState::ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .count();
        assert_eq!(allowed, 8);
    }

    #[test]
    fn self_transitions_are_rejected() {
        for state in LifecycleState::ALL {
            assert!(!state.can_transition_to(state), "{state} -> {state}");
        }
    }

    #[test]
    fn only_fresh_and_halted_states_accept_programs() {
        assert!(LifecycleState::Uninitialized.accepts_program());
        assert!(LifecycleState::Halted.accepts_program());
        assert!(!LifecycleState::Ready.accepts_program());
        assert!(!LifecycleState::Running.accepts_program());
        assert!(!LifecycleState::Paused.accepts_program());
    }

    #[test]
    fn invalid_transition_message_names_both_states() {
        let err = LifecycleError::InvalidTransition {
            from: LifecycleState::Uninitialized,
            to: LifecycleState::Running,
        };
        assert_eq!(
            err.to_string(),
            "cannot transition from uninitialized to running"
        );
    }
}
