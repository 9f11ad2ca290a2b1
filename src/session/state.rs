//! Per-sender sharing state.

/// Sharing state of a single sender, derived from the session directory.
///
/// There is no terminal state: a sender can cycle between the two states
/// any number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShareState {
    /// No outgoing session.
    #[default]
    Idle,
    /// Streaming location to a receiver.
    Sharing,
}
