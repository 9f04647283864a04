/// Outcome of a channel decision. Returned by `acs_init` and by the
/// bring-up collaborator once the AP has been configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanStatus {
    /// A decision was made, or bring-up succeeded.
    Valid,
    /// No decision is possible.
    Invalid,
    /// Decision in progress; wait for the completion callback.
    Acs,
}

/// Controller states. The transient states (Sanity, PassComplete, Deciding,
/// Handoff) are traversed synchronously within a single driver event, so
/// between events the engine only rests in Idle, InitialScan, Surveying,
/// Done or Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcsState {
    Idle,
    Sanity,
    /// Awaiting the driver's scan completion callback.
    InitialScan,
    /// Awaiting ROC events for the dwell at the current cursor.
    Surveying,
    PassComplete,
    Deciding,
    Handoff,
    Done,
    Failed,
}

impl AcsState {
    /// True once the run has ended, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AcsState::Done | AcsState::Failed)
    }
}
