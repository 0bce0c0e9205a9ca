//! Sampling state machine.
//!
//! Three execution contexts mutate the sampling state (command processor,
//! frame interrupt, conversion interrupt) and a fourth reads it (drain loop).
//! Every transition goes through [`transition`] so the legal set stays in one
//! auditable place instead of being scattered across the handlers.

/// Lifecycle of a sampling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SamplingState {
    /// No run in progress; buffers untouched by interrupts.
    Idle = 0,
    /// `b` received; waiting for a qualifying frame marker before arming.
    WaitingForFrameSync = 1,
    /// Trigger armed; no conversion has completed yet.
    StartingSampling = 2,
    /// First sample of the run captured; drain loop has not yet observed it.
    HadFirstSample = 3,
    /// Steady-state streaming.
    Sampling = 4,
}

impl SamplingState {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::WaitingForFrameSync,
            2 => Self::StartingSampling,
            3 => Self::HadFirstSample,
            4 => Self::Sampling,
            _ => Self::Idle,
        }
    }
}

/// Stimuli that may move the state machine, one per mutating context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// `b` command (command processor).
    BeginRequested,
    /// `s` command (command processor).
    StopRequested,
    /// Qualifying frame marker observed (frame interrupt).
    FrameSyncArrived,
    /// First sample of the sweep's first channel stored (conversion interrupt).
    FirstSampleCaptured,
    /// Drain loop noticed the first sample and flushed any pending
    /// first-sample-time request.
    DrainObservedFirstSample,
}

/// The complete legal-transition set. Returns `None` when the event does not
/// apply in the given state, in which case the state must not change.
pub const fn transition(state: SamplingState, event: Event) -> Option<SamplingState> {
    use Event::*;
    use SamplingState::*;
    match (state, event) {
        (_, StopRequested) => Some(Idle),
        (Idle, BeginRequested) => Some(WaitingForFrameSync),
        (WaitingForFrameSync, FrameSyncArrived) => Some(StartingSampling),
        (StartingSampling, FirstSampleCaptured) => Some(HadFirstSample),
        (HadFirstSample, DrainObservedFirstSample) => Some(Sampling),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_never_jumps_straight_to_sampling() {
        assert_eq!(
            transition(SamplingState::Idle, Event::BeginRequested),
            Some(SamplingState::WaitingForFrameSync)
        );
        // A second begin while already waiting changes nothing.
        assert_eq!(
            transition(SamplingState::WaitingForFrameSync, Event::BeginRequested),
            None
        );
    }

    #[test]
    fn only_frame_sync_advances_past_waiting() {
        assert_eq!(
            transition(SamplingState::WaitingForFrameSync, Event::FirstSampleCaptured),
            None
        );
        assert_eq!(
            transition(SamplingState::WaitingForFrameSync, Event::FrameSyncArrived),
            Some(SamplingState::StartingSampling)
        );
    }

    #[test]
    fn stop_returns_to_idle_from_every_state() {
        for state in [
            SamplingState::Idle,
            SamplingState::WaitingForFrameSync,
            SamplingState::StartingSampling,
            SamplingState::HadFirstSample,
            SamplingState::Sampling,
        ] {
            assert_eq!(transition(state, Event::StopRequested), Some(SamplingState::Idle));
        }
    }

    #[test]
    fn run_walks_the_full_pipeline() {
        let mut state = SamplingState::Idle;
        for event in [
            Event::BeginRequested,
            Event::FrameSyncArrived,
            Event::FirstSampleCaptured,
            Event::DrainObservedFirstSample,
        ] {
            state = transition(state, event).unwrap();
        }
        assert_eq!(state, SamplingState::Sampling);
    }

    #[test]
    fn round_trips_through_u8() {
        for state in [
            SamplingState::Idle,
            SamplingState::WaitingForFrameSync,
            SamplingState::StartingSampling,
            SamplingState::HadFirstSample,
            SamplingState::Sampling,
        ] {
            assert_eq!(SamplingState::from_u8(state as u8), state);
        }
    }
}
