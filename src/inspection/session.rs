use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::errors::InspectionError;

/// Allowed expected-code counts
pub const EXPECTED_RANGE: std::ops::RangeInclusive<u32> = 1..=8;
/// Allowed timeouts, in seconds
pub const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=300;

/// One inspection between `start` and completion/stop
#[derive(Debug, Clone)]
pub struct InspectionSession {
    expected: u32,
    timeout: Duration,
    started: Instant,
    detected: BTreeSet<String>,
}

impl InspectionSession {
    /// Codes the session expects
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Time allowed before the verdict
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Session start
    pub fn started(&self) -> Instant {
        self.started
    }

    /// Unique decoded texts seen so far
    pub fn detected(&self) -> &BTreeSet<String> {
        &self.detected
    }

    /// Number of unique texts seen
    pub fn detected_count(&self) -> u32 {
        self.detected.len() as u32
    }

    /// Time since start, as of `now`
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }
}

/// How the detected count compares with the expected one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Counts match
    Exact,
    /// This many codes missing
    Shortfall(u32),
    /// This many codes too many
    Excess(u32),
}

/// Final result of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectionOutcome {
    /// Timeout reached; `success` only when exactly `expected` codes were seen
    Completed {
        /// `detected == expected`
        success: bool,
        /// Unique codes seen
        detected: u32,
        /// Codes expected
        expected: u32,
    },
    /// Stopped by the caller; no verdict
    Stopped {
        /// Unique codes seen
        detected: u32,
    },
}

impl InspectionOutcome {
    /// Unique codes seen
    pub fn detected(&self) -> u32 {
        match *self {
            InspectionOutcome::Completed { detected, .. } => detected,
            InspectionOutcome::Stopped { detected } => detected,
        }
    }

    /// `None` for a manually stopped session
    pub fn success(&self) -> Option<bool> {
        match *self {
            InspectionOutcome::Completed { success, .. } => Some(success),
            InspectionOutcome::Stopped { .. } => None,
        }
    }

    /// `None` for a manually stopped session
    pub fn verdict(&self) -> Option<Verdict> {
        let InspectionOutcome::Completed { detected, expected, .. } = *self else {
            return None;
        };
        Some(if detected < expected {
            Verdict::Shortfall(expected - detected)
        } else if detected > expected {
            Verdict::Excess(detected - expected)
        } else {
            Verdict::Exact
        })
    }
}

/// Externally visible state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectionState {
    /// No session yet
    Idle,
    /// Session in progress
    Running,
    /// Last session timed out
    Completed {
        /// Counts matched
        success: bool,
        /// Unique codes seen
        detected: u32,
    },
    /// Last session was stopped
    Stopped {
        /// Unique codes seen
        detected: u32,
    },
}

#[derive(Debug, Clone)]
enum State {
    Idle,
    Running(InspectionSession),
    Finished(InspectionOutcome),
}

/// Idle -> Running -> Completed | Stopped.
///
/// Time is passed in by the caller so the machine stays deterministic.
#[derive(Debug, Clone)]
pub struct InspectionStateMachine {
    state: State,
}

impl Default for InspectionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl InspectionStateMachine {
    /// Machine in the Idle state
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Current state, without the session data
    pub fn state(&self) -> InspectionState {
        match &self.state {
            State::Idle => InspectionState::Idle,
            State::Running(_) => InspectionState::Running,
            State::Finished(InspectionOutcome::Completed { success, detected, .. }) => {
                InspectionState::Completed {
                    success: *success,
                    detected: *detected,
                }
            }
            State::Finished(InspectionOutcome::Stopped { detected }) => {
                InspectionState::Stopped { detected: *detected }
            }
        }
    }

    /// A session is in progress
    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    /// The active session, if any
    pub fn session(&self) -> Option<&InspectionSession> {
        match &self.state {
            State::Running(session) => Some(session),
            _ => None,
        }
    }

    /// Begin a fresh session, replacing any running one
    pub fn start(
        &mut self,
        expected: u32,
        timeout_secs: u64,
        now: Instant,
    ) -> Result<(), InspectionError> {
        if !EXPECTED_RANGE.contains(&expected) {
            return Err(InspectionError::ExpectedOutOfRange(expected));
        }
        if !TIMEOUT_RANGE_SECS.contains(&timeout_secs) {
            return Err(InspectionError::TimeoutOutOfRange(timeout_secs));
        }
        if self.is_running() {
            log::info!("restarting running inspection");
        }
        self.state = State::Running(InspectionSession {
            expected,
            timeout: Duration::from_secs(timeout_secs),
            started: now,
            detected: BTreeSet::new(),
        });
        log::info!(
            "inspection started: expecting {} code(s) within {}s",
            expected,
            timeout_secs
        );
        Ok(())
    }

    /// Add a decoded text to the running session.
    ///
    /// Returns `true` if the text was new. Ignored when not running.
    pub fn record(&mut self, text: &str) -> bool {
        match &mut self.state {
            State::Running(session) => {
                let added = session.detected.insert(text.to_string());
                if added {
                    log::debug!(
                        "inspection tally {}/{}: {:?}",
                        session.detected.len(),
                        session.expected,
                        text
                    );
                }
                added
            }
            _ => false,
        }
    }

    /// Complete the session once its timeout has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<InspectionOutcome> {
        let State::Running(session) = &self.state else {
            return None;
        };
        if session.elapsed(now) < session.timeout {
            return None;
        }
        let detected = session.detected_count();
        let expected = session.expected;
        let outcome = InspectionOutcome::Completed {
            success: detected == expected,
            detected,
            expected,
        };
        log::info!(
            "inspection complete: {} ({}/{})",
            if detected == expected { "OK" } else { "FAIL" },
            detected,
            expected
        );
        self.state = State::Finished(outcome);
        Some(outcome)
    }

    /// Stop a running session without a verdict
    pub fn stop(&mut self) -> Option<InspectionOutcome> {
        let State::Running(session) = &self.state else {
            return None;
        };
        let outcome = InspectionOutcome::Stopped {
            detected: session.detected_count(),
        };
        log::info!("inspection stopped with {} code(s)", outcome.detected());
        self.state = State::Finished(outcome);
        Some(outcome)
    }
}
