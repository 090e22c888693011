//! Write acknowledgment state machine.
//!
//! After the write reports of a transaction the IO-Warrior answers with a
//! report of kind 2. Its error bit means the slave did not acknowledge; any
//! other report kind means host and device disagree about framing. Both
//! cases re-send the whole write, under separate bounds.

use crate::report::{ReportFrame, report_ids};
use std::time::Duration;

/// Bounds for the acknowledgment loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPolicy {
    /// Re-sends after a NACK before the NACK is ignored.
    pub max_nack_retries: u8,
    /// Re-sends after a report of the wrong kind before giving up.
    pub max_desync_retries: u8,
    /// Pause before re-sending after a desync.
    pub desync_delay: Duration,
}

impl Default for AckPolicy {
    fn default() -> Self {
        Self {
            max_nack_retries: 3,
            max_desync_retries: 5,
            desync_delay: Duration::from_millis(50),
        }
    }
}

/// What to do with the report just observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStep {
    /// Clean acknowledgment.
    Accepted,
    /// Error bit set; re-send the write. `retry` counts from 1.
    RetryAfterNack { retry: u8 },
    /// Wrong report kind; wait and re-send. `retry` counts from 1.
    RetryAfterDesync { retry: u8, kind: u8 },
    /// The first write and every retry were rejected; carry on regardless.
    ForceContinue { attempts: u8 },
    /// Desync bound exhausted.
    GiveUp { retries: u8, kind: u8 },
}

impl AckStep {
    pub fn is_retry(self) -> bool {
        matches!(self, Self::RetryAfterNack { .. } | Self::RetryAfterDesync { .. })
    }
}

/// Summary of one acknowledgment phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AckOutcome {
    pub nacks: u8,
    pub desyncs: u8,
    pub forced: bool,
}

/// Tracks one transaction's acknowledgment phase.
#[derive(Debug, Clone)]
pub struct AckTracker {
    policy: AckPolicy,
    outcome: AckOutcome,
}

impl AckTracker {
    pub fn new(policy: AckPolicy) -> Self {
        Self {
            policy,
            outcome: AckOutcome::default(),
        }
    }

    pub fn policy(&self) -> &AckPolicy {
        &self.policy
    }

    pub fn outcome(&self) -> AckOutcome {
        self.outcome
    }

    pub fn observe(&mut self, report: &ReportFrame) -> AckStep {
        let kind = report.kind();
        if kind != report_ids::WRITE {
            if self.outcome.desyncs >= self.policy.max_desync_retries {
                return AckStep::GiveUp {
                    retries: self.outcome.desyncs,
                    kind,
                };
            }
            self.outcome.desyncs = self.outcome.desyncs.saturating_add(1);
            return AckStep::RetryAfterDesync {
                retry: self.outcome.desyncs,
                kind,
            };
        }

        if !report.has_error() {
            return AckStep::Accepted;
        }

        self.outcome.nacks = self.outcome.nacks.saturating_add(1);
        if self.outcome.nacks > self.policy.max_nack_retries {
            self.outcome.forced = true;
            AckStep::ForceContinue {
                attempts: self.outcome.nacks,
            }
        } else {
            AckStep::RetryAfterNack {
                retry: self.outcome.nacks,
            }
        }
    }
}
