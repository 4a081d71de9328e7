//! Per-video job state.
//!
//! A job lives only for the duration of a run. It carries the attempt counter
//! and the outputs of stages that already succeeded, so a retry resumes at the
//! stage that failed instead of repeating paid calls.

use super::retry::RetryPolicy;
use crate::error::ServiceError;
use crate::source::VideoMetadata;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Where a job is in its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    Downloading,
    Transcribing,
    Extracting,
    Stored,
    Failed,
    Skipped,
}

impl JobState {
    fn stage(self) -> u8 {
        match self {
            JobState::Queued => 0,
            JobState::Downloading => 1,
            JobState::Transcribing => 2,
            JobState::Extracting => 3,
            JobState::Stored | JobState::Failed | JobState::Skipped => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.stage() == 4
    }

    /// Jobs only move forward. Re-entering the current stage is how a retry
    /// resumes; terminal states are final.
    pub fn can_advance_to(self, next: JobState) -> bool {
        !self.is_terminal() && next.stage() >= self.stage()
    }
}

/// What the scheduler should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    RetryAfter(Duration),
    Fail,
}

/// One video moving through the pipeline.
#[derive(Debug, Clone)]
pub struct IngestionJob {
    pub video_id: String,
    pub state: JobState,
    /// Attempts started so far.
    pub attempt: u32,
    pub last_error: Option<String>,
    pub(crate) metadata: Option<VideoMetadata>,
    pub(crate) audio_path: Option<PathBuf>,
    pub(crate) transcript: Option<String>,
}

impl IngestionJob {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            state: JobState::Queued,
            attempt: 0,
            last_error: None,
            metadata: None,
            audio_path: None,
            transcript: None,
        }
    }

    /// Move to `next`. Returns false and leaves the job untouched when the
    /// transition would go backwards.
    pub fn advance(&mut self, next: JobState) -> bool {
        if !self.state.can_advance_to(next) {
            warn!(
                "Ignoring transition {:?} -> {:?} for {}",
                self.state, next, self.video_id
            );
            return false;
        }
        self.state = next;
        true
    }

    pub fn begin_attempt(&mut self) {
        self.attempt += 1;
    }

    /// Record a failed attempt and decide whether to try again.
    ///
    /// Transient errors are retried while the policy allows; anything else
    /// ends the job.
    pub fn on_failure(&mut self, error: &ServiceError, policy: &RetryPolicy) -> NextStep {
        self.last_error = Some(error.to_string());

        if error.is_transient() && policy.should_retry(self.attempt) {
            NextStep::RetryAfter(policy.delay_for_attempt(self.attempt))
        } else {
            NextStep::Fail
        }
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.last_error = Some(reason.into());
        self.advance(JobState::Failed);
    }

    /// Reason shown to the caller for a failed job.
    pub fn failure_reason(&self) -> String {
        self.last_error
            .clone()
            .unwrap_or_else(|| "unknown error".to_string())
    }
}
