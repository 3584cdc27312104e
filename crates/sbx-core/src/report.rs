//! Run summaries and outcome classification

use std::fmt;
use std::time::Duration;

use sbx_api::{RetryCounters, SpaceId};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    /// Everything selected was synced
    #[default]
    Clean,
    /// The run completed but some selectors matched nothing
    Partial,
    /// Input was rejected before any network activity
    Invalid,
    /// The API failed after retries, or rejected a request
    ApiFailure,
    /// A local failure such as an unwritable output file
    ExecutionFailure,
    /// The run was interrupted
    Cancelled,
}

impl Outcome {
    /// Process exit code for this outcome
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Clean => 0,
            Outcome::Partial | Outcome::Invalid => 1,
            Outcome::ApiFailure => 2,
            Outcome::ExecutionFailure | Outcome::Cancelled => 3,
        }
    }

    pub fn is_clean(self) -> bool {
        self == Outcome::Clean
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Clean => "clean",
            Outcome::Partial => "partial",
            Outcome::Invalid => "invalid",
            Outcome::ApiFailure => "api failure",
            Outcome::ExecutionFailure => "execution failure",
            Outcome::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Summary of one push or pull run.
///
/// A report is produced for every run, including failed ones, so the caller
/// can always print what happened before the failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub space: SpaceId,
    pub dry_run: bool,
    pub components_synced: usize,
    pub presets_synced: usize,
    /// Names of created components, sorted
    pub created: Vec<String>,
    /// Names of updated components, sorted
    pub updated: Vec<String>,
    /// Selectors that matched nothing, as given
    pub missing: Vec<String>,
    pub rate_limit_retries: u64,
    pub server_error_retries: u64,
    pub duration: Duration,
    pub outcome: Outcome,
}

impl RunReport {
    pub fn new(space: SpaceId, dry_run: bool) -> Self {
        Self {
            space,
            dry_run,
            ..Self::default()
        }
    }

    /// Record a created or updated component
    pub fn record(&mut self, name: impl Into<String>, created: bool, presets: usize) {
        if created {
            self.created.push(name.into());
        } else {
            self.updated.push(name.into());
        }
        self.components_synced += 1;
        self.presets_synced += presets;
    }

    /// Sort name lists, copy retry counts and classify the run.
    ///
    /// `failure` is the outcome of the error that stopped the run, if any.
    pub fn finish(&mut self, counters: &RetryCounters, duration: Duration, failure: Option<Outcome>) {
        self.created.sort();
        self.updated.sort();
        self.rate_limit_retries = counters.rate_limited();
        self.server_error_retries = counters.server_errors();
        self.duration = duration;
        self.outcome = match failure {
            Some(outcome) => outcome,
            None if !self.missing.is_empty() => Outcome::Partial,
            None => Outcome::Clean,
        };
    }
}
