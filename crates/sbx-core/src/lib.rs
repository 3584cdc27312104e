//! Sync orchestration for sbx
//!
//! This crate turns a directory of component schemas into writes against a
//! destination space, and a source space back into files:
//!
//! - **matcher** / **store**: select and load local entity files
//! - **snapshot**: the destination's current entities, fetched concurrently
//! - **resolver**: groups and tags by name, each created at most once per run
//! - **planner**: create or update, per component
//! - **executor**: a bounded worker pool running plans in dependency order
//! - **push** / **pull** / **space**: complete runs, each ending in a report
//!
//! ```ignore
//! use sbx_core::{SyncConfig, push::{self, PushOptions}};
//! use sbx_api::RequestContext;
//!
//! let config = SyncConfig::default();
//! let client = config.client(&token)?;
//! let mut options = PushOptions::new(12345, "component-schemas/");
//! options.names = vec!["hero".into()];
//! let outcome = push::run(&options, &client, &RequestContext::new()).await;
//! std::process::exit(outcome.exit_code());
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod flight;
pub mod matcher;
pub mod planner;
pub mod pull;
pub mod push;
pub mod report;
pub mod resolver;
pub mod snapshot;
pub mod space;
pub mod store;

pub use config::{CONFIG_FILE_NAME, DEFAULT_WORKERS, SyncConfig};
pub use error::{Error, Result};
pub use executor::{Execution, Executor, PlanOutcome};
pub use flight::SingleFlight;
pub use matcher::{MatchMode, Matcher, Selection};
pub use planner::{DryRunEntry, PlanAction, SyncPlan};
pub use pull::{PullAction, PullOptions, PullOutcome};
pub use push::{PushOptions, PushOutcome};
pub use report::{Outcome, RunReport};
pub use resolver::DependencyResolver;
pub use snapshot::{ComponentCache, Snapshot};
pub use space::SpaceInfo;
