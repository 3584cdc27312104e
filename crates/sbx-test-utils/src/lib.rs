//! Shared test utilities for the sbx workspace.
//!
//! This crate is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`space`]: [`FakeSpace`], an in-memory management API space behind the
//!   [`sbx_api::Transport`] seam
//! - [`fixtures`]: [`SchemaDir`] and JSON builders for on-disk entity files

pub mod fixtures;
pub mod space;

pub use fixtures::{SchemaDir, component_json, preset_json};
pub use space::{FakeSpace, RecordedCall, Resource, TEST_TOKEN, client_for, limited_client_for};
