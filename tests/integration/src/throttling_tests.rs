//! Runs against a space that throttles or fails transiently

use std::sync::Arc;
use std::time::Duration;

use sbx_api::{Method, RequestContext};
use sbx_core::push::{self, PushOptions};
use sbx_core::Outcome;
use sbx_limiter::{Access, LimiterConfig};
use sbx_test_utils::{FakeSpace, Resource, SchemaDir, component_json, limited_client_for};
use tokio::time::Instant;

const SPACE: u64 = 31;

fn hero_options(dir: &SchemaDir) -> PushOptions {
    let mut options = PushOptions::new(SPACE, dir.root());
    options.names = vec!["hero".into()];
    options
}

#[tokio::test(start_paused = true)]
async fn test_throttled_create_recovers_and_slows_writes() {
    let dir = SchemaDir::new();
    dir.add_component("hero", &component_json("hero"));
    let space = Arc::new(FakeSpace::new(SPACE));
    space.fail(Method::Post, Resource::Components, 429, 3);
    let (client, limiter) = limited_client_for(&space, LimiterConfig::default());

    let outcome = push::run(&hero_options(&dir), &client, &RequestContext::new()).await;

    assert!(outcome.error.is_none(), "{:?}", outcome.error);
    assert_eq!(outcome.report.created, vec!["hero".to_string()]);
    assert_eq!(outcome.report.rate_limit_retries, 3);
    assert_eq!(outcome.report.server_error_retries, 0);
    assert_eq!(outcome.report.outcome, Outcome::Clean);
    // 7.0, three throttles down by 0.2, one success up by 0.02
    assert!((limiter.rate(SPACE, Access::Write) - 6.42).abs() < 1e-9);
    assert!((limiter.rate(SPACE, Access::Read) - 7.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_transient_server_errors_are_retried() {
    let dir = SchemaDir::new();
    dir.add_component("hero", &component_json("hero"));
    let space = Arc::new(FakeSpace::new(SPACE));
    space.fail(Method::Get, Resource::Presets, 502, 2);
    let (client, _) = limited_client_for(&space, LimiterConfig::default());

    let outcome = push::run(&hero_options(&dir), &client, &RequestContext::new()).await;

    assert!(outcome.error.is_none(), "{:?}", outcome.error);
    assert_eq!(outcome.report.server_error_retries, 2);
    assert_eq!(space.count(Method::Get, Resource::Presets), 3);
}

#[tokio::test(start_paused = true)]
async fn test_many_components_respect_write_rate() {
    let dir = SchemaDir::new();
    let names: Vec<String> = (0..12).map(|i| format!("block-{:02}", i)).collect();
    for name in &names {
        dir.add_component(name, &component_json(name));
    }
    let space = Arc::new(FakeSpace::new(SPACE));
    let config = LimiterConfig {
        read_rps: 7.0,
        write_rps: 4.0,
        burst: 4,
    };
    let (client, _) = limited_client_for(&space, config);
    let mut options = PushOptions::new(SPACE, dir.root());
    options.all = true;

    let start = Instant::now();
    let outcome = push::run(&options, &client, &RequestContext::new()).await;

    assert!(outcome.error.is_none(), "{:?}", outcome.error);
    assert_eq!(outcome.report.created, names);
    // 4 writes from the burst, the other 8 at roughly 4 per second
    assert!(start.elapsed() >= Duration::from_millis(1700), "{:?}", start.elapsed());
}

#[tokio::test(start_paused = true)]
async fn test_persistent_throttling_fails_the_run() {
    let dir = SchemaDir::new();
    dir.add_component("hero", &component_json("hero"));
    let space = Arc::new(FakeSpace::new(SPACE));
    space.fail(Method::Post, Resource::Components, 429, 10);
    let (client, limiter) = limited_client_for(&space, LimiterConfig::default());

    let outcome = push::run(&hero_options(&dir), &client, &RequestContext::new()).await;

    assert_eq!(outcome.report.outcome, Outcome::ApiFailure);
    assert_eq!(outcome.report.rate_limit_retries, 5);
    assert!(outcome.report.created.is_empty());
    assert!(limiter.rate(SPACE, Access::Write) >= 1.0);
}
