mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MockBackend;
use vault_stress::{Driver, FetchErrorPolicy, HarnessError, RunConfig, RunContext, RunMode};

fn unbounded_config(concurrency: usize) -> RunConfig {
    let mut config = RunConfig::new(
        "http://vault.test:8200",
        "loadtest",
        "readonly",
        RunMode::Unbounded,
    );
    config.concurrency = concurrency;
    config
}

fn stop_after(millis: u64) -> tokio::time::Sleep {
    tokio::time::sleep(Duration::from_millis(millis))
}

#[tokio::test(start_paused = true)]
async fn backlog_refills_after_draining() {
    let backend = Arc::new(MockBackend::new());
    let ctx = RunContext::establish(unbounded_config(50), Arc::clone(&backend))
        .await
        .unwrap();

    // ticks at t=0 and t=1s, each finding an empty backlog
    Driver::new(Arc::clone(&ctx))
        .run_until(stop_after(1500))
        .await
        .unwrap();

    assert_eq!(backend.reads(), 10_000);
    assert_eq!(ctx.backlog.get(), 0);

    let limiter = ctx.limiter.snapshot();
    assert!(limiter.peak <= 50);
    assert_eq!(limiter.acquired, 10_000);
    assert_eq!(limiter.released, 10_000);
}

#[tokio::test(start_paused = true)]
async fn top_up_fires_just_below_low_water_mark() {
    let backend = Arc::new(MockBackend::new());
    let ctx = RunContext::establish(unbounded_config(20), Arc::clone(&backend))
        .await
        .unwrap();
    ctx.backlog.add(4999);

    Driver::new(Arc::clone(&ctx))
        .run_until(stop_after(500))
        .await
        .unwrap();

    assert_eq!(backend.reads(), 5000);
    assert_eq!(ctx.backlog.get(), 4999);
}

#[tokio::test(start_paused = true)]
async fn top_up_skipped_at_low_water_mark() {
    let backend = Arc::new(MockBackend::new());
    let ctx = RunContext::establish(unbounded_config(20), Arc::clone(&backend))
        .await
        .unwrap();
    ctx.backlog.add(5000);

    Driver::new(Arc::clone(&ctx))
        .run_until(stop_after(2500))
        .await
        .unwrap();

    assert_eq!(backend.reads(), 0);
    assert_eq!(ctx.backlog.get(), 5000);
}

#[tokio::test(start_paused = true)]
async fn short_lease_renews_every_tick() {
    let backend = Arc::new(MockBackend::new().lease(Duration::from_secs(599)));
    let mut config = unbounded_config(4);
    // keep the backlog quiet so only renewal is exercised
    config.low_water_mark = 0;
    let ctx = RunContext::establish(config, Arc::clone(&backend))
        .await
        .unwrap();

    Driver::new(Arc::clone(&ctx))
        .run_until(stop_after(2500))
        .await
        .unwrap();

    // initial login plus one renewal at each of t=0, 1 and 2
    assert_eq!(backend.logins(), 4);
    assert_eq!(ctx.session.authentications(), 4);
    assert_eq!(ctx.session.current().token(), "s.token-4");
}

#[tokio::test(start_paused = true)]
async fn long_lease_is_not_renewed() {
    let backend = Arc::new(MockBackend::new().lease(Duration::from_secs(601)));
    let mut config = unbounded_config(4);
    config.low_water_mark = 0;
    let ctx = RunContext::establish(config, Arc::clone(&backend))
        .await
        .unwrap();

    Driver::new(Arc::clone(&ctx))
        .run_until(stop_after(2500))
        .await
        .unwrap();

    assert_eq!(backend.logins(), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_lease_renews_every_tick() {
    let backend = Arc::new(MockBackend::new().lease(Duration::ZERO));
    let mut config = unbounded_config(4);
    config.low_water_mark = 0;
    let ctx = RunContext::establish(config, Arc::clone(&backend))
        .await
        .unwrap();

    Driver::new(Arc::clone(&ctx))
        .run_until(stop_after(2500))
        .await
        .unwrap();

    assert_eq!(backend.logins(), 4);
    assert_eq!(ctx.session.current().token(), "s.token-4");
}

#[tokio::test(start_paused = true)]
async fn renewal_failure_is_fatal() {
    let backend = Arc::new(
        MockBackend::new()
            .lease(Duration::from_secs(30))
            .fail_login_after(1),
    );
    let mut config = unbounded_config(4);
    config.low_water_mark = 0;
    let ctx = RunContext::establish(config, Arc::clone(&backend))
        .await
        .unwrap();

    let err = Driver::new(ctx).run().await.unwrap_err();

    assert!(matches!(err, HarnessError::Auth(_)));
}

#[tokio::test(start_paused = true)]
async fn abort_policy_ends_unbounded_run() {
    let backend = Arc::new(MockBackend::new().fail_every(1));
    let mut config = unbounded_config(2);
    config.low_water_mark = 10;
    config.top_up = 10;
    config.fetch_error_policy = FetchErrorPolicy::Abort;
    let ctx = RunContext::establish(config, Arc::clone(&backend))
        .await
        .unwrap();

    let err = Driver::new(ctx).run().await.unwrap_err();

    assert!(matches!(err, HarnessError::Fetch { .. }));
}

#[tokio::test(start_paused = true)]
async fn logged_failures_still_drain_backlog() {
    let backend = Arc::new(MockBackend::new().fail_every(3));
    let mut config = unbounded_config(5);
    config.low_water_mark = 100;
    config.top_up = 100;
    let ctx = RunContext::establish(config, Arc::clone(&backend))
        .await
        .unwrap();

    Driver::new(Arc::clone(&ctx))
        .run_until(stop_after(500))
        .await
        .unwrap();

    assert_eq!(backend.reads(), 100);
    assert_eq!(ctx.backlog.get(), 0);
    assert_eq!(ctx.stats.snapshot().failed, 33);
}
