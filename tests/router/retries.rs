use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use llm_router::config::{CooldownConfig, RetryConfig, RetryPolicy};
use llm_router::events::RetryEvent;
use llm_router::{CompletionParams, Router, RouterError};

use crate::support::{connection_reset, provider_config, rate_limit, FixedCounter, ScriptedProvider};

fn ok_response() -> Result<llm_router::CompletionResponse, RouterError> {
    Ok(llm_router::CompletionResponse::new("m1", "ok"))
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    // Connection errors are retryable and only count against the fail
    // allowance, so the provider stays schedulable between attempts.
    let provider = ScriptedProvider::new(
        "p1",
        vec![Err(connection_reset()), Err(connection_reset()), ok_response()],
    );
    let waits = Arc::new(AtomicU32::new(0));
    let waits_clone = Arc::clone(&waits);

    let router = Router::builder()
        .provider_group("g", vec![provider_config("m1", Arc::clone(&provider), None, None)])
        .retry_config(RetryConfig { max_attempt: 3, retry_policy: None })
        .token_counter(Arc::new(FixedCounter(4)))
        .on_retry_event(move |event| {
            if matches!(event, RetryEvent::Retry { .. }) {
                waits_clone.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build()
        .unwrap();

    let response = router
        .completion(CompletionParams::from_text("g", "hello"))
        .await
        .unwrap();

    assert_eq!(response.content, "ok");
    assert_eq!(provider.calls(), 3);
    assert_eq!(waits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn exhausted_retries_surface_retry_exhausted() {
    let provider = ScriptedProvider::failing("p1", connection_reset());
    let router = Router::builder()
        .provider_group("g", vec![provider_config("m1", Arc::clone(&provider), None, None)])
        .retry_config(RetryConfig { max_attempt: 2, retry_policy: None })
        // Generous allowance so cooldown does not hide the retry path.
        .cooldown_config(CooldownConfig {
            general_allowed_fails: 100,
            ..CooldownConfig::default()
        })
        .token_counter(Arc::new(FixedCounter(4)))
        .build()
        .unwrap();

    let err = router
        .completion(CompletionParams::from_text("g", "hello"))
        .await
        .unwrap_err();

    match err {
        RouterError::RetryExhausted { attempts, last_error } => {
            assert_eq!(attempts, 2);
            assert!(matches!(*last_error, RouterError::Connection { .. }));
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn non_retryable_provider_errors_are_not_retried() {
    let provider = ScriptedProvider::failing(
        "p1",
        RouterError::BadRequest { message: "malformed".into() },
    );
    let router = Router::builder()
        .provider_group("g", vec![provider_config("m1", Arc::clone(&provider), None, None)])
        .retry_config(RetryConfig { max_attempt: 5, retry_policy: None })
        .token_counter(Arc::new(FixedCounter(4)))
        .build()
        .unwrap();

    let err = router
        .completion(CompletionParams::from_text("g", "hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::BadRequest { .. }));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn per_call_retry_config_overrides_the_router_default() {
    let provider = ScriptedProvider::failing("p1", connection_reset());
    let router = Router::builder()
        .provider_group("g", vec![provider_config("m1", Arc::clone(&provider), None, None)])
        .retry_config(RetryConfig { max_attempt: 5, retry_policy: None })
        .cooldown_config(CooldownConfig {
            general_allowed_fails: 100,
            ..CooldownConfig::default()
        })
        .token_counter(Arc::new(FixedCounter(4)))
        .build()
        .unwrap();

    let params = CompletionParams::from_text("g", "hello")
        .with_retry(RetryConfig { max_attempt: 1, retry_policy: None });
    let err = router.completion(params).await.unwrap_err();
    assert!(matches!(err, RouterError::RetryExhausted { attempts: 1, .. }));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn per_class_retry_policy_caps_attempts() {
    let provider = ScriptedProvider::failing("p1", connection_reset());
    let policy = RetryPolicy::default();
    // Connection errors have no class-specific cap; the global budget rules.
    let router = Router::builder()
        .provider_group("g", vec![provider_config("m1", Arc::clone(&provider), None, None)])
        .retry_config(RetryConfig { max_attempt: 3, retry_policy: Some(policy) })
        .cooldown_config(CooldownConfig {
            general_allowed_fails: 100,
            ..CooldownConfig::default()
        })
        .token_counter(Arc::new(FixedCounter(4)))
        .build()
        .unwrap();

    let err = router
        .completion(CompletionParams::from_text("g", "hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::RetryExhausted { attempts: 3, .. }));
}

#[tokio::test]
async fn rate_limited_single_provider_cools_down_and_stops() {
    // A rate limit cools the provider immediately, so the second attempt
    // finds nothing schedulable and the loop stops on the spot.
    let provider = ScriptedProvider::failing("p1", rate_limit());
    let router = Router::builder()
        .provider_group("g", vec![provider_config("m1", Arc::clone(&provider), None, None)])
        .retry_config(RetryConfig { max_attempt: 3, retry_policy: None })
        .cooldown_config(CooldownConfig {
            cooldown_seconds: 300,
            ..CooldownConfig::default()
        })
        .token_counter(Arc::new(FixedCounter(4)))
        .build()
        .unwrap();

    let start = std::time::Instant::now();
    let err = router
        .completion(CompletionParams::from_text("g", "hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, RouterError::NoProviderAvailable { .. }), "got {err:?}");
    assert_eq!(provider.calls(), 1);
    // One rate-limit backoff (at most ~11s with jitter), then the stop.
    assert!(start.elapsed() < Duration::from_secs(15));
}
