use std::sync::Arc;

use llm_router::{CompletionParams, ProviderConfig, Router, RouterError};

use crate::support::{provider_config, FixedCounter, ScriptedProvider};

fn simple_router(provider: Arc<ScriptedProvider>) -> Router {
    Router::builder()
        .provider_group("gpt3-level-model", vec![provider_config("m1", provider, Some(100), Some(10_000))])
        .token_counter(Arc::new(FixedCounter(4)))
        .build()
        .unwrap()
}

#[tokio::test]
async fn routes_a_text_completion_to_the_group() {
    let provider = ScriptedProvider::ok("p1");
    let router = simple_router(Arc::clone(&provider));

    let response = router
        .completion(CompletionParams::from_text("gpt3-level-model", "hello"))
        .await
        .unwrap();

    assert_eq!(response.content, "p1 says ok");
    assert_eq!(provider.calls(), 1);
    router.shutdown();
}

#[tokio::test]
async fn routes_a_chat_completion_to_the_group() {
    let provider = ScriptedProvider::ok("p1");
    let router = simple_router(Arc::clone(&provider));

    let params = CompletionParams::from_messages(
        "gpt3-level-model",
        vec![llm_router::ChatMessage::user("hi there")],
    );
    assert!(router.completion(params).await.is_ok());
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn unknown_group_is_model_group_not_found() {
    let router = simple_router(ScriptedProvider::ok("p1"));
    let err = router
        .completion(CompletionParams::from_text("nope", "hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::ModelGroupNotFound { .. }));
}

#[tokio::test]
async fn empty_group_yields_no_provider_available() {
    let router = Router::builder()
        .provider_group("empty", Vec::new())
        .token_counter(Arc::new(FixedCounter(4)))
        .build()
        .unwrap();
    let err = router
        .completion(CompletionParams::from_text("empty", "hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::NoProviderAvailable { .. }));
}

#[tokio::test]
async fn input_without_text_or_messages_is_invalid() {
    let provider = ScriptedProvider::ok("p1");
    let router = simple_router(Arc::clone(&provider));
    let params = CompletionParams {
        model_group: "gpt3-level-model".into(),
        text: None,
        messages: None,
        retry: None,
        fallback: None,
    };
    assert!(matches!(
        router.completion(params).await,
        Err(RouterError::InvalidInput { .. })
    ));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn callers_params_survive_normalization_unchanged() {
    let router = simple_router(ScriptedProvider::ok("p1"));
    let params = CompletionParams::from_text("gpt3-level-model", "hello");
    let snapshot = params.clone();

    let _ = router.completion(params.clone()).await.unwrap();

    assert!(params.retry.is_none());
    assert!(params.fallback.is_none());
    assert_eq!(params.model_group, snapshot.model_group);
    assert_eq!(params.text, snapshot.text);
}

#[tokio::test]
async fn requests_spread_across_group_members() {
    let p1 = ScriptedProvider::ok("p1");
    let p2 = ScriptedProvider::ok("p2");
    let router = Router::builder()
        .provider_group(
            "g",
            vec![
                provider_config("m1", Arc::clone(&p1), Some(1000), None),
                provider_config("m2", Arc::clone(&p2), Some(1000), None),
            ],
        )
        .token_counter(Arc::new(FixedCounter(4)))
        .build()
        .unwrap();

    for _ in 0..30 {
        router
            .completion(CompletionParams::from_text("g", "hello"))
            .await
            .unwrap();
    }
    // Weighted over equal unit weights: both providers serve traffic.
    assert!(p1.calls() > 0, "p1 never scheduled");
    assert!(p2.calls() > 0, "p2 never scheduled");
    assert_eq!(p1.calls() + p2.calls(), 30);
}

#[tokio::test]
async fn identical_configs_share_an_accounting_bucket() {
    // Same fields, same hash: the id is deliberately stable.
    let a = provider_config("m", ScriptedProvider::ok("p"), Some(10), None);
    let b = provider_config("m", ScriptedProvider::ok("p"), Some(10), None);
    assert_eq!(a.id(), b.id());

    let c = ProviderConfig::builder("m", ScriptedProvider::ok("p")).rpm(11).build();
    assert_ne!(a.id(), c.id());
}
