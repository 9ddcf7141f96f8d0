//! 网关集成测试
//!
//! 使用假服务商验证缓存命中、错误不缓存、服务解析和超时

use std::sync::Arc;
use std::time::Duration;

use transpolish::cache::{ManualClock, Operation};
use transpolish::{Gateway, PolishRequest, ProviderRegistry, RelayError, TranslateRequest};

mod common;

use common::{memory_cache, FakeProvider, HOUR, START};

fn gateway_with(
    providers: Vec<Arc<FakeProvider>>,
    clock: &ManualClock,
    timeout: Duration,
) -> Gateway {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(provider);
    }
    registry.alias("gpt", "openai");

    Gateway::new(
        Arc::new(registry),
        Some(Arc::new(memory_cache(clock, 16, HOUR))),
        "openai",
        timeout,
    )
}

fn translate(text: &str, service: Option<&str>) -> TranslateRequest {
    TranslateRequest {
        text: text.to_string(),
        source_lang: Some("en".to_string()),
        target_lang: Some("zh".to_string()),
        service: service.map(String::from),
    }
}

#[tokio::test]
async fn test_repeat_request_served_from_cache() {
    let clock = ManualClock::new(START);
    let openai = Arc::new(FakeProvider::new("openai"));
    let gateway = gateway_with(vec![openai.clone()], &clock, Duration::from_secs(5));

    let first = gateway.translate(translate("Hello", None)).await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.response.translated_text, "[openai] Hello");
    assert_eq!(first.response.original_text, "Hello");
    assert_eq!(first.response.service, "openai");

    let second = gateway.translate(translate("Hello", Some("gpt"))).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.response, first.response);
    assert_eq!(openai.calls(), 1);
}

#[tokio::test]
async fn test_cache_expiry_triggers_new_call() {
    let clock = ManualClock::new(START);
    let openai = Arc::new(FakeProvider::new("openai"));
    let gateway = gateway_with(vec![openai.clone()], &clock, Duration::from_secs(5));

    gateway.translate(translate("Hello", None)).await.unwrap();
    clock.advance(HOUR + 1);
    let again = gateway.translate(translate("Hello", None)).await.unwrap();

    assert!(!again.cached);
    assert_eq!(openai.calls(), 2);
}

#[tokio::test]
async fn test_provider_errors_are_not_cached() {
    let clock = ManualClock::new(START);
    let broken = Arc::new(FakeProvider::failing("openai"));
    let gateway = gateway_with(vec![broken.clone()], &clock, Duration::from_secs(5));

    for _ in 0..2 {
        let err = gateway.translate(translate("Hello", None)).await.unwrap_err();
        assert!(matches!(err, RelayError::Provider(_)));
    }
    assert_eq!(broken.calls(), 2);

    let stats = gateway.cache().unwrap().stats().await;
    assert_eq!(stats.memory_count, 0);
}

#[tokio::test]
async fn test_services_and_operations_are_cached_separately() {
    let clock = ManualClock::new(START);
    let openai = Arc::new(FakeProvider::new("openai"));
    let deepseek = Arc::new(FakeProvider::new("deepseek"));
    let gateway = gateway_with(
        vec![openai.clone(), deepseek.clone()],
        &clock,
        Duration::from_secs(5),
    );

    gateway.translate(translate("Hello", None)).await.unwrap();
    let other = gateway
        .translate(translate("Hello", Some("DeepSeek")))
        .await
        .unwrap();
    assert!(!other.cached);
    assert_eq!(other.response.service, "deepseek");

    let polished = gateway
        .polish(PolishRequest {
            text: "Hello".to_string(),
            style: Some("formal".to_string()),
            service: None,
        })
        .await
        .unwrap();
    assert!(!polished.cached);
    assert_eq!(polished.response.translated_text, "[openai] Hello (formal)");

    assert_eq!(openai.calls(), 2);
    assert_eq!(deepseek.calls(), 1);
}

#[tokio::test]
async fn test_polish_style_is_part_of_the_key() {
    let clock = ManualClock::new(START);
    let openai = Arc::new(FakeProvider::new("openai"));
    let gateway = gateway_with(vec![openai.clone()], &clock, Duration::from_secs(5));

    let polish = |style: Option<&str>| PolishRequest {
        text: "text".to_string(),
        style: style.map(String::from),
        service: None,
    };

    gateway.polish(polish(None)).await.unwrap();
    assert!(gateway.polish(polish(Some("general"))).await.unwrap().cached);
    assert!(!gateway.polish(polish(Some("casual"))).await.unwrap().cached);

    let cache = gateway.cache().unwrap();
    assert!(cache
        .lookup(Operation::Polish, "openai", "", "casual", "text")
        .await
        .is_some());
}

#[tokio::test]
async fn test_unknown_service_and_empty_text() {
    let clock = ManualClock::new(START);
    let openai = Arc::new(FakeProvider::new("openai"));
    let gateway = gateway_with(vec![openai.clone()], &clock, Duration::from_secs(5));

    let err = gateway
        .translate(translate("Hello", Some("claude")))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::UnknownService(_)));

    let err = gateway.translate(translate(" \n", None)).await.unwrap_err();
    assert!(matches!(err, RelayError::InvalidInput(_)));

    assert_eq!(openai.calls(), 0);
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let clock = ManualClock::new(START);
    let slow = Arc::new(FakeProvider::slow("openai", Duration::from_secs(2)));
    let gateway = gateway_with(vec![slow], &clock, Duration::from_millis(50));

    let err = gateway.translate(translate("Hello", None)).await.unwrap_err();
    assert!(matches!(err, RelayError::Timeout(_)));
    assert_eq!(gateway.cache().unwrap().stats().await.memory_count, 0);
}

#[tokio::test]
async fn test_gateway_without_cache() {
    let openai = Arc::new(FakeProvider::new("openai"));
    let mut registry = ProviderRegistry::new();
    registry.register(openai.clone());
    let gateway = Gateway::new(Arc::new(registry), None, "openai", Duration::from_secs(5));

    let first = gateway.translate(translate("Hi", None)).await.unwrap();
    let second = gateway.translate(translate("Hi", None)).await.unwrap();
    assert!(!first.cached && !second.cached);
    assert_eq!(openai.calls(), 2);
}
