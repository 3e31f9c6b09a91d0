//! End-to-end chat turns through the assistant pipeline.
//!
//! Providers and the catalogue are scripted, so these run without network
//! access.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use vitaguide_assistant::analytics::MemorySink;
use vitaguide_assistant::providers::{
    CompletionProvider, HealthScheduler, ProbeOutcome, ProviderId, ReplySource,
};
use vitaguide_assistant::services::ChatRequest;
use vitaguide_core::{Profile, SearchGate, UserId};
use vitaguide_integration_tests::{
    Behaviour, InMemoryCatalog, TestHarness, product, sample_catalog,
};

fn profile(id: &str, goals: &[&str], allergies: &[&str], restrictions: &[&str]) -> Profile {
    let mut profile = Profile::empty(UserId::new(id));
    profile.goals = goals.iter().map(ToString::to_string).collect();
    profile.allergies = allergies.iter().map(ToString::to_string).collect();
    profile.dietary_restrictions = restrictions.iter().map(ToString::to_string).collect();
    profile
}

fn request_for(user: &str, message: &str) -> ChatRequest {
    ChatRequest {
        user_id: Some(UserId::new(user)),
        ..ChatRequest::new(message)
    }
}

// =============================================================================
// Gating
// =============================================================================

#[tokio::test]
async fn test_safety_question_returns_no_products() {
    let harness = TestHarness::new(
        Behaviour::reply("Iron and calcium compete for absorption; take magnesium separately."),
        Behaviour::Fail,
        sample_catalog(),
    );

    let outcome = harness
        .assistant
        .handle(&ChatRequest::new(
            "Which supplements should I avoid taking together?",
        ))
        .await;
    let response = outcome.response;

    assert!(response.intent.informational_question);
    assert!(!response.intent.explicit_product_request);
    assert!(response.products.is_empty());
    assert!(response.recommended_products.is_empty());
    assert!(response.recommended_combos.is_none());
    assert!(response.suggested_combo.is_none());
    assert!(
        harness.catalog.calls().is_empty(),
        "search must not run for an informational question"
    );
}

#[tokio::test]
async fn test_recommendation_phrased_as_safety_question_returns_no_products() {
    let harness = TestHarness::new(
        Behaviour::reply("Magnesium is usually well tolerated, but ask your pharmacist."),
        Behaviour::Fail,
        sample_catalog(),
    );

    let outcome = harness
        .assistant
        .handle(&ChatRequest::new(
            "Can you recommend supplements that are safe with my medications?",
        ))
        .await;
    let response = outcome.response;

    assert!(response.intent.informational_question);
    assert!(!response.intent.explicit_product_request);
    assert_eq!(response.intent.search_gate, SearchGate::Informational);
    assert!(!response.has_products());
    assert!(harness.catalog.calls().is_empty());
}

#[tokio::test]
async fn test_energy_product_list_uses_goal_tags() {
    let harness = TestHarness::with_profiles(
        Behaviour::reply("Here are some options."),
        Behaviour::Fail,
        sample_catalog(),
        vec![profile("u-energy", &["energy"], &[], &[])],
    );

    let outcome = harness
        .assistant
        .handle(&request_for("u-energy", "Give me a product list for energy"))
        .await;
    let response = outcome.response;

    assert_eq!(response.intent.search_gate, SearchGate::ExplicitRequest);
    assert!(
        harness
            .catalog
            .calls()
            .iter()
            .any(|call| call.starts_with("tags:") && call.contains("energy")),
        "expected an energy tag search, got {:?}",
        harness.catalog.calls()
    );
    assert!(!response.recommended_products.is_empty());
}

#[tokio::test]
async fn test_deficiency_always_searches() {
    let harness = TestHarness::new(
        Behaviour::reply("Low iron is common; a blood test can confirm it."),
        Behaviour::Fail,
        sample_catalog(),
    );

    let outcome = harness
        .assistant
        .handle(&ChatRequest::new("I think I have an iron deficiency"))
        .await;

    assert!(outcome.response.intent.deficiency_intent);
    assert!(
        outcome
            .response
            .recommended_products
            .iter()
            .any(|r| r.product.variant_id.as_str() == "iron")
    );
}

#[tokio::test]
async fn test_small_talk_does_not_search() {
    let harness = TestHarness::new(Behaviour::reply("Hello! How can I help?"), Behaviour::Fail, sample_catalog());

    let outcome = harness.assistant.handle(&ChatRequest::new("Hello there")).await;

    assert_eq!(outcome.response.intent.search_gate, SearchGate::NoSignal);
    assert!(harness.catalog.calls().is_empty());
    assert!(!outcome.response.has_products());
}

// =============================================================================
// Dietary filtering
// =============================================================================

#[tokio::test]
async fn test_halal_requirement_fails_open() {
    let harness = TestHarness::with_profiles(
        Behaviour::reply("Magnesium in the evening can help."),
        Behaviour::Fail,
        sample_catalog(),
        vec![profile("u-halal", &[], &[], &["halal"])],
    );

    let outcome = harness
        .assistant
        .handle(&request_for("u-halal", "Recommend supplements for sleep"))
        .await;

    assert!(outcome.response.intent.dietary.require_halal);
    assert!(
        !outcome.response.recommended_products.is_empty(),
        "no halal-tagged product exists, so the unfiltered set is kept"
    );
}

#[tokio::test]
async fn test_gluten_tagged_product_is_excluded() {
    let catalog = InMemoryCatalog::with_products(vec![
        product("sleep-gluten", "Sleep Blend", &["sleep", "gluten"]),
        product("sleep-free", "Sleep Blend GF", &["sleep", "gluten-free"]),
    ]);
    let harness = TestHarness::with_profiles(
        Behaviour::reply("A consistent routine helps."),
        Behaviour::Fail,
        catalog,
        vec![profile("u-celiac", &[], &["gluten"], &[])],
    );

    let outcome = harness
        .assistant
        .handle(&request_for("u-celiac", "Recommend supplements for sleep"))
        .await;
    let ids: Vec<&str> = outcome
        .response
        .recommended_products
        .iter()
        .map(|r| r.product.variant_id.as_str())
        .collect();

    assert!(ids.contains(&"sleep-free"));
    assert!(!ids.contains(&"sleep-gluten"));
}

// =============================================================================
// Failover
// =============================================================================

#[tokio::test]
async fn test_both_providers_open_makes_no_calls() {
    let harness = TestHarness::new(
        Behaviour::reply("unused"),
        Behaviour::reply("unused"),
        sample_catalog(),
    );
    let now = Utc::now();
    let tracker = harness.assistant.tracker();
    tracker.open(ProviderId::A, Some(Duration::from_secs(120)), now).await;
    tracker.open(ProviderId::B, Some(Duration::from_secs(120)), now).await;

    let outcome = harness
        .assistant
        .handle(&ChatRequest::new("How can I sleep better?"))
        .await;

    assert_eq!(harness.provider_a.calls(), 0);
    assert_eq!(harness.provider_b.calls(), 0);
    assert_eq!(outcome.response.provider, ReplySource::Template);
    assert!(!outcome.response.reply.trim().is_empty());
    assert!(outcome.health_check.is_some());
}

#[tokio::test]
async fn test_non_quota_failure_falls_back_without_opening() {
    let harness = TestHarness::new(
        Behaviour::Fail,
        Behaviour::reply("Try magnesium in the evening."),
        sample_catalog(),
    );

    let outcome = harness
        .assistant
        .handle(&ChatRequest::new("How can I sleep better?"))
        .await;

    assert_eq!(outcome.response.provider, ReplySource::Provider(ProviderId::B));
    assert_eq!(harness.provider_a.calls(), 1);
    assert!(!harness.assistant.tracker().is_open(ProviderId::A).await);
    assert!(outcome.health_check.is_none());
}

#[tokio::test]
async fn test_quota_cooldown_holds_until_probe_succeeds() {
    let harness = TestHarness::new(
        Behaviour::Quota(Some(Duration::from_secs(3600))),
        Behaviour::reply("Sleep hygiene matters most."),
        sample_catalog(),
    );
    let request = ChatRequest::new("How can I sleep better?");

    let first = harness.assistant.handle(&request).await;
    assert_eq!(first.response.provider, ReplySource::Provider(ProviderId::B));
    assert!(harness.assistant.tracker().is_open(ProviderId::A).await);

    // The primary stays skipped while open.
    let second = harness.assistant.handle(&request).await;
    assert_eq!(harness.provider_a.calls(), 1);
    assert_eq!(second.response.provider, ReplySource::Provider(ProviderId::B));

    // The deferred pass probes A, which is still down.
    let outcomes = first.health_check.expect("health pass scheduled").run().await;
    assert!(outcomes.contains(&(ProviderId::A, ProbeOutcome::StillFailing)));
    assert!(outcomes.contains(&(ProviderId::B, ProbeOutcome::NotOpen)));

    // A recovers, but probing is throttled for the health interval.
    harness.provider_a.set_healthy(true);
    harness.provider_a.set_behaviour(Behaviour::reply("Back online."));
    let scheduler = HealthScheduler::new(
        harness.assistant.tracker().clone(),
        vec![Arc::clone(&harness.provider_a) as Arc<dyn CompletionProvider>],
        Arc::new(MemorySink::default()),
    );
    let now = Utc::now();
    assert_eq!(
        scheduler.run_at(now).await,
        vec![(ProviderId::A, ProbeOutcome::Throttled)]
    );
    assert_eq!(
        scheduler.run_at(now + TimeDelta::minutes(11)).await,
        vec![(ProviderId::A, ProbeOutcome::Recovered)]
    );
    assert_eq!(harness.provider_a.probes(), 2);

    // Closed early, well before the hour-long hint elapsed.
    let third = harness.assistant.handle(&request).await;
    assert_eq!(third.response.provider, ReplySource::Provider(ProviderId::A));
}

#[tokio::test]
async fn test_caller_can_choose_primary() {
    let harness = TestHarness::new(
        Behaviour::reply("from A"),
        Behaviour::reply("from B"),
        sample_catalog(),
    );
    let request = ChatRequest {
        provider: Some(ProviderId::B),
        ..ChatRequest::new("Hello")
    };

    let outcome = harness.assistant.handle(&request).await;

    assert_eq!(outcome.response.reply, "from B");
    assert_eq!(harness.provider_a.calls(), 0);
}
