mod common;

use std::sync::Arc;

use serde_json::json;
use tokenwarden_auth::prelude::*;
use tokenwarden_auth::{FixedClock, PayloadValidator};
use tokenwarden_storage_memory::Storage;

use common::{NOW, RecordingStorage, StubSigner, Write, harness, scenario_claims};

fn refresh_validator() -> PayloadValidator {
    PayloadValidator::new(Arc::new(FixedClock::at(NOW))).with_refresh_ttl(None)
}

#[tokio::test]
async fn scenario_a_blacklist_entry_outlives_expiry_by_one_minute() {
    let clock = Arc::new(FixedClock::at(NOW));
    let storage = RecordingStorage::new();
    let blacklist = Blacklist::new(storage.clone(), clock.clone()).with_refresh_ttl(Some(60));
    let payload = Payload::new(scenario_claims(NOW + 3600), &refresh_validator(), false).unwrap();

    assert!(blacklist.add(&payload).await.unwrap());
    assert_eq!(
        storage.writes(),
        vec![Write {
            key: "foo".to_string(),
            value: json!({"valid_until": NOW}),
            minutes: Some(61),
        }]
    );
}

#[tokio::test]
async fn scenario_a_refresh_window_extends_entry_lifetime() {
    let clock = Arc::new(FixedClock::at(NOW));
    let storage = RecordingStorage::new();
    let blacklist = Blacklist::new(storage.clone(), clock).with_grace_period(15);
    let payload = Payload::new(scenario_claims(NOW + 3600), &refresh_validator(), false).unwrap();

    blacklist.add(&payload).await.unwrap();

    let write = &storage.writes()[0];
    assert_eq!(write.minutes, Some(20_160 + 1));
    assert_eq!(write.value, json!({"valid_until": NOW + 15}));
}

#[tokio::test]
async fn scenario_b_dead_token_is_not_blacklisted() {
    let clock = Arc::new(FixedClock::at(NOW));
    let storage = RecordingStorage::new();
    let blacklist = Blacklist::new(storage.clone(), clock);

    // issued just over two weeks ago, expired an hour ago
    let mut claims = scenario_claims(NOW - 3600);
    claims.put(Claim::issued_at(NOW - 20_160 * 60 - 1));
    claims.put(Claim::not_before(NOW - 20_160 * 60 - 1));
    let payload = Payload::new(claims, &refresh_validator(), true).unwrap();

    assert!(!blacklist.add(&payload).await.unwrap());
    assert!(storage.writes().is_empty());
    assert!(!blacklist.has(&payload).await.unwrap());
}

#[tokio::test]
async fn scenario_c_non_numeric_exp_fails_before_temporal_checks() {
    let err = Claim::new("exp", "1234567").unwrap_err();
    assert!(matches!(err, AuthError::InvalidClaim { ref claim, .. } if claim == "exp"));

    // the same value arriving on the wire is rejected while decoding
    let h = harness(&JwtConfig::default());
    let token = StubSigner::raw_token(&json!({
        "sub": 1,
        "iss": "http://example.com",
        "exp": "1234567",
        "nbf": NOW,
        "iat": NOW,
        "jti": "foo",
    }));
    let err = h.manager.decode(&token, true).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidClaim { .. }));
}

#[tokio::test]
async fn scenario_d_refresh_keeps_expiry_schedule() {
    let h = harness(&JwtConfig::default());
    let payload = h.manager.factory().make(scenario_claims(NOW + 3600), false).unwrap();
    let token = h.manager.encode(&payload).unwrap();

    h.clock.advance(600);
    let refreshed = h.manager.refresh(&token, false).await.unwrap();
    let new = h.manager.decode(&refreshed, true).await.unwrap();

    assert_eq!(new.expiration(), Some(NOW + 3600 + 3600));
    assert_ne!(new.jwt_id(), Some(&json!("foo")));
    assert_eq!(new.subject(), Some(&json!(1)));
    assert_eq!(new.issued_at(), Some(NOW));

    assert!(h.storage.get("foo").await.unwrap().is_some());
    assert!(matches!(
        h.manager.decode(&token, true).await,
        Err(AuthError::TokenBlacklisted)
    ));
}

#[tokio::test]
async fn scenario_e_forever_sentinel_is_always_blacklisted() {
    let h = harness(&JwtConfig::default());
    h.storage.forever("foo", json!("forever")).await.unwrap();
    let payload = h.manager.factory().make(scenario_claims(NOW + 3600), false).unwrap();

    assert!(h.manager.blacklist().has(&payload).await.unwrap());
    h.clock.set(0);
    assert!(h.manager.blacklist().has(&payload).await.unwrap());
    h.clock.set(i64::from(u32::MAX));
    assert!(h.manager.blacklist().has(&payload).await.unwrap());
}

#[tokio::test]
async fn decode_of_encode_round_trips_claims() {
    let h = harness(&JwtConfig::default());
    let payload = h
        .manager
        .factory()
        .make(
            scenario_claims(NOW + 3600).with(Claim::new("roles", json!(["a", "b"])).unwrap()),
            false,
        )
        .unwrap();

    let token = h.manager.encode(&payload).unwrap();
    let decoded = h.manager.decode(&token, true).await.unwrap();
    assert_eq!(decoded, payload);
    assert_eq!(decoded.to_map(), payload.to_map());
}

#[tokio::test]
async fn blacklist_lookup_is_idempotent() {
    let h = harness(&JwtConfig::default());
    let payload = h.manager.factory().make(scenario_claims(NOW + 3600), false).unwrap();
    let blacklist = h.manager.blacklist();

    for _ in 0..3 {
        assert!(!blacklist.has(&payload).await.unwrap());
    }
    blacklist.add(&payload).await.unwrap();
    for _ in 0..3 {
        assert!(blacklist.has(&payload).await.unwrap());
    }
}
