//! Shared collaborators for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokenwarden_auth::prelude::*;
use tokenwarden_auth::{DynClock, FixedClock};
use tokenwarden_storage::{StorageError, StorageResult};
use tokenwarden_storage_memory::{InMemoryStorage, Storage};

pub const NOW: i64 = 1_700_000_000;

/// A storage write as seen by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub key: String,
    pub value: Value,
    pub minutes: Option<u64>,
}

/// In-memory storage that records writes and can be told to fail them.
#[derive(Debug, Default)]
pub struct RecordingStorage {
    inner: InMemoryStorage,
    writes: Mutex<Vec<Write>>,
    fail_writes: AtomicBool,
}

impl RecordingStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn record(&self, key: &str, value: &Value, minutes: Option<u64>) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::connection_error("storage is down"));
        }
        self.writes.lock().unwrap().push(Write {
            key: key.to_string(),
            value: value.clone(),
            minutes,
        });
        Ok(())
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn add(&self, key: &str, value: Value, minutes: u64) -> StorageResult<()> {
        self.record(key, &value, Some(minutes))?;
        self.inner.add(key, value, minutes).await
    }

    async fn forever(&self, key: &str, value: Value) -> StorageResult<()> {
        self.record(key, &value, None)?;
        self.inner.forever(key, value).await
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        self.inner.get(key).await
    }

    async fn destroy(&self, key: &str) -> StorageResult<bool> {
        self.inner.destroy(key).await
    }

    async fn flush(&self) -> StorageResult<()> {
        self.inner.flush().await
    }
}

/// How [`StubSigner`] behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubMode {
    Working,
    FailEncode,
    RejectSignature,
}

/// Unsigned signer: `stub.<hex json>.sig`.
#[derive(Debug)]
pub struct StubSigner {
    mode: Mutex<StubMode>,
}

impl StubSigner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(StubMode::Working),
        })
    }

    pub fn set_mode(&self, mode: StubMode) {
        *self.mode.lock().unwrap() = mode;
    }

    /// Encodes any JSON object, bypassing claim validation.
    pub fn raw_token(claims: &Value) -> Token {
        Token::new(format!("stub.{}.sig", hex::encode(claims.to_string()))).unwrap()
    }
}

impl Signer for StubSigner {
    fn encode(&self, claims: &Map<String, Value>) -> Result<String, SignerError> {
        if *self.mode.lock().unwrap() == StubMode::FailEncode {
            return Err(SignerError::encoding("stub refused to encode"));
        }
        let body = serde_json::to_string(claims).map_err(|e| SignerError::encoding(e.to_string()))?;
        Ok(format!("stub.{}.sig", hex::encode(body)))
    }

    fn decode(&self, token: &str) -> Result<Map<String, Value>, SignerError> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header, body, signature] = parts.as_slice() else {
            return Err(SignerError::malformed("expected three segments"));
        };
        if *header != "stub" {
            return Err(SignerError::malformed("unknown header"));
        }
        if *signature != "sig" || *self.mode.lock().unwrap() == StubMode::RejectSignature {
            return Err(SignerError::InvalidSignature);
        }
        let bytes = hex::decode(body).map_err(|e| SignerError::malformed(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| SignerError::malformed(e.to_string()))
    }
}

pub struct User {
    pub id: Value,
}

impl Subject for User {
    fn identifier(&self) -> Value {
        self.id.clone()
    }

    fn custom_claims(&self) -> Map<String, Value> {
        let mut claims = Map::new();
        claims.insert("tenant".to_string(), json!("acme"));
        claims
    }

    fn provider(&self) -> &str {
        "users"
    }
}

pub fn user() -> User {
    User { id: json!(1) }
}

/// Everything a test needs to drive a manager.
pub struct Harness {
    pub clock: Arc<FixedClock>,
    pub storage: Arc<RecordingStorage>,
    pub signer: Arc<StubSigner>,
    pub manager: TokenManager,
}

pub fn harness(config: &JwtConfig) -> Harness {
    let clock = Arc::new(FixedClock::at(NOW));
    let storage = RecordingStorage::new();
    let signer = StubSigner::new();
    let manager = TokenManager::from_config(
        config,
        signer.clone(),
        storage.clone(),
        clock.clone() as DynClock,
    );
    Harness {
        clock,
        storage,
        signer,
        manager,
    }
}

/// The claim set used throughout the scenarios.
pub fn scenario_claims(exp: i64) -> ClaimSet {
    ClaimSet::new()
        .with(Claim::subject(1).unwrap())
        .with(Claim::issuer("http://example.com").unwrap())
        .with(Claim::expiration(exp))
        .with(Claim::not_before(NOW))
        .with(Claim::issued_at(NOW))
        .with(Claim::jwt_id("foo").unwrap())
}
