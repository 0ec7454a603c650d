//! Hybrid secure value store.
//!
//! Layers "store any scalar value" on top of one master AES key per
//! namespace. Values are sealed with the envelope codec before they reach
//! the plain backend, so the backend only ever sees ciphertext.
//!
//! `safeguard` and `refresh` hand the encrypt-then-store work to a writer
//! task owned by the store and return a [`WriteTicket`] at once. A `withdraw`
//! issued before that ticket resolves may still see the previous value;
//! await the ticket (or [`HybridStore::flush`]) before relying on the write.

use std::str::FromStr;
use std::sync::Arc;

use keystash_core::config::{Config, MasterKeyConfig};
use keystash_core::SecretString;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{self, SecureKeyValueStore};
use crate::capability::KeyPurposes;
use crate::engine::{self, CipherEngine};
use crate::error::{KeystoreError, Result};
use crate::keygen::KeyGenSpec;
use crate::keystore::KEY_RECORD_PREFIX;
use crate::manager::KeyManager;

/// Prefix of the alias the master key lives under.
pub const MASTER_KEY_PREFIX: &str = "__master_key__";

/// Capacity of the background write queue.
const WRITE_QUEUE_CAPACITY: usize = 1000;

/// The master key alias for `namespace`.
pub fn master_key_alias(namespace: &str) -> String {
    format!("{MASTER_KEY_PREFIX}.{namespace}")
}

/// Outcome of [`HybridStore::ensure_master_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterKeyStatus {
    Created,
    AlreadyPresent,
}

/// How a queued write ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Cancelled before the writer reached it; nothing was stored.
    Cancelled,
}

/// Handle to one queued background write.
#[derive(Debug)]
pub struct WriteTicket {
    key: String,
    cancel: CancellationToken,
    done: oneshot::Receiver<Result<WriteOutcome>>,
}

impl WriteTicket {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Drop the write if the writer has not started it yet.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the writer to finish with this entry.
    pub async fn wait(self) -> Result<WriteOutcome> {
        self.done.await.map_err(|_| {
            KeystoreError::BackgroundTask(format!("writer stopped before writing {}", self.key))
        })?
    }
}

struct WriteJob {
    key: String,
    plaintext: SecretString,
    cancel: CancellationToken,
    done: oneshot::Sender<Result<WriteOutcome>>,
}

enum Job {
    Write(WriteJob),
    Flush(oneshot::Sender<()>),
}

/// State shared with the writer task.
struct Shared {
    namespace: String,
    master_alias: String,
    manager: KeyManager,
    store: Arc<dyn SecureKeyValueStore>,
}

impl Shared {
    async fn seal_and_store(&self, key: &str, plaintext: &str) -> Result<()> {
        let envelope = self
            .manager
            .encrypt(&self.master_alias, plaintext.as_bytes())
            .await?;
        self.store.store(key, &envelope).await
    }
}

/// Encrypting facade over a plain secure key-value backend.
pub struct HybridStore {
    shared: Arc<Shared>,
    master: MasterKeyConfig,
    jobs: mpsc::Sender<Job>,
    writer: JoinHandle<()>,
}

impl HybridStore {
    /// Open the store described by `config`.
    pub async fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let store = backend::open(config)?;
        let engine = engine::for_kind(config.engine);
        Self::new(store, engine, &config.namespace, config.master_key.clone()).await
    }

    /// Build a store over `store` and make sure the namespace's master key exists.
    ///
    /// Must be called inside a Tokio runtime; the writer task is spawned here.
    pub async fn new(
        store: Arc<dyn SecureKeyValueStore>,
        engine: Arc<dyn CipherEngine>,
        namespace: &str,
        master: MasterKeyConfig,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            namespace: namespace.to_string(),
            master_alias: master_key_alias(namespace),
            manager: KeyManager::software(store.clone(), engine),
            store,
        });

        let (jobs, rx) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        let writer = tokio::spawn(run_writer(shared.clone(), rx));

        let hybrid = Self {
            shared,
            master,
            jobs,
            writer,
        };
        let status = hybrid.ensure_master_key().await?;
        debug!(namespace, ?status, "hybrid store ready");
        Ok(hybrid)
    }

    pub fn namespace(&self) -> &str {
        &self.shared.namespace
    }

    /// The key manager the master key lives in.
    pub fn manager(&self) -> &KeyManager {
        &self.shared.manager
    }

    /// Create the master key unless one already exists.
    ///
    /// An existing key is trusted as-is; its parameters are not compared
    /// against the configured ones.
    pub async fn ensure_master_key(&self) -> Result<MasterKeyStatus> {
        let spec = KeyGenSpec::symmetric(
            self.master.key_size,
            self.master.block_mode,
            self.master.padding,
        )?;
        let alias = &self.shared.master_alias;
        match self
            .shared
            .manager
            .generate_key(alias, &spec, KeyPurposes::encrypt_decrypt())
            .await
        {
            Ok(_) => {
                info!(namespace = %self.shared.namespace, "created master key");
                Ok(MasterKeyStatus::Created)
            }
            Err(KeystoreError::AliasAlreadyTaken(_)) => Ok(MasterKeyStatus::AlreadyPresent),
            Err(e) => Err(e),
        }
    }

    /// Encrypt `value` and store it under `key` in the background.
    ///
    /// Only strings, numbers and booleans are accepted.
    pub async fn safeguard<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<WriteTicket> {
        self.check_key(key)?;
        let plaintext = scalar_text(value)?;
        self.enqueue(key, plaintext).await
    }

    /// Read and decrypt the value under `key`, `None` if absent.
    pub async fn withdraw(&self, key: &str) -> Result<Option<SecretString>> {
        self.check_key(key)?;
        let Some(envelope) = self.shared.store.retrieve(key).await? else {
            return Ok(None);
        };
        let plaintext = self
            .shared
            .manager
            .decrypt(&self.shared.master_alias, &envelope)
            .await?;
        let text = std::str::from_utf8(plaintext.expose_secret()).map_err(|e| {
            KeystoreError::DecryptionFailed(format!("value under {key} is not UTF-8: {e}"))
        })?;
        Ok(Some(SecretString::new(text)))
    }

    /// [`HybridStore::withdraw`] parsed into `T`.
    pub async fn withdraw_as<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.withdraw(key).await? {
            Some(text) => text.expose_secret().parse().map(Some).map_err(|e| {
                KeystoreError::UnsupportedType(format!("value under {key} does not parse: {e}"))
            }),
            None => Ok(None),
        }
    }

    /// Replace the value under an existing `key`.
    pub async fn refresh<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<WriteTicket> {
        self.require_stored(key).await?;
        let plaintext = scalar_text(value)?;
        self.enqueue(key, plaintext).await
    }

    /// Delete the value under an existing `key`.
    pub async fn remove(&self, key: &str) -> Result<()> {
        self.require_stored(key).await?;
        self.shared.store.remove(key).await?;
        debug!(key, "removed value");
        Ok(())
    }

    pub async fn contains(&self, key: &str) -> Result<bool> {
        self.check_key(key)?;
        self.shared.store.has_key_stored(key).await
    }

    /// Wait until every write queued before this call has finished.
    pub async fn flush(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.jobs
            .send(Job::Flush(ack))
            .await
            .map_err(|_| writer_gone())?;
        done.await.map_err(|_| writer_gone())
    }

    /// Finish queued writes and stop the writer.
    pub async fn shutdown(self) -> Result<()> {
        let Self { jobs, writer, .. } = self;
        drop(jobs);
        writer
            .await
            .map_err(|e| KeystoreError::BackgroundTask(e.to_string()))
    }

    fn check_key(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(KeystoreError::InvalidName("key must not be empty".to_string()));
        }
        if key == self.shared.master_alias {
            return Err(KeystoreError::InvalidName(format!(
                "{key} is reserved for the master key"
            )));
        }
        if key.starts_with(KEY_RECORD_PREFIX) {
            return Err(KeystoreError::InvalidName(format!(
                "{key} falls in the key record namespace"
            )));
        }
        Ok(())
    }

    async fn require_stored(&self, key: &str) -> Result<()> {
        if self.contains(key).await? {
            Ok(())
        } else {
            Err(KeystoreError::KeyNotStored(key.to_string()))
        }
    }

    async fn enqueue(&self, key: &str, plaintext: String) -> Result<WriteTicket> {
        let cancel = CancellationToken::new();
        let (done, rx) = oneshot::channel();
        let job = WriteJob {
            key: key.to_string(),
            plaintext: SecretString::new(plaintext),
            cancel: cancel.clone(),
            done,
        };
        self.jobs
            .send(Job::Write(job))
            .await
            .map_err(|_| writer_gone())?;
        debug!(key, "queued write");
        Ok(WriteTicket {
            key: key.to_string(),
            cancel,
            done: rx,
        })
    }
}

fn writer_gone() -> KeystoreError {
    KeystoreError::BackgroundTask("writer task is not running".to_string())
}

async fn run_writer(shared: Arc<Shared>, mut jobs: mpsc::Receiver<Job>) {
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Write(job) => {
                if job.cancel.is_cancelled() {
                    debug!(key = %job.key, "dropped cancelled write");
                    let _ = job.done.send(Ok(WriteOutcome::Cancelled));
                    continue;
                }
                let result = shared
                    .seal_and_store(&job.key, job.plaintext.expose_secret())
                    .await
                    .map(|()| WriteOutcome::Written);
                if let Err(e) = &result {
                    warn!(key = %job.key, error = %e, "background write failed");
                }
                let _ = job.done.send(result);
            }
            Job::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!(namespace = %shared.namespace, "writer stopped");
}

/// Canonical text of a scalar value.
fn scalar_text<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(KeystoreError::UnsupportedType("null".to_string())),
        Value::Array(_) => Err(KeystoreError::UnsupportedType("array".to_string())),
        Value::Object(_) => Err(KeystoreError::UnsupportedType("object".to_string())),
    }
}
