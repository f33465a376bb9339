//! Background worker that periodically drains the `ObservationStore`,
//! encrypts each envelope to the shuffler's public key, and uploads it over
//! gRPC, retrying transient failures with exponential backoff.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use prost::Message;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::proto::cobalt::observation::EncryptedMessage;
use crate::status::Status;

use super::encryption::Encrypter;
use super::observation_store::ObservationStore;
use super::observation_writer::ObservationStoreUpdateRecipient;

type StdError = Box<dyn std::error::Error + Send + Sync + 'static>;

const BACKOFF_INITIAL: Duration = Duration::from_millis(10);
const BACKOFF_CEILING: Duration = Duration::from_secs(5);
const PER_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 11;

/// Whether a failed upload is worth retrying: `Aborted`/`Cancelled`/
/// `DeadlineExceeded`/`Internal`/`Unavailable` are retryable, everything
/// else (notably `InvalidArgument`) fails fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadError {
    Retryable,
    Terminal,
}

/// Ships one already-encrypted envelope to the shuffler. Implemented over a
/// generic gRPC channel below; tests use a fake that records calls.
pub trait Uploader: Send + Sync {
    fn upload<'a>(
        &'a self,
        envelope: &'a EncryptedMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + 'a>>;
}

/// Sends envelopes to a `cobalt.shuffler.Shuffler` service over any channel
/// implementing `tonic::client::GrpcService`, via a generic `TChannel`
/// client wrapper.
pub struct GrpcUploader<TChannel> {
    client: Mutex<super::super::proto::cobalt::shuffler::shuffler_client::ShufflerClient<TChannel>>,
}

impl<TChannel> GrpcUploader<TChannel> {
    pub fn new(client: super::super::proto::cobalt::shuffler::shuffler_client::ShufflerClient<TChannel>) -> Self {
        Self { client: Mutex::new(client) }
    }
}

impl<TChannel> Uploader for GrpcUploader<TChannel>
where
    TChannel: tonic::client::GrpcService<tonic::body::Body> + Send + Sync + 'static,
    TChannel::Error: Into<StdError>,
    TChannel::ResponseBody: http_body::Body<Data = bytes::Bytes> + Send + 'static,
    <TChannel::ResponseBody as http_body::Body>::Error: Into<StdError> + Send,
    TChannel::Future: Send,
{
    fn upload<'a>(
        &'a self,
        envelope: &'a EncryptedMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), UploadError>> + Send + 'a>> {
        Box::pin(async move {
            use crate::proto::cobalt::shuffler::SubmitEnvelopeRequest;

            let mut client = self.client.lock().await;
            let request = SubmitEnvelopeRequest { encrypted_envelope: Some(envelope.clone()) };
            match client.submit_envelope(request).await {
                Ok(_) => Ok(()),
                Err(status) => Err(classify(status.code())),
            }
        })
    }
}

fn classify(code: tonic::Code) -> UploadError {
    match code {
        tonic::Code::Aborted
        | tonic::Code::Cancelled
        | tonic::Code::DeadlineExceeded
        | tonic::Code::Internal
        | tonic::Code::Unavailable => UploadError::Retryable,
        _ => UploadError::Terminal,
    }
}

pub struct ShippingManagerConfig {
    pub send_interval: Duration,
    pub min_interval: Duration,
}

pub struct ShippingManager {
    store: Arc<ObservationStore>,
    encrypter: Arc<dyn Encrypter>,
    uploader: Arc<dyn Uploader>,
    config: ShippingManagerConfig,
    send_soon: Arc<Notify>,
    idle: Arc<Notify>,
    shutdown: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ShippingManager {
    /// Constructs the manager and immediately spawns its worker task onto
    /// the current tokio runtime, a second long-lived worker owned by the
    /// ShippingManager.
    pub fn start(
        store: Arc<ObservationStore>,
        encrypter: Arc<dyn Encrypter>,
        uploader: Arc<dyn Uploader>,
        config: ShippingManagerConfig,
    ) -> Arc<Self> {
        let manager = Arc::new(Self {
            store,
            encrypter,
            uploader,
            config,
            send_soon: Arc::new(Notify::new()),
            idle: Arc::new(Notify::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            worker: Mutex::new(None),
        });
        let handle = tokio::spawn(manager.clone().run());
        // `try_lock` always succeeds here: the worker is freshly spawned and
        // cannot have taken this same lock yet.
        *manager.worker.try_lock().expect("fresh manager has no contenders") = Some(handle);
        manager
    }

    /// Wakes the worker within `min_interval` instead of waiting out the
    /// full `send_interval`.
    pub fn request_send_soon(&self) {
        self.send_soon.notify_one();
    }

    /// Blocks until the store has drained or `deadline` elapses.
    pub async fn wait_until_idle(&self, deadline: Instant) {
        loop {
            if self.store.is_empty() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            tokio::select! {
                _ = self.idle.notified() => {}
                _ = tokio::time::sleep(deadline - now) => return,
            }
        }
    }

    /// Waits for the store to drain (up to `deadline`), then stops the
    /// worker and flushes whatever remains to disk.
    pub async fn shutdown(&self, deadline: Instant) {
        self.wait_until_idle(deadline).await;
        self.shutdown.store(true, Ordering::Release);
        self.shutdown_notify.notify_waiters();
        if let Some(handle) = self.worker.lock().await.take() {
            let _ = handle.await;
        }
        if let Err(status) = self.store.flush_to_disk() {
            log::error!("failed to flush observation store on shutdown: {status}");
        }
    }

    async fn run(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.shutdown_notify.notified() => return,
                _ = tokio::time::sleep(self.config.send_interval) => {}
                _ = self.send_soon.notified() => {
                    tokio::time::sleep(self.config.min_interval).await;
                }
            }
            if self.shutdown.load(Ordering::Acquire) {
                return;
            }
            self.drain_once().await;
        }
    }

    async fn drain_once(&self) {
        let Some(envelope) = self.store.take_next_envelope() else {
            self.idle.notify_waiters();
            return;
        };
        let plaintext = envelope.encode_to_vec();
        let encrypted = match self.encrypter.encrypt(&plaintext) {
            Ok(e) => e,
            Err(status) => {
                log::error!("failed to encrypt envelope for shipping: {status}");
                return;
            }
        };

        let mut backoff = BACKOFF_INITIAL;
        for attempt in 1..=MAX_ATTEMPTS {
            let outcome = tokio::time::timeout(PER_ATTEMPT_TIMEOUT, self.uploader.upload(&encrypted)).await;
            match outcome {
                Ok(Ok(())) => {
                    if self.store.is_empty() {
                        self.idle.notify_waiters();
                    }
                    return;
                }
                Ok(Err(UploadError::Terminal)) => {
                    log::error!("envelope upload failed with a non-retryable error; dropping");
                    return;
                }
                Ok(Err(UploadError::Retryable)) | Err(_) => {
                    if attempt == MAX_ATTEMPTS {
                        log::error!("envelope upload exhausted {MAX_ATTEMPTS} attempts; dropping");
                        return;
                    }
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(BACKOFF_CEILING);
                }
            }
        }
    }
}

impl ObservationStoreUpdateRecipient for ShippingManager {
    fn notify_observations_added(&self) {
        self.request_send_soon();
    }
}
