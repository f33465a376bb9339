//! Bounded durable buffer of encrypted observations, grouped into envelopes
//! ready for shipping.
//!
//! Observations are packed into a current `EnvelopeMaker`; once that envelope
//! would exceed `max_bytes_per_envelope` it is closed and handed to a queue of
//! envelopes awaiting `take_next_envelope`. A process-wide `max_bytes_total`
//! bound covers both the open envelope and everything still queued.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use prost::Message;

use crate::consistent_proto_store::ConsistentProtoStore;
use crate::proto::cobalt::observation::{EncryptedMessage, Envelope, PersistedObservationStore};
use crate::status::{Status, StatusCode};
use crate::types::ObservationMetadata;

use super::envelope_maker::EnvelopeMaker;

pub struct ObservationStoreConfig {
    pub max_bytes_per_observation: usize,
    pub max_bytes_per_envelope: usize,
    pub max_bytes_total: usize,
}

struct Inner {
    current: EnvelopeMaker,
    closed: VecDeque<Envelope>,
}

pub struct ObservationStore {
    config: ObservationStoreConfig,
    inner: Mutex<Inner>,
    total_bytes: AtomicUsize,
    backing_store: Option<ConsistentProtoStore>,
}

impl ObservationStore {
    pub fn new(config: ObservationStoreConfig) -> Self {
        Self::with_backing_store(config, None)
    }

    /// Constructs a store that persists its un-shipped envelopes to disk on
    /// `flush_to_disk`/`ShippingManager::shutdown`, loading any such state
    /// back in at construction. Uses the same `ConsistentProtoStore`
    /// write-tmp-then-rename protocol as the aggregate stores.
    pub fn with_backing_store(config: ObservationStoreConfig, path: Option<std::path::PathBuf>) -> Self {
        let backing_store = path.map(ConsistentProtoStore::new);
        let mut closed = VecDeque::new();
        let mut total_bytes = 0usize;
        if let Some(store) = &backing_store {
            if let Ok(persisted) = store.read::<PersistedObservationStore>() {
                for envelope in persisted.envelopes {
                    total_bytes += envelope.encoded_len();
                    closed.push_back(envelope);
                }
            }
        }
        Self {
            inner: Mutex::new(Inner {
                current: EnvelopeMaker::new(config.max_bytes_per_observation, config.max_bytes_per_envelope),
                closed,
            }),
            total_bytes: AtomicUsize::new(total_bytes),
            config,
            backing_store,
        }
    }

    /// Persists one already-encrypted observation.
    ///
    /// Closes and queues the current envelope first if this observation
    /// wouldn't otherwise fit, so callers never see a spurious `StoreFull`
    /// purely because the current envelope happened to be nearly full.
    pub fn write(&self, meta: ObservationMetadata, encrypted: EncryptedMessage) -> Result<(), Status> {
        let size = encrypted.encoded_len();
        if size > self.config.max_bytes_per_observation {
            return Err(Status::new(StatusCode::ObservationTooBig, "observation exceeds per-observation cap"));
        }
        if self.total_bytes.load(Ordering::Acquire) + size > self.config.max_bytes_total {
            return Err(Status::new(StatusCode::StoreFull, "observation store is full"));
        }

        let mut inner = self.inner.lock().expect("observation store lock poisoned");
        if inner.current.size() + size > self.config.max_bytes_per_envelope && !inner.current.is_empty() {
            let closed = inner.current.take();
            inner.closed.push_back(closed);
        }
        inner
            .current
            .accept(meta, encrypted)
            .map_err(|_| Status::new(StatusCode::StoreFull, "envelope maker rejected observation"))?;
        self.total_bytes.fetch_add(size, Ordering::AcqRel);
        Ok(())
    }

    /// Atomically removes and returns the oldest complete envelope, preferring
    /// previously-closed envelopes over the one still being filled.
    pub fn take_next_envelope(&self) -> Option<Envelope> {
        let mut inner = self.inner.lock().expect("observation store lock poisoned");
        let envelope = if let Some(closed) = inner.closed.pop_front() {
            Some(closed)
        } else if !inner.current.is_empty() {
            Some(inner.current.take())
        } else {
            None
        };
        if let Some(envelope) = &envelope {
            self.total_bytes.fetch_sub(envelope.encoded_len(), Ordering::AcqRel);
        }
        envelope
    }

    pub fn is_empty(&self) -> bool {
        self.total_bytes.load(Ordering::Acquire) == 0
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes.load(Ordering::Acquire)
    }

    /// Re-ingests an envelope that failed to ship, preserving observation
    /// order by placing it at the front of the queue, so a failed upload
    /// is retried on the next cycle without reordering what's ahead of it.
    pub fn requeue(&self, envelope: Envelope) {
        let mut inner = self.inner.lock().expect("observation store lock poisoned");
        self.total_bytes.fetch_add(envelope.encoded_len(), Ordering::AcqRel);
        inner.closed.push_front(envelope);
    }

    /// Writes every buffered envelope (open and closed) to the backing
    /// `ConsistentProtoStore`, if one was configured.
    pub fn flush_to_disk(&self) -> Result<(), Status> {
        let Some(store) = &self.backing_store else {
            return Ok(());
        };
        let mut inner = self.inner.lock().expect("observation store lock poisoned");
        let mut envelopes: Vec<Envelope> = inner.closed.iter().cloned().collect();
        if !inner.current.is_empty() {
            envelopes.push(inner.current.take());
        }
        store.write(&PersistedObservationStore { envelopes })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn meta(report_id: u32) -> ObservationMetadata {
        ObservationMetadata {
            customer_id: 1,
            project_id: 2,
            metric_id: 3,
            report_id,
            day_index: 10,
            system_profile: None,
        }
    }

    fn encrypted(bytes: usize) -> EncryptedMessage {
        EncryptedMessage {
            scheme: 0,
            ciphertext: vec![0u8; bytes],
            public_key_fingerprint: vec![],
            ephemeral_public_key: vec![],
        }
    }

    fn store(per_obs: usize, per_envelope: usize, total: usize) -> ObservationStore {
        ObservationStore::new(ObservationStoreConfig {
            max_bytes_per_observation: per_obs,
            max_bytes_per_envelope: per_envelope,
            max_bytes_total: total,
        })
    }

    #[test_log::test]
    fn envelope_size_cap_scenario() {
        // 19 x ~50 byte observations fit, a 101-byte single observation is
        // too big, and a further 65-byte observation then finds the store
        // full.
        let store = store(100, 1000, 1000);
        for _ in 0..19 {
            store.write(meta(1), encrypted(50)).expect("fits under caps");
        }
        let err = store.write(meta(1), encrypted(101)).unwrap_err();
        assert_eq!(err.code(), StatusCode::ObservationTooBig);

        let err = store.write(meta(1), encrypted(65)).unwrap_err();
        assert_eq!(err.code(), StatusCode::StoreFull);
    }

    #[test_log::test]
    fn exceeding_envelope_cap_closes_and_starts_a_new_envelope() {
        let store = store(100, 100, 10_000);
        store.write(meta(1), encrypted(60)).unwrap();
        store.write(meta(1), encrypted(60)).unwrap(); // doesn't fit in current -> closes it

        let first = store.take_next_envelope().expect("closed envelope present");
        assert_eq!(first.batch[0].encrypted_observations.len(), 1);
        let second = store.take_next_envelope().expect("current envelope present");
        assert_eq!(second.batch[0].encrypted_observations.len(), 1);
        assert!(store.take_next_envelope().is_none());
    }

    #[test_log::test]
    fn take_next_envelope_prefers_closed_over_current() {
        let store = store(100, 50, 10_000);
        store.write(meta(1), encrypted(40)).unwrap();
        store.write(meta(2), encrypted(40)).unwrap(); // closes the first
        store.write(meta(3), encrypted(10)).unwrap(); // lands in the new current

        let first = store.take_next_envelope().unwrap();
        assert_eq!(first.batch[0].meta.as_ref().unwrap().report_id, 1);
    }

    #[test_log::test]
    fn requeue_preserves_contents_for_the_next_take() {
        let store = store(100, 1000, 10_000);
        store.write(meta(1), encrypted(10)).unwrap();
        let envelope = store.take_next_envelope().unwrap();
        assert!(store.is_empty());
        store.requeue(envelope);
        assert!(!store.is_empty());
        let retaken = store.take_next_envelope().unwrap();
        assert_eq!(retaken.batch.len(), 1);
    }

    #[test_log::test]
    fn observation_exactly_at_cap_is_accepted() {
        let store = store(50, 1000, 10_000);
        store.write(meta(1), encrypted(50)).expect("exactly at cap is fine");
    }

    #[test_log::test]
    fn flush_and_reload_round_trips_through_disk() {
        let mut path = std::env::temp_dir();
        path.push(format!("cobalt-obs-store-test-{}.pb", std::process::id()));
        let store = ObservationStore::with_backing_store(
            ObservationStoreConfig {
                max_bytes_per_observation: 1000,
                max_bytes_per_envelope: 1000,
                max_bytes_total: 10_000,
            },
            Some(path.clone()),
        );
        store.write(meta(1), encrypted(10)).unwrap();
        store.flush_to_disk().expect("flushes");

        let reloaded = ObservationStore::with_backing_store(
            ObservationStoreConfig {
                max_bytes_per_observation: 1000,
                max_bytes_per_envelope: 1000,
                max_bytes_total: 10_000,
            },
            Some(path.clone()),
        );
        assert!(!reloaded.is_empty());
        let _ = std::fs::remove_file(&path);
        let mut tmp = path.clone();
        tmp.set_extension("pb.tmp");
        let mut ovr = path.clone();
        ovr.set_extension("pb.override");
        let _ = std::fs::remove_file(tmp);
        let _ = std::fs::remove_file(ovr);
    }
}
