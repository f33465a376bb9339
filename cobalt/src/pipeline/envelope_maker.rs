//! In-memory builder that groups observations by metadata into batches, under
//! a per-observation and a per-envelope size cap.

use std::collections::HashMap;

use prost::Message;

use crate::proto::cobalt::observation::{Batch, EncryptedMessage, Envelope, ObservationMetadata as WireMetadata};
use crate::status::{Status, StatusCode};
use crate::types::ObservationMetadata;

/// Keyed batch accumulator. Insertion order of distinct metadata keys is
/// preserved so the resulting `Envelope`'s batch list doesn't reorder across
/// calls to `accept`.
pub struct EnvelopeMaker {
    max_bytes_per_observation: usize,
    max_bytes_per_envelope: usize,
    order: Vec<ObservationMetadata>,
    batches: HashMap<ObservationMetadata, Vec<EncryptedMessage>>,
    total_bytes: usize,
}

impl EnvelopeMaker {
    pub fn new(max_bytes_per_observation: usize, max_bytes_per_envelope: usize) -> Self {
        Self {
            max_bytes_per_observation,
            max_bytes_per_envelope,
            order: Vec::new(),
            batches: HashMap::new(),
            total_bytes: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.total_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Accepts one already-encrypted observation into this envelope.
    ///
    /// A too-big observation is rejected before it can affect `total_bytes`,
    /// and the envelope-level total cap is checked against `total_bytes` so
    /// the size invariant (`bytes(envelope) <= max_bytes_per_envelope`) holds
    /// after every accepted call.
    pub fn accept(&mut self, meta: ObservationMetadata, encrypted: EncryptedMessage) -> Result<(), Status> {
        let size = encrypted.encoded_len();
        if size > self.max_bytes_per_observation {
            return Err(Status::new(StatusCode::ObservationTooBig, "observation exceeds per-observation cap"));
        }
        if self.total_bytes + size > self.max_bytes_per_envelope {
            return Err(Status::new(StatusCode::StoreFull, "envelope is at its byte cap"));
        }
        let batch = self.batches.entry(meta.clone()).or_insert_with(|| {
            self.order.push(meta);
            Vec::new()
        });
        batch.push(encrypted);
        self.total_bytes += size;
        Ok(())
    }

    /// Moves every batch of `other` into `self`.
    ///
    /// The original implementation reverses the order of the merged-in
    /// envelope's observations when appending into a matching batch, which
    /// reads as an implementation artifact rather than a deliberate
    /// contract, so this merge is order-preserving instead: a batch that
    /// exists in both envelopes keeps `self`'s observations first, followed
    /// by `other`'s in their original order.
    pub fn merge_with(&mut self, mut other: EnvelopeMaker) {
        for meta in std::mem::take(&mut other.order) {
            if let Some(mut incoming) = other.batches.remove(&meta) {
                let incoming_bytes: usize = incoming.iter().map(|m| m.encoded_len()).sum();
                let batch = self.batches.entry(meta.clone()).or_insert_with(|| {
                    self.order.push(meta);
                    Vec::new()
                });
                batch.append(&mut incoming);
                self.total_bytes += incoming_bytes;
            }
        }
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.batches.clear();
        self.total_bytes = 0;
    }

    /// Returns the accumulated envelope and resets this builder to empty.
    pub fn take(&mut self) -> Envelope {
        let batch = self
            .order
            .drain(..)
            .filter_map(|meta| {
                self.batches.remove(&meta).map(|encrypted_observations| Batch {
                    meta: Some(meta.into()),
                    encrypted_observations,
                })
            })
            .collect();
        self.total_bytes = 0;
        Envelope { batch }
    }
}

impl From<ObservationMetadata> for WireMetadata {
    fn from(value: ObservationMetadata) -> Self {
        WireMetadata {
            customer_id: value.customer_id,
            project_id: value.project_id,
            metric_id: value.metric_id,
            report_id: value.report_id,
            day_index: value.day_index,
            system_profile: value.system_profile.map(Into::into),
        }
    }
}
