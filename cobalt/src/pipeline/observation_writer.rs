//! Glue between the Encoder and the ObservationStore: the only path by which
//! an encoded observation becomes durable.

use std::sync::Arc;

use prost::Message;

use crate::status::{Status, StatusCode};
use crate::types::{Observation, ObservationMetadata};

use super::encryption::Encrypter;
use super::observation_store::ObservationStore;

/// Notified after a successful `ObservationWriter::write`. `ShippingManager`
/// implements this so it can wake its background worker instead of waiting
/// out the full `send_interval`.
pub trait ObservationStoreUpdateRecipient: Send + Sync {
    fn notify_observations_added(&self);
}

/// A recipient that does nothing, for callers that don't need to react to
/// new observations (tests, or a writer used before a ShippingManager exists).
pub struct NoopUpdateRecipient;

impl ObservationStoreUpdateRecipient for NoopUpdateRecipient {
    fn notify_observations_added(&self) {}
}

pub struct ObservationWriter {
    encrypter: Arc<dyn Encrypter>,
    store: Arc<ObservationStore>,
    recipient: Arc<dyn ObservationStoreUpdateRecipient>,
    too_big_counter: Arc<crate::util::RateLimitedLogger>,
}

impl ObservationWriter {
    pub fn new(
        encrypter: Arc<dyn Encrypter>,
        store: Arc<ObservationStore>,
        recipient: Arc<dyn ObservationStoreUpdateRecipient>,
    ) -> Self {
        Self {
            encrypter,
            store,
            recipient,
            too_big_counter: Arc::new(crate::util::RateLimitedLogger::new(10)),
        }
    }

    /// Serializes `observation` to wire bytes, optionally wraps it in a
    /// `HYBRID_ECDH_V1` envelope to the analyzer public key (or leaves it in
    /// the clear under scheme `NONE`), and hands it to the `ObservationStore`.
    /// Notifies the registered recipient on success and also on `StoreFull`,
    /// so the ShippingManager wakes and drains space even though this
    /// particular observation was dropped.
    pub fn write(&self, observation: Observation, metadata: ObservationMetadata) -> Result<(), Status> {
        let wire: crate::proto::cobalt::observation::Observation = (&observation).into();
        let plaintext = wire.encode_to_vec();
        let encrypted = self.encrypter.encrypt(&plaintext)?;

        match self.store.write(metadata, encrypted) {
            Ok(()) => {
                self.recipient.notify_observations_added();
                Ok(())
            }
            Err(status) if status.code() == StatusCode::StoreFull => {
                self.recipient.notify_observations_added();
                Err(status)
            }
            Err(status) if status.code() == StatusCode::ObservationTooBig => {
                self.too_big_counter.warn(status.message());
                Err(status)
            }
            Err(status) => Err(status),
        }
    }
}

impl From<&Observation> for crate::proto::cobalt::observation::Observation {
    fn from(value: &Observation) -> Self {
        use crate::proto::cobalt::observation as wire;

        let inner = match value {
            Observation::Forculus { ciphertext, point_x, point_y } => {
                wire::observation::Value::Forculus(wire::ForculusObservation {
                    ciphertext: ciphertext.clone(),
                    point_x: point_x.clone(),
                    point_y: point_y.clone(),
                })
            }
            Observation::Rappor { cohort, data } => wire::observation::Value::Rappor(wire::RapporObservation {
                cohort: *cohort,
                data: data.clone(),
            }),
            Observation::BasicRappor { data } => {
                wire::observation::Value::BasicRappor(wire::BasicRapporObservation { data: data.clone() })
            }
            Observation::IntegerEvent { event_code, component_name_hash, value } => {
                wire::observation::Value::IntegerEvent(wire::IntegerEventObservation {
                    event_code: *event_code,
                    component_name_hash: component_name_hash.to_vec(),
                    value: *value,
                })
            }
            Observation::Histogram { event_code, component_name_hash, buckets } => {
                wire::observation::Value::Histogram(wire::HistogramObservation {
                    event_code: *event_code,
                    component_name_hash: component_name_hash.to_vec(),
                    buckets: buckets
                        .iter()
                        .map(|b| wire::HistogramBucket { index: b.index, count: b.count })
                        .collect(),
                })
            }
            Observation::Custom { values } => {
                wire::observation::Value::Custom(wire::CustomObservation { values: values.clone() })
            }
            Observation::UniqueActives { window, event_code, active } => {
                wire::observation::Value::UniqueActives(wire::UniqueActivesObservation {
                    window: Some((*window).into()),
                    event_code: *event_code,
                    active: *active,
                })
            }
            Observation::PerDeviceNumeric { window, component, packed_event_codes, value } => {
                wire::observation::Value::PerDeviceNumeric(wire::PerDeviceNumericObservation {
                    window: Some((*window).into()),
                    component: component.clone(),
                    packed_event_codes: *packed_event_codes,
                    value: *value,
                })
            }
            Observation::ReportParticipation => {
                wire::observation::Value::ReportParticipation(wire::ReportParticipationObservation {})
            }
        };
        wire::Observation { value: Some(inner) }
    }
}

impl From<crate::types::AggregationWindow> for crate::proto::cobalt::observation::OnDeviceAggregationWindow {
    fn from(value: crate::types::AggregationWindow) -> Self {
        use crate::proto::cobalt::observation::on_device_aggregation_window::Unit;
        use crate::types::AggregationWindow;
        let unit = match value {
            AggregationWindow::Days(d) => Unit::Days(d),
            AggregationWindow::Hours(h) => Unit::Hours(h),
        };
        Self { unit: Some(unit) }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pipeline::encryption::PlaintextEncrypter;
    use crate::pipeline::observation_store::{ObservationStore, ObservationStoreConfig};

    fn writer() -> (ObservationWriter, Arc<ObservationStore>) {
        let store = Arc::new(ObservationStore::new(ObservationStoreConfig {
            max_bytes_per_observation: 1000,
            max_bytes_per_envelope: 10_000,
            max_bytes_total: 100_000,
        }));
        let writer = ObservationWriter::new(
            Arc::new(PlaintextEncrypter),
            store.clone(),
            Arc::new(NoopUpdateRecipient),
        );
        (writer, store)
    }

    fn metadata() -> ObservationMetadata {
        ObservationMetadata {
            customer_id: 1,
            project_id: 2,
            metric_id: 3,
            report_id: 4,
            day_index: 5,
            system_profile: None,
        }
    }

    #[test_log::test]
    fn write_lands_in_the_store() {
        let (writer, store) = writer();
        writer
            .write(Observation::ReportParticipation, metadata())
            .expect("writes");
        assert!(!store.is_empty());
    }

    #[test_log::test]
    fn notify_recipient_is_called_on_success() {
        struct CountingRecipient(std::sync::atomic::AtomicUsize);
        impl ObservationStoreUpdateRecipient for CountingRecipient {
            fn notify_observations_added(&self) {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }
        let store = Arc::new(ObservationStore::new(ObservationStoreConfig {
            max_bytes_per_observation: 1000,
            max_bytes_per_envelope: 10_000,
            max_bytes_total: 100_000,
        }));
        let recipient = Arc::new(CountingRecipient(std::sync::atomic::AtomicUsize::new(0)));
        let writer = ObservationWriter::new(Arc::new(PlaintextEncrypter), store, recipient.clone());
        writer.write(Observation::ReportParticipation, metadata()).unwrap();
        assert_eq!(recipient.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test_log::test]
    fn observation_too_big_does_not_notify() {
        struct CountingRecipient(std::sync::atomic::AtomicUsize);
        impl ObservationStoreUpdateRecipient for CountingRecipient {
            fn notify_observations_added(&self) {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }
        let store = Arc::new(ObservationStore::new(ObservationStoreConfig {
            max_bytes_per_observation: 1,
            max_bytes_per_envelope: 10_000,
            max_bytes_total: 100_000,
        }));
        let recipient = Arc::new(CountingRecipient(std::sync::atomic::AtomicUsize::new(0)));
        let writer = ObservationWriter::new(Arc::new(PlaintextEncrypter), store, recipient.clone());
        let err = writer
            .write(Observation::ReportParticipation, metadata())
            .unwrap_err();
        assert_eq!(err.code(), StatusCode::ObservationTooBig);
        assert_eq!(recipient.0.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test_log::test]
    fn store_full_still_notifies_recipient() {
        struct CountingRecipient(std::sync::atomic::AtomicUsize);
        impl ObservationStoreUpdateRecipient for CountingRecipient {
            fn notify_observations_added(&self) {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }
        let store = Arc::new(ObservationStore::new(ObservationStoreConfig {
            max_bytes_per_observation: 1000,
            max_bytes_per_envelope: 10_000,
            max_bytes_total: 1,
        }));
        let recipient = Arc::new(CountingRecipient(std::sync::atomic::AtomicUsize::new(0)));
        let writer = ObservationWriter::new(Arc::new(PlaintextEncrypter), store, recipient.clone());
        let err = writer
            .write(Observation::ReportParticipation, metadata())
            .unwrap_err();
        assert_eq!(err.code(), StatusCode::StoreFull);
        assert_eq!(recipient.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
