//! Owns the [`AggregateStore`] and the single background worker that backs
//! it up, generates observations from it, and garbage-collects it on three
//! independent schedules.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::aggregate_store::{AggregateStore, PendingObservation};
use crate::clock::{Clock, TimeZone};
use crate::encoder::{EncodeContext, Encoder};
use crate::pipeline::observation_writer::ObservationWriter;
use crate::registry::Registry;
use crate::status::{Status, StatusCode};
use crate::types::ReportAggregationKey;

/// Below this day index the local clock is assumed not to have been set
/// yet; the worker skips a cycle entirely rather than generating
/// observations stamped with an epoch-adjacent day.
const MIN_DAY_INDEX: u32 = 1;

pub struct EventAggregatorConfig {
    pub aggregate_backup_interval: Duration,
    pub generate_obs_interval: Duration,
    pub gc_interval: Duration,
}

impl EventAggregatorConfig {
    /// The backup interval must be the tightest of the three: a backup that
    /// fires less often than generation or GC could persist a store that's
    /// already stale relative to what's been generated or collected.
    fn validate(&self) -> Result<(), Status> {
        if self.aggregate_backup_interval > self.generate_obs_interval {
            return Err(Status::new(
                StatusCode::InvalidConfig,
                "aggregate_backup_interval must be <= generate_obs_interval",
            ));
        }
        if self.aggregate_backup_interval > self.gc_interval {
            return Err(Status::new(
                StatusCode::InvalidConfig,
                "aggregate_backup_interval must be <= gc_interval",
            ));
        }
        Ok(())
    }
}

pub struct EventAggregator {
    store: Arc<AggregateStore>,
    registry: Arc<Registry>,
    writer: Arc<ObservationWriter>,
    encoder: Arc<Encoder>,
    clock: Arc<dyn Clock>,
    config: EventAggregatorConfig,
    shutdown: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventAggregator {
    pub fn start(
        store: Arc<AggregateStore>,
        registry: Arc<Registry>,
        writer: Arc<ObservationWriter>,
        encoder: Arc<Encoder>,
        clock: Arc<dyn Clock>,
        config: EventAggregatorConfig,
    ) -> Result<Arc<Self>, Status> {
        config.validate()?;
        let aggregator = Arc::new(Self {
            store,
            registry,
            writer,
            encoder,
            clock,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            worker: Mutex::new(None),
        });
        let handle = tokio::spawn(aggregator.clone().run());
        *aggregator.worker.try_lock().expect("fresh aggregator has no contenders") = Some(handle);
        Ok(aggregator)
    }

    /// Marks UniqueActives activity for `key`.
    pub fn set_active(&self, key: &ReportAggregationKey, event_code: u32, day_index: u32) -> Result<(), Status> {
        self.store.set_active(key, event_code, day_index)
    }

    /// Combines `value` into the per-day cell for `key`.
    pub fn update_numeric(
        &self,
        key: &ReportAggregationKey,
        component: &str,
        packed_event_codes: u64,
        day_index: u32,
        value: i64,
    ) -> Result<(), Status> {
        self.store.update_numeric(key, component, packed_event_codes, day_index, value)
    }

    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.shutdown_notify.notify_waiters();
        if let Some(handle) = self.worker.lock().await.take() {
            let _ = handle.await;
        }
        if let Err(status) = self.store.back_up() {
            log::error!("failed to back up aggregate store on shutdown: {status}");
        }
    }

    /// Three independent deadlines — backup, generate, gc — each advanced by
    /// its own interval only when it fires, rather than a single shared tick
    /// driving all three.
    async fn run(self: Arc<Self>) {
        let now = tokio::time::Instant::now();
        let mut next_backup = now + self.config.aggregate_backup_interval;
        let mut next_generate = now + self.config.generate_obs_interval;
        let mut next_gc = now + self.config.gc_interval;

        loop {
            let next_wakeup = next_backup.min(next_generate).min(next_gc);
            tokio::select! {
                _ = self.shutdown_notify.notified() => {
                    return;
                }
                _ = tokio::time::sleep_until(next_wakeup) => {}
            }
            if self.shutdown.load(Ordering::Acquire) {
                return;
            }

            let now = tokio::time::Instant::now();
            let due_backup = now >= next_backup;
            let due_generate = now >= next_generate;
            let due_gc = now >= next_gc;

            if due_backup {
                if let Err(status) = self.store.back_up_local_aggregate_store() {
                    log::error!("periodic aggregate store backup failed: {status}");
                }
                next_backup = now + self.config.aggregate_backup_interval;
            }

            if due_generate || due_gc {
                let day_utc = self.clock.current_day_index(TimeZone::Utc);
                let day_local = self.clock.current_day_index(TimeZone::Local);
                if day_utc < MIN_DAY_INDEX || day_local < MIN_DAY_INDEX {
                    if due_generate {
                        next_generate = now + self.config.generate_obs_interval;
                    }
                    if due_gc {
                        next_gc = now + self.config.gc_interval;
                    }
                    continue;
                }

                if due_generate {
                    self.generate_and_dispatch(day_utc.saturating_sub(1), day_local.saturating_sub(1));
                    if let Err(status) = self.store.back_up_observation_history() {
                        log::error!("periodic observation history backup failed: {status}");
                    }
                    next_generate = now + self.config.generate_obs_interval;
                }

                if due_gc {
                    self.store.garbage_collect(day_utc.saturating_sub(1), day_local.saturating_sub(1));
                    if let Err(status) = self.store.back_up_local_aggregate_store() {
                        log::error!("post-gc aggregate store backup failed: {status}");
                    }
                    next_gc = now + self.config.gc_interval;
                }
            }
        }
    }

    /// Runs one `generate_observations` pass and dispatches every pending
    /// emission through the Encoder and ObservationWriter, the same writer
    /// used by immediate events.
    pub fn generate_and_dispatch(&self, final_utc: u32, final_local: u32) -> Status {
        let pending = self.store.generate_observations(final_utc, final_local);
        let mut worst = Status::ok();
        for item in pending {
            let result = self.dispatch_one(item);
            if let Err(status) = result {
                worst = worst.worst(status);
            }
        }
        worst
    }

    fn dispatch_one(&self, item: PendingObservation) -> Result<(), Status> {
        let key = match &item {
            PendingObservation::UniqueActives { key, .. }
            | PendingObservation::PerDeviceNumeric { key, .. }
            | PendingObservation::ReportParticipation { key, .. } => *key,
        };
        let (metric, report) = self
            .registry
            .find_report(key.customer_id, key.project_id, key.metric_id, key.report_id)?;
        let context = EncodeContext { customer_id: key.customer_id, project_id: key.project_id };

        let (observation, metadata) = match item {
            PendingObservation::UniqueActives { window, event_code, day_index, active, .. } => {
                self.encoder
                    .encode_unique_actives(context, metric, report, day_index, event_code, active, window)?
            }
            PendingObservation::PerDeviceNumeric { window, component, packed_event_codes, day_index, value, .. } => {
                let num_dimensions = metric.dimensions.len().max(1);
                let event_codes = crate::types::unpack_event_codes(packed_event_codes, num_dimensions);
                if report.report_type == crate::proto::cobalt::config::ReportType::PerDeviceHistogram {
                    self.encoder.encode_per_device_histogram(
                        context,
                        metric,
                        report,
                        day_index,
                        &component,
                        &event_codes,
                        value,
                        window,
                    )?
                } else {
                    self.encoder.encode_per_device_numeric(
                        context,
                        metric,
                        report,
                        day_index,
                        &component,
                        &event_codes,
                        value,
                        window,
                    )?
                }
            }
            PendingObservation::ReportParticipation { day_index, .. } => {
                self.encoder.encode_report_participation(context, metric, report, day_index)?
            }
        };
        self.writer.write(observation, metadata)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::client_secret::ClientSecret;
    use crate::pipeline::encryption::PlaintextEncrypter;
    use crate::pipeline::observation_store::{ObservationStore, ObservationStoreConfig};
    use crate::pipeline::observation_writer::NoopUpdateRecipient;
    use crate::proto::cobalt::config::{self as config_proto, AggregationType, MetricType, ReportType, TimeZonePolicy};
    use crate::proto::cobalt::config::CobaltConfig;
    use std::collections::HashMap;

    struct FixedClock;
    impl Clock for FixedClock {
        fn now(&self) -> std::time::SystemTime {
            std::time::UNIX_EPOCH + Duration::from_secs(86_400 * 200)
        }
    }

    fn harness() -> (Arc<EventAggregator>, Arc<ObservationStore>, ReportAggregationKey) {
        let config = CobaltConfig {
            customers: vec![config_proto::CustomerConfig {
                customer_id: 1,
                customer_name: "c".into(),
                projects: vec![config_proto::ProjectConfig {
                    project_id: 2,
                    project_name: "p".into(),
                    metrics: vec![config_proto::MetricDefinition {
                        id: 3,
                        name: "m".into(),
                        metric_type: MetricType::EventOccurred as i32,
                        dimensions: vec![config_proto::MetricDimension { max_event_code: 2, named_codes: HashMap::new() }],
                        time_zone_policy: TimeZonePolicy::Utc as i32,
                        reports: vec![config_proto::ReportDefinition {
                            id: 4,
                            name: "r".into(),
                            report_type: ReportType::UniqueNDayActives as i32,
                            aggregation_type: AggregationType::Unspecified as i32,
                            windows: vec![config_proto::OnDeviceAggregationWindow {
                                unit: Some(config_proto::on_device_aggregation_window::Unit::Days(1)),
                            }],
                            rappor: None,
                            forculus: None,
                            noise_level: 0.0,
                            has_export_config: false,
                        }],
                        system_profile_fields: vec![],
                    }],
                }],
            }],
        };
        let registry = Arc::new(Registry::from_config(&config).unwrap());
        let store = Arc::new(AggregateStore::new(&registry, 0, None, None).unwrap());
        let key = ReportAggregationKey { customer_id: 1, project_id: 2, metric_id: 3, report_id: 4 };

        let obs_store = Arc::new(ObservationStore::new(ObservationStoreConfig {
            max_bytes_per_observation: 10_000,
            max_bytes_per_envelope: 100_000,
            max_bytes_total: 1_000_000,
        }));
        let writer = Arc::new(ObservationWriter::new(
            Arc::new(PlaintextEncrypter),
            obs_store.clone(),
            Arc::new(NoopUpdateRecipient),
        ));
        let encoder = Arc::new(Encoder::new(ClientSecret::generate()));

        let aggregator = EventAggregator::start(
            store,
            registry,
            writer,
            encoder,
            Arc::new(FixedClock),
            EventAggregatorConfig {
                aggregate_backup_interval: Duration::from_secs(3600),
                generate_obs_interval: Duration::from_secs(3600),
                gc_interval: Duration::from_secs(3600),
            },
        )
        .expect("intervals satisfy backup <= generate/gc");
        (aggregator, obs_store, key)
    }

    #[test_log::test(tokio::test)]
    async fn generate_and_dispatch_writes_through_to_the_observation_store() {
        let (aggregator, obs_store, key) = harness();
        aggregator.set_active(&key, 1, 100).unwrap();
        let status = aggregator.generate_and_dispatch(100, 100);
        assert!(status.is_ok());
        assert!(!obs_store.is_empty());
        aggregator.shutdown().await;
    }

    #[test_log::test(tokio::test)]
    async fn repeated_dispatch_with_same_final_day_is_idempotent() {
        let (aggregator, obs_store, key) = harness();
        aggregator.set_active(&key, 1, 100).unwrap();
        aggregator.generate_and_dispatch(100, 100);
        let after_first = obs_store.total_bytes();
        aggregator.generate_and_dispatch(100, 100);
        assert_eq!(obs_store.total_bytes(), after_first);
        aggregator.shutdown().await;
    }

    #[test_log::test(tokio::test)]
    async fn backup_interval_longer_than_generate_is_rejected() {
        let config = CobaltConfig {
            customers: vec![config_proto::CustomerConfig {
                customer_id: 1,
                customer_name: "c".into(),
                projects: vec![config_proto::ProjectConfig {
                    project_id: 2,
                    project_name: "p".into(),
                    metrics: vec![],
                }],
            }],
        };
        let registry = Arc::new(Registry::from_config(&config).unwrap());
        let store = Arc::new(AggregateStore::new(&registry, 0, None, None).unwrap());
        let obs_store = Arc::new(ObservationStore::new(ObservationStoreConfig {
            max_bytes_per_observation: 10_000,
            max_bytes_per_envelope: 100_000,
            max_bytes_total: 1_000_000,
        }));
        let writer = Arc::new(ObservationWriter::new(
            Arc::new(PlaintextEncrypter),
            obs_store,
            Arc::new(NoopUpdateRecipient),
        ));
        let encoder = Arc::new(Encoder::new(ClientSecret::generate()));
        let err = EventAggregator::start(
            store,
            registry,
            writer,
            encoder,
            Arc::new(FixedClock),
            EventAggregatorConfig {
                aggregate_backup_interval: Duration::from_secs(7200),
                generate_obs_interval: Duration::from_secs(3600),
                gc_interval: Duration::from_secs(3600),
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), StatusCode::InvalidConfig);
    }

    #[test_log::test(tokio::test)]
    async fn unknown_key_returns_not_found() {
        let (aggregator, _obs_store, _key) = harness();
        let err = aggregator
            .update_numeric(
                &ReportAggregationKey { customer_id: 9, project_id: 9, metric_id: 9, report_id: 9 },
                "x",
                0,
                1,
                1,
            )
            .unwrap_err();
        assert_eq!(err.code(), StatusCode::NotFound);
        aggregator.shutdown().await;
    }
}
