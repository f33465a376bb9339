//! Cross-module scenarios that don't fit any single module's `#[cfg(test)]`
//! block: a full stack wired from a decoded config through to an envelope
//! ready for shipping, and the clock-accuracy handoff between Logger and
//! UndatedEventManager feeding back into that same stack.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use cobalt::aggregate_store::AggregateStore;
use cobalt::clock::{Clock, LatchingClockValidator, TimeZone};
use cobalt::encoder::Encoder;
use cobalt::event_aggregator::{EventAggregator, EventAggregatorConfig};
use cobalt::pipeline::encryption::PlaintextEncrypter;
use cobalt::pipeline::observation_store::{ObservationStore, ObservationStoreConfig};
use cobalt::pipeline::observation_writer::{NoopUpdateRecipient, ObservationWriter};
use cobalt::proto::cobalt::config::{
    self as config_proto, AggregationType, CobaltConfig, MetricType, ReportType, TimeZonePolicy,
};
use cobalt::{ClientSecret, Logger, Registry, UndatedEventManager};

struct FixedClock(SystemTime);
impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

fn config() -> CobaltConfig {
    CobaltConfig {
        customers: vec![config_proto::CustomerConfig {
            customer_id: 1,
            customer_name: "acme".into(),
            projects: vec![config_proto::ProjectConfig {
                project_id: 1,
                project_name: "widgets".into(),
                metrics: vec![
                    config_proto::MetricDefinition {
                        id: 1,
                        name: "WidgetClicked".into(),
                        metric_type: MetricType::EventOccurred as i32,
                        dimensions: vec![config_proto::MetricDimension {
                            max_event_code: 4,
                            named_codes: HashMap::new(),
                        }],
                        time_zone_policy: TimeZonePolicy::Utc as i32,
                        reports: vec![
                            config_proto::ReportDefinition {
                                id: 1,
                                name: "WidgetClickedCount".into(),
                                report_type: ReportType::SimpleOccurrenceCount as i32,
                                aggregation_type: AggregationType::Unspecified as i32,
                                windows: vec![],
                                rappor: None,
                                forculus: None,
                                noise_level: 0.0,
                                has_export_config: false,
                            },
                            config_proto::ReportDefinition {
                                id: 2,
                                name: "WidgetClickedUniqueDevices".into(),
                                report_type: ReportType::UniqueNDayActives as i32,
                                aggregation_type: AggregationType::Unspecified as i32,
                                windows: vec![config_proto::OnDeviceAggregationWindow {
                                    unit: Some(config_proto::on_device_aggregation_window::Unit::Days(7)),
                                }],
                                rappor: None,
                                forculus: None,
                                noise_level: 0.0,
                                has_export_config: false,
                            },
                        ],
                        system_profile_fields: vec![],
                    },
                    config_proto::MetricDefinition {
                        id: 2,
                        name: "FileSize".into(),
                        metric_type: MetricType::EventCount as i32,
                        dimensions: vec![],
                        time_zone_policy: TimeZonePolicy::Utc as i32,
                        reports: vec![config_proto::ReportDefinition {
                            id: 3,
                            name: "FileSizeSum".into(),
                            report_type: ReportType::PerDeviceCount as i32,
                            aggregation_type: AggregationType::Sum as i32,
                            windows: vec![config_proto::OnDeviceAggregationWindow {
                                unit: Some(config_proto::on_device_aggregation_window::Unit::Days(30)),
                            }],
                            rappor: None,
                            forculus: None,
                            noise_level: 0.0,
                            has_export_config: false,
                        }],
                        system_profile_fields: vec![],
                    },
                ],
            }],
        }],
    }
}

struct Stack {
    logger: Logger,
    obs_store: Arc<ObservationStore>,
    aggregator: Arc<EventAggregator>,
}

fn build_stack(clock: Arc<dyn Clock>, clock_accurate: bool) -> Stack {
    let registry = Arc::new(Registry::from_config(&config()).expect("config is valid"));
    let aggregate_store = Arc::new(AggregateStore::new(&registry, 0, None, None).expect("template builds"));
    let obs_store = Arc::new(ObservationStore::new(ObservationStoreConfig {
        max_bytes_per_observation: 10_000,
        max_bytes_per_envelope: 1_000_000,
        max_bytes_total: 10_000_000,
    }));
    let writer = Arc::new(ObservationWriter::new(
        Arc::new(PlaintextEncrypter),
        obs_store.clone(),
        Arc::new(NoopUpdateRecipient),
    ));
    let encoder = Arc::new(Encoder::new(ClientSecret::generate()));
    let aggregator = EventAggregator::start(
        aggregate_store,
        registry.clone(),
        writer.clone(),
        encoder.clone(),
        clock.clone(),
        EventAggregatorConfig {
            aggregate_backup_interval: Duration::from_secs(3600),
            generate_obs_interval: Duration::from_secs(3600),
            gc_interval: Duration::from_secs(3600),
        },
    )
    .expect("intervals satisfy backup <= generate/gc");
    let undated = Arc::new(UndatedEventManager::new(100));
    let validator = Arc::new(LatchingClockValidator::new(clock_accurate));
    let logger = Logger::new(1, 1, registry, encoder, writer, aggregator.clone(), clock, validator, undated, None);
    Stack { logger, obs_store, aggregator }
}

#[test_log::test(tokio::test)]
async fn immediate_event_lands_in_an_envelope_ready_for_shipping() {
    let clock = Arc::new(FixedClock(UNIX_EPOCH + Duration::from_secs(86_400 * 42)));
    let stack = build_stack(clock, true);

    let status = stack.logger.log_event(1, vec![2]);
    assert!(status.is_ok(), "{status}");

    assert!(!stack.obs_store.is_empty());
    let envelope = stack.obs_store.take_next_envelope().expect("an envelope was produced");
    assert_eq!(envelope.batch.len(), 1);
    assert_eq!(envelope.batch[0].encrypted_observations.len(), 1);

    stack.aggregator.shutdown().await;
}

#[test_log::test(tokio::test)]
async fn local_aggregate_event_only_reaches_the_store_after_generation() {
    let clock = Arc::new(FixedClock(UNIX_EPOCH + Duration::from_secs(86_400 * 42)));
    let stack = build_stack(clock.clone(), true);

    // FileSize's only report, PerDeviceCount, is a local-aggregate form with
    // no immediate counterpart; it should accumulate silently until the
    // EventAggregator runs its generation pass for the day in question.
    let status = stack.logger.log_event_count(2, vec![], None, 0, 5);
    assert!(status.is_ok(), "{status}");
    assert!(stack.obs_store.is_empty());

    let day = clock.current_day_index(TimeZone::Utc);
    let status = stack.aggregator.generate_and_dispatch(day, day);
    assert!(status.is_ok(), "{status}");
    assert!(!stack.obs_store.is_empty());

    stack.aggregator.shutdown().await;
}

#[test_log::test(tokio::test)]
async fn inaccurate_clock_defers_then_replays_through_the_full_stack() {
    let clock = Arc::new(FixedClock(UNIX_EPOCH + Duration::from_secs(86_400 * 42)));
    let stack = build_stack(clock.clone(), false);

    let status = stack.logger.log_event(1, vec![3]);
    assert!(status.is_ok(), "{status}");
    // The immediate SimpleOccurrenceCount report would otherwise have
    // written straight through; with the clock marked inaccurate it must
    // have been diverted instead.
    assert!(stack.obs_store.is_empty());

    let replay_status = stack.logger.undated().flush(clock.now(), |metric_id, event, at| {
        stack.logger.replay(metric_id, event, at)
    });
    assert!(replay_status.is_ok(), "{replay_status}");
    assert!(!stack.obs_store.is_empty());

    stack.aggregator.shutdown().await;
}
