//! In-memory, lock-protected map of daily aggregates per (report, component,
//! event-code, day), persisted through two independent `ConsistentProtoStore`s
//!.
//!
//! The wire `LocalAggregateStore`/`AggregatedObservationHistoryStore` messages
//! double as the in-memory representation here — there's no separate
//! ergonomic copy to keep in sync, so `copy_store()` is just a `Clone`.

pub mod upgrade;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::proto::cobalt::config::{AggregationType, ReportType, TimeZonePolicy};
use crate::proto::cobalt::local_aggregation::{
    on_device_aggregation_window::Unit, report_aggregates, AggregateStoreEntry,
    AggregatedObservationHistoryStore, AggregationConfig, ComponentHistory, DayActivity, DayValue,
    EventCodeActivity, LocalAggregateStore, OnDeviceAggregationWindow, PackedCodeHistory,
    PackedCodeValues, PerDeviceNumericAggregates, ReportAggregates, ReportHistory,
    UniqueActivesAggregates, WindowHistory,
};
use crate::registry::{Metric, Registry, Report};
use crate::status::{Status, StatusCode};
use crate::types::{AggregationWindow, ReportAggregationKey};
use crate::consistent_proto_store::ConsistentProtoStore;
use crate::util::RateLimitedLogger;

/// One observation `EventAggregator::generate_observations` has decided to
/// emit; carries just enough identity for the caller to look the
/// `Metric`/`Report` back up in the registry and hand the value to the
/// `Encoder`.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingObservation {
    UniqueActives {
        key: ReportAggregationKey,
        window: AggregationWindow,
        event_code: u32,
        day_index: u32,
        active: bool,
    },
    PerDeviceNumeric {
        key: ReportAggregationKey,
        window: AggregationWindow,
        component: String,
        packed_event_codes: u64,
        day_index: u32,
        value: i64,
    },
    ReportParticipation {
        key: ReportAggregationKey,
        day_index: u32,
    },
}

pub struct AggregateStore {
    local: RwLock<LocalAggregateStore>,
    history: RwLock<AggregatedObservationHistoryStore>,
    disabled: AtomicBool,
    backfill_days: u32,
    local_store: Option<ConsistentProtoStore>,
    history_store: Option<ConsistentProtoStore>,
    empty_template: LocalAggregateStore,
    window_warnings: RateLimitedLogger,
}

impl AggregateStore {
    pub fn new(
        registry: &Registry,
        backfill_days: u32,
        local_path: Option<PathBuf>,
        history_path: Option<PathBuf>,
    ) -> Result<Self, Status> {
        let empty_template = build_template(registry)?;
        let local_store = local_path.map(ConsistentProtoStore::new);
        let history_store = history_path.map(ConsistentProtoStore::new);

        let local = load_or_default(&local_store, &empty_template, |loaded| {
            upgrade::maybe_upgrade_local_aggregate_store(loaded)
        });
        let history = load_or_default(&history_store, &empty_history(), |loaded| {
            upgrade::maybe_upgrade_observation_history_store(loaded)
        });

        Ok(Self {
            local: RwLock::new(local),
            history: RwLock::new(history),
            disabled: AtomicBool::new(false),
            backfill_days,
            local_store,
            history_store,
            empty_template,
            window_warnings: RateLimitedLogger::new(10),
        })
    }

    /// Idempotently creates the entry for `(customer, project, metric, report)`
    /// with a zero-valued `ReportAggregates` of the type dictated by the
    /// report.
    pub fn maybe_insert_report_config(
        &self,
        customer_id: u32,
        project_id: u32,
        metric: &Metric,
        report: &Report,
    ) -> Result<(), Status> {
        let entry = build_entry(customer_id, project_id, metric, report)?.ok_or_else(|| {
            Status::new(StatusCode::InvalidArguments, "report type has no aggregate form")
        })?;
        let key = ReportAggregationKey {
            customer_id,
            project_id,
            metric_id: metric.id,
            report_id: report.id,
        }
        .to_base64_key();
        let mut local = self.local.write().expect("aggregate store lock poisoned");
        local.by_report_key.entry(key).or_insert(entry);
        Ok(())
    }

    /// Marks UniqueActives activity; no-op if the store is disabled
    ///.
    pub fn set_active(&self, key: &ReportAggregationKey, event_code: u32, day_index: u32) -> Result<(), Status> {
        if self.disabled.load(Ordering::Relaxed) {
            return Ok(());
        }
        let mut local = self.local.write().expect("aggregate store lock poisoned");
        let entry = local
            .by_report_key
            .get_mut(&key.to_base64_key())
            .ok_or_else(|| Status::new(StatusCode::NotFound, "no aggregate entry for key"))?;
        let aggregates = entry.aggregates.get_or_insert_with(|| ReportAggregates { aggregates: None });
        match aggregates.aggregates.as_mut() {
            Some(report_aggregates::Aggregates::UniqueActives(ua)) => {
                ua.by_event_code
                    .entry(event_code)
                    .or_insert_with(|| EventCodeActivity { by_day: HashMap::new() })
                    .by_day
                    .insert(day_index, DayActivity { activity_indicator: true });
                Ok(())
            }
            _ => Err(Status::new(StatusCode::InvalidArguments, "report is not a UniqueActives aggregate")),
        }
    }

    /// Combines `value` into the per-day cell using the report's
    /// `aggregation_type`; no-op if the store is disabled.
    pub fn update_numeric(
        &self,
        key: &ReportAggregationKey,
        component: &str,
        packed_event_codes: u64,
        day_index: u32,
        value: i64,
    ) -> Result<(), Status> {
        if self.disabled.load(Ordering::Relaxed) {
            return Ok(());
        }
        let mut local = self.local.write().expect("aggregate store lock poisoned");
        let entry = local
            .by_report_key
            .get_mut(&key.to_base64_key())
            .ok_or_else(|| Status::new(StatusCode::NotFound, "no aggregate entry for key"))?;
        let aggregation_type = AggregationType::try_from(entry.config.as_ref().map(|c| c.aggregation_type).unwrap_or(0))
            .map_err(|_| Status::new(StatusCode::InvalidConfig, "unknown aggregation type"))?;
        let aggregates = entry.aggregates.get_or_insert_with(|| ReportAggregates { aggregates: None });
        match aggregates.aggregates.as_mut() {
            Some(report_aggregates::Aggregates::PerDeviceNumeric(pdn)) => {
                let days = pdn
                    .by_component
                    .entry(component.to_string())
                    .or_insert_with(|| PackedCodeValues { by_packed_codes: HashMap::new() })
                    .by_packed_codes
                    .entry(packed_event_codes)
                    .or_insert_with(|| crate::proto::cobalt::local_aggregation::DayValues { by_day: HashMap::new() });
                let existing = days.by_day.get(&day_index).map(|v| v.value);
                let combined = match aggregation_type {
                    AggregationType::Sum => existing.unwrap_or(0) + value,
                    AggregationType::Max => existing.map_or(value, |v| v.max(value)),
                    AggregationType::Min => existing.map_or(value, |v| v.min(value)),
                    AggregationType::Unspecified => {
                        return Err(Status::new(StatusCode::InvalidConfig, "report has no aggregation type"))
                    }
                };
                days.by_day.insert(day_index, DayValue { value: combined });
                Ok(())
            }
            _ => Err(Status::new(StatusCode::InvalidArguments, "report is not a PerDeviceNumeric aggregate")),
        }
    }

    /// Clones the whole store under lock for safe read-only traversal
    /// elsewhere.
    pub fn copy_store(&self) -> LocalAggregateStore {
        self.local.read().expect("aggregate store lock poisoned").clone()
    }

    /// Removes every day-index entry older than the report's retention
    /// window, pruning empty inner maps bottom-up. A report whose config
    /// carries an out-of-range window is skipped for this cycle rather than
    /// panicking or corrupting the cutoff math; see `invalid_window_reason`.
    pub fn garbage_collect(&self, day_utc: u32, day_local: u32) {
        let mut local = self.local.write().expect("aggregate store lock poisoned");
        for entry in local.by_report_key.values_mut() {
            let Some(config) = entry.config.as_ref() else { continue };
            if let Some(reason) = invalid_window_reason(config) {
                self.window_warnings.warn(&format!(
                    "skipping GC for report {}/{}/{}/{}: {reason}",
                    config.customer_id, config.project_id, config.metric_id, config.report_id
                ));
                continue;
            }
            let day = if config.metric_is_utc { day_utc } else { day_local };
            let window = config.windows.iter().map(window_days).max().unwrap_or(0);
            let cutoff = day.saturating_sub(self.backfill_days).saturating_sub(window);
            let Some(aggregates) = entry.aggregates.as_mut() else { continue };
            match aggregates.aggregates.as_mut() {
                Some(report_aggregates::Aggregates::UniqueActives(ua)) => {
                    ua.by_event_code.retain(|_, activity| {
                        activity.by_day.retain(|day, _| *day > cutoff);
                        !activity.by_day.is_empty()
                    });
                }
                Some(report_aggregates::Aggregates::PerDeviceNumeric(pdn)) => {
                    pdn.by_component.retain(|_, packed| {
                        packed.by_packed_codes.retain(|_, days| {
                            days.by_day.retain(|day, _| *day > cutoff);
                            !days.by_day.is_empty()
                        });
                        !packed.by_packed_codes.is_empty()
                    });
                }
                None => {}
            }
        }
    }

    /// Walks every report's aggregates and decides which observations are
    /// due, advancing `AggregatedObservationHistoryStore` as it goes
    ///.
    pub fn generate_observations(&self, final_utc: u32, final_local: u32) -> Vec<PendingObservation> {
        let local = self.local.read().expect("aggregate store lock poisoned").clone();
        let mut history = self.history.write().expect("aggregate store lock poisoned");
        let mut out = Vec::new();

        for (key_str, entry) in local.by_report_key.iter() {
            let Some(config) = entry.config.as_ref() else { continue };
            let Some(aggregates) = entry.aggregates.as_ref() else { continue };
            let key = ReportAggregationKey {
                customer_id: config.customer_id,
                project_id: config.project_id,
                metric_id: config.metric_id,
                report_id: config.report_id,
            };
            if let Some(reason) = invalid_window_reason(config) {
                self.window_warnings.warn(&format!(
                    "skipping generation for report {}/{}/{}/{}: {reason}",
                    config.customer_id, config.project_id, config.metric_id, config.report_id
                ));
                continue;
            }

            let final_day = if config.metric_is_utc { final_utc } else { final_local };
            let backfill_start = final_day.saturating_sub(self.backfill_days);

            let report_history = history.by_report_key.entry(key_str.clone()).or_insert_with(|| ReportHistory {
                per_device: None,
                unique_actives_by_event_code: HashMap::new(),
                report_participation_last_generated_day: HashMap::new(),
            });

            match aggregates.aggregates.as_ref() {
                Some(report_aggregates::Aggregates::UniqueActives(ua)) => {
                    for event_code in 0..=config.max_event_code {
                        for window_wire in &config.windows {
                            let Some(Unit::Days(w)) = window_wire.unit else { continue };
                            let window_history = report_history
                                .unique_actives_by_event_code
                                .entry(event_code)
                                .or_insert_with(|| WindowHistory { last_generated_day_by_window: HashMap::new() });
                            let last = window_history.last_generated_day_by_window.get(&w).copied();
                            let start = last.map(|l| (l + 1).max(backfill_start)).unwrap_or(backfill_start);
                            for obs_day in start..=final_day {
                                let lower = obs_day.saturating_sub(w);
                                let was_active = ua
                                    .by_event_code
                                    .get(&event_code)
                                    .map(|activity| {
                                        activity
                                            .by_day
                                            .iter()
                                            .any(|(&d, a)| d > lower && d <= obs_day && a.activity_indicator)
                                    })
                                    .unwrap_or(false);
                                out.push(PendingObservation::UniqueActives {
                                    key,
                                    window: AggregationWindow::Days(w),
                                    event_code,
                                    day_index: obs_day,
                                    active: was_active,
                                });
                                window_history.last_generated_day_by_window.insert(w, obs_day);
                            }
                        }
                    }
                }
                Some(report_aggregates::Aggregates::PerDeviceNumeric(pdn)) => {
                    let aggregation_type = AggregationType::try_from(config.aggregation_type).unwrap_or(AggregationType::Sum);
                    for (component, packed) in pdn.by_component.iter() {
                        for (&packed_codes, days) in packed.by_packed_codes.iter() {
                            for window_wire in &config.windows {
                                let Some(Unit::Days(w)) = window_wire.unit else { continue };
                                let packed_history = report_history
                                    .per_device
                                    .get_or_insert_with(|| ComponentHistory { by_component: HashMap::new() })
                                    .by_component
                                    .entry(component.clone())
                                    .or_insert_with(|| PackedCodeHistory { by_packed_codes: HashMap::new() });
                                let window_history = packed_history
                                    .by_packed_codes
                                    .entry(packed_codes)
                                    .or_insert_with(|| WindowHistory { last_generated_day_by_window: HashMap::new() });
                                let last = window_history.last_generated_day_by_window.get(&w).copied();
                                let start = last.map(|l| (l + 1).max(backfill_start)).unwrap_or(backfill_start);
                                for obs_day in start..=final_day {
                                    let lower = obs_day.saturating_sub(w).saturating_add(1);
                                    let mut combined: Option<i64> = None;
                                    for day in lower..=obs_day {
                                        if let Some(v) = days.by_day.get(&day) {
                                            combined = Some(match aggregation_type {
                                                AggregationType::Sum => combined.unwrap_or(0) + v.value,
                                                AggregationType::Max => combined.map_or(v.value, |c| c.max(v.value)),
                                                AggregationType::Min => combined.map_or(v.value, |c| c.min(v.value)),
                                                AggregationType::Unspecified => v.value,
                                            });
                                        }
                                    }
                                    if let Some(value) = combined {
                                        out.push(PendingObservation::PerDeviceNumeric {
                                            key,
                                            window: AggregationWindow::Days(w),
                                            component: component.clone(),
                                            packed_event_codes: packed_codes,
                                            day_index: obs_day,
                                            value,
                                        });
                                    }
                                    window_history.last_generated_day_by_window.insert(w, obs_day);
                                }
                            }
                        }
                    }

                    let last_participation = report_history.report_participation_last_generated_day.get(&0).copied();
                    let start = last_participation
                        .map(|l| (l + 1).max(backfill_start))
                        .unwrap_or(backfill_start);
                    for obs_day in start..=final_day {
                        out.push(PendingObservation::ReportParticipation { key, day_index: obs_day });
                        report_history.report_participation_last_generated_day.insert(0, obs_day);
                    }
                }
                None => {}
            }
        }
        out
    }

    pub fn back_up_local_aggregate_store(&self) -> Result<(), Status> {
        let Some(store) = &self.local_store else { return Ok(()) };
        let local = self.local.read().expect("aggregate store lock poisoned").clone();
        store.write(&local)
    }

    pub fn back_up_observation_history(&self) -> Result<(), Status> {
        let Some(store) = &self.history_store else { return Ok(()) };
        let history = self.history.read().expect("aggregate store lock poisoned").clone();
        store.write(&history)
    }

    /// Writes both persisted stores to disk; blocking.
    pub fn back_up(&self) -> Result<(), Status> {
        self.back_up_local_aggregate_store()?;
        self.back_up_observation_history()
    }

    /// Replaces the store with the empty template and zeroes observation
    /// history.
    pub fn delete_data(&self) {
        let mut local = self.local.write().expect("aggregate store lock poisoned");
        *local = self.empty_template.clone();
        let mut history = self.history.write().expect("aggregate store lock poisoned");
        *history = empty_history();
    }

    /// While disabled, `set_active`/`update_numeric` silently succeed
    /// without mutating state.
    pub fn disable(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Relaxed);
    }
}

fn empty_history() -> AggregatedObservationHistoryStore {
    AggregatedObservationHistoryStore {
        version: upgrade::CURRENT_OBSERVATION_HISTORY_STORE_VERSION,
        by_report_key: HashMap::new(),
    }
}

fn load_or_default<M, F>(store: &Option<ConsistentProtoStore>, default: &M, upgrade: F) -> M
where
    M: prost::Message + Default + Clone,
    F: FnOnce(M) -> Result<M, Status>,
{
    let Some(store) = store else { return default.clone() };
    match store.read::<M>() {
        Ok(loaded) => upgrade(loaded).unwrap_or_else(|status| {
            log::warn!("store failed to upgrade, resetting to empty template: {status}");
            default.clone()
        }),
        Err(status) if status.code() == StatusCode::NotFound => default.clone(),
        Err(status) => {
            log::warn!("store failed to load, resetting to empty template: {status}");
            default.clone()
        }
    }
}

fn window_days(window: &OnDeviceAggregationWindow) -> u32 {
    match window.unit {
        Some(Unit::Days(d)) => d,
        Some(Unit::Hours(_)) | None => 1,
    }
}

/// `Some(reason)` if any of `config`'s windows falls outside
/// `AggregationWindow::validate`'s range, `None` if the report is safe to
/// generate/GC this cycle.
fn invalid_window_reason(config: &AggregationConfig) -> Option<String> {
    for window_wire in &config.windows {
        let window = match window_wire.unit {
            Some(Unit::Days(d)) => AggregationWindow::Days(d),
            Some(Unit::Hours(h)) => AggregationWindow::Hours(h),
            None => return Some("window missing unit".to_string()),
        };
        if let Err(status) = window.validate() {
            return Some(status.to_string());
        }
    }
    None
}

fn wire_window_from(window: AggregationWindow) -> OnDeviceAggregationWindow {
    match window {
        AggregationWindow::Days(d) => OnDeviceAggregationWindow { unit: Some(Unit::Days(d)) },
        AggregationWindow::Hours(h) => OnDeviceAggregationWindow { unit: Some(Unit::Hours(h)) },
    }
}

fn build_template(registry: &Registry) -> Result<LocalAggregateStore, Status> {
    let mut by_report_key = HashMap::new();
    for customer in registry.iter_customers() {
        for project in &customer.projects {
            for metric in registry.iter_metrics(project) {
                for report in &metric.reports {
                    if let Some(entry) = build_entry(customer.id, project.id, metric, report)? {
                        let key = ReportAggregationKey {
                            customer_id: customer.id,
                            project_id: project.id,
                            metric_id: metric.id,
                            report_id: report.id,
                        };
                        by_report_key.insert(key.to_base64_key(), entry);
                    }
                }
            }
        }
    }
    Ok(LocalAggregateStore {
        version: upgrade::CURRENT_LOCAL_AGGREGATE_STORE_VERSION,
        by_report_key,
    })
}

fn build_entry(
    customer_id: u32,
    project_id: u32,
    metric: &Metric,
    report: &Report,
) -> Result<Option<AggregateStoreEntry>, Status> {
    let aggregates = match report.report_type {
        ReportType::UniqueNDayActives => {
            report_aggregates::Aggregates::UniqueActives(UniqueActivesAggregates { by_event_code: HashMap::new() })
        }
        ReportType::PerDeviceCount | ReportType::PerDeviceHistogram | ReportType::PerDeviceNumericStats => {
            report_aggregates::Aggregates::PerDeviceNumeric(PerDeviceNumericAggregates { by_component: HashMap::new() })
        }
        _ => return Ok(None),
    };
    let max_event_code = metric.dimensions.first().map(|d| d.max_event_code).unwrap_or(0);
    let windows = report.windows.iter().copied().map(wire_window_from).collect();
    Ok(Some(AggregateStoreEntry {
        config: Some(AggregationConfig {
            customer_id,
            project_id,
            metric_id: metric.id,
            report_id: report.id,
            metric_is_utc: metric.time_zone_policy == TimeZonePolicy::Utc,
            report_type: report.report_type as i32,
            aggregation_type: report.aggregation_type as i32,
            windows,
            max_event_code,
            legacy_window_size_days: Vec::new(),
        }),
        aggregates: Some(ReportAggregates { aggregates: Some(aggregates) }),
    }))
}
