//! Per-project façade clients log events through.
//!
//! `Logger` resolves a metric from the registry, diverts to the
//! UndatedEventManager while the clock is inaccurate, and otherwise fans an
//! event out to every report the metric declares — immediate reports go
//! straight through the Encoder and ObservationWriter, local-aggregate
//! reports go through the EventAggregator. A single event may touch several
//! reports; failures are collected and the worst status is returned, but
//! earlier reports' successful side effects are never rolled back.

use std::sync::Arc;
use std::time::SystemTime;

use crate::clock::{Clock, ClockValidator, TimeZone};
use crate::encoder::{EncodeContext, Encoder};
use crate::event_aggregator::EventAggregator;
use crate::pipeline::observation_writer::ObservationWriter;
use crate::proto::cobalt::config::{ReportType, TimeZonePolicy};
use crate::registry::{Metric, Registry, Report};
use crate::status::{Status, StatusCode};
use crate::system_data::SystemData;
use crate::types::{pack_event_codes, CustomValue, Event, HistogramBucket, ReportAggregationKey};
use crate::undated_event_manager::UndatedEventManager;

pub struct Logger {
    customer_id: u32,
    project_id: u32,
    registry: Arc<Registry>,
    encoder: Arc<Encoder>,
    writer: Arc<ObservationWriter>,
    aggregator: Arc<EventAggregator>,
    clock: Arc<dyn Clock>,
    clock_validator: Arc<dyn ClockValidator>,
    undated: Arc<UndatedEventManager>,
    system_data: Option<Arc<SystemData>>,
}

impl Logger {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        customer_id: u32,
        project_id: u32,
        registry: Arc<Registry>,
        encoder: Arc<Encoder>,
        writer: Arc<ObservationWriter>,
        aggregator: Arc<EventAggregator>,
        clock: Arc<dyn Clock>,
        clock_validator: Arc<dyn ClockValidator>,
        undated: Arc<UndatedEventManager>,
        system_data: Option<Arc<SystemData>>,
    ) -> Self {
        Self {
            customer_id,
            project_id,
            registry,
            encoder,
            writer,
            aggregator,
            clock,
            clock_validator,
            undated,
            system_data,
        }
    }

    pub fn log_event(&self, metric_id: u32, event_codes: Vec<u32>) -> Status {
        self.log(metric_id, Event::Occurrence { event_codes })
    }

    pub fn log_event_count(
        &self,
        metric_id: u32,
        event_codes: Vec<u32>,
        component: Option<String>,
        period_duration_micros: u64,
        count: i64,
    ) -> Status {
        self.log(
            metric_id,
            Event::Count { event_codes, component, period_duration_micros, count },
        )
    }

    pub fn log_elapsed_time(
        &self,
        metric_id: u32,
        event_codes: Vec<u32>,
        component: Option<String>,
        elapsed_micros: i64,
    ) -> Status {
        self.log(metric_id, Event::ElapsedTime { event_codes, component, elapsed_micros })
    }

    pub fn log_frame_rate(
        &self,
        metric_id: u32,
        event_codes: Vec<u32>,
        component: Option<String>,
        frames_per_1000_seconds: i64,
    ) -> Status {
        self.log(
            metric_id,
            Event::FrameRate { event_codes, component, frames_per_1000_seconds },
        )
    }

    pub fn log_memory_usage(
        &self,
        metric_id: u32,
        event_codes: Vec<u32>,
        component: Option<String>,
        bytes: i64,
    ) -> Status {
        self.log(metric_id, Event::MemoryUsage { event_codes, component, bytes })
    }

    pub fn log_int_histogram(
        &self,
        metric_id: u32,
        event_codes: Vec<u32>,
        component: Option<String>,
        buckets: Vec<HistogramBucket>,
    ) -> Status {
        self.log(metric_id, Event::IntHistogram { event_codes, component, buckets })
    }

    pub fn log_custom_event(
        &self,
        metric_id: u32,
        values: std::collections::HashMap<String, CustomValue>,
    ) -> Status {
        self.log(metric_id, Event::Custom { values })
    }

    fn log(&self, metric_id: u32, event: Event) -> Status {
        let metric = match self.registry.find_metric(self.customer_id, self.project_id, metric_id) {
            Ok(metric) => metric,
            Err(status) => return status,
        };

        if !self.clock_validator.is_accurate() {
            let status = self.undated.save(event.clone(), metric_id, std::time::Instant::now());
            if status.code() == StatusCode::AlreadyFlushed {
                // The clock turned accurate between the check above and the
                // save; flush() has already drained the queue, so there is
                // nobody left to replay this event. Log it through the
                // normal path instead of dropping it.
                return self.dispatch(metric, event, self.clock.now());
            }
            return status;
        }

        self.dispatch(metric, event, self.clock.now())
    }

    /// Re-enters the normal dispatch path for an event recovered by
    /// [`UndatedEventManager::flush`], stamped with its recovered
    /// approximate log time rather than the current clock reading.
    pub fn replay(&self, metric_id: u32, event: Event, approximate_log_time: SystemTime) -> Status {
        let metric = match self.registry.find_metric(self.customer_id, self.project_id, metric_id) {
            Ok(metric) => metric,
            Err(status) => return status,
        };
        self.dispatch(metric, event, approximate_log_time)
    }

    fn dispatch(&self, metric: &Metric, event: Event, at: SystemTime) -> Status {
        if let Err(status) = Encoder::validate_event_codes(metric, event.event_codes()) {
            return status;
        }

        let tz = match metric.time_zone_policy {
            TimeZonePolicy::Local => TimeZone::Local,
            _ => TimeZone::Utc,
        };
        let day_index = self.clock.day_index(at, tz);

        let mut worst = Status::ok();
        for report in &metric.reports {
            let result = if report.is_immediate() {
                self.dispatch_immediate(metric, report, &event, day_index)
            } else if report.is_local_aggregate() {
                self.dispatch_aggregate(metric, report, &event, day_index)
            } else {
                Ok(())
            };
            if let Err(status) = result {
                worst = worst.worst(status);
            }
        }
        worst
    }

    fn dispatch_immediate(
        &self,
        metric: &Metric,
        report: &Report,
        event: &Event,
        day_index: u32,
    ) -> Result<(), Status> {
        let system_profile = self.maybe_system_profile(metric);
        let context = EncodeContext { customer_id: self.customer_id, project_id: self.project_id };
        let (observation, metadata) =
            self.encoder.encode_immediate(context, event, metric, report, day_index, system_profile)?;
        self.writer.write(observation, metadata)
    }

    fn dispatch_aggregate(
        &self,
        metric: &Metric,
        report: &Report,
        event: &Event,
        day_index: u32,
    ) -> Result<(), Status> {
        let key = ReportAggregationKey {
            customer_id: self.customer_id,
            project_id: self.project_id,
            metric_id: metric.id,
            report_id: report.id,
        };
        match report.report_type {
            ReportType::UniqueNDayActives => {
                let event_code = event.event_codes().first().copied().unwrap_or(0);
                self.aggregator.set_active(&key, event_code, day_index)
            }
            ReportType::PerDeviceCount | ReportType::PerDeviceHistogram | ReportType::PerDeviceNumericStats => {
                let component = event.component().unwrap_or_default().to_owned();
                let packed = pack_event_codes(event.event_codes())?;
                let value = numeric_value(event)?;
                self.aggregator.update_numeric(&key, &component, packed, day_index, value)
            }
            other => Err(Status::new(
                StatusCode::InvalidConfig,
                format!("{other:?} is neither immediate nor local-aggregate"),
            )),
        }
    }

    /// The UndatedEventManager this logger's clock-inaccurate events are
    /// diverted to; exposed so a caller can trigger `flush` once the clock
    /// is known good.
    pub fn undated(&self) -> &Arc<UndatedEventManager> {
        &self.undated
    }

    fn maybe_system_profile(&self, metric: &Metric) -> Option<crate::system_data::SystemProfile> {
        if metric.system_profile_fields.is_empty() {
            return None;
        }
        self.system_data.as_ref().map(|data| data.system_profile())
    }
}

fn numeric_value(event: &Event) -> Result<i64, Status> {
    match event {
        Event::Count { count, .. } => Ok(*count),
        Event::ElapsedTime { elapsed_micros, .. } => Ok(*elapsed_micros),
        Event::FrameRate { frames_per_1000_seconds, .. } => Ok(*frames_per_1000_seconds),
        Event::MemoryUsage { bytes, .. } => Ok(*bytes),
        other => Err(Status::new(
            StatusCode::InvalidArguments,
            format!("{other:?} has no numeric value for a per-device report"),
        )),
    }
}
