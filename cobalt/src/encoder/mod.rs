//! Pure event-to-observation encoding.
//!
//! Stateless apart from the device's [`ClientSecret`] and whatever
//! randomness the underlying RAPPOR/Forculus encoders draw on. Each public
//! method takes the metric/report/value plus a day index and returns an
//! `(observation, metadata)` pair; nothing here touches storage or the
//! network.

mod forculus;
mod rappor;

use sha2::{Digest, Sha256};

use crate::client_secret::ClientSecret;
use crate::registry::{Metric, Report};
use crate::status::{Status, StatusCode};
use crate::system_data::SystemProfile;
use crate::types::{
    pack_event_codes, AggregationWindow, CustomValue, Event, HistogramBucket, Observation,
    ObservationMetadata,
};

pub use forculus::ForculusEncoder;
pub use rappor::{BasicRapporEncoder, RapporEncoder};

/// The identity fields an encoded observation is stamped with, everything
/// except `day_index`/`system_profile` fixed for the lifetime of a project.
#[derive(Debug, Clone, Copy)]
pub struct EncodeContext {
    pub customer_id: u32,
    pub project_id: u32,
}

pub struct Encoder {
    client_secret: ClientSecret,
}

impl Encoder {
    pub fn new(client_secret: ClientSecret) -> Self {
        Self { client_secret }
    }

    fn metadata(
        &self,
        context: EncodeContext,
        metric: &Metric,
        report: &Report,
        day_index: u32,
        system_profile: Option<SystemProfile>,
    ) -> ObservationMetadata {
        ObservationMetadata {
            customer_id: context.customer_id,
            project_id: context.project_id,
            metric_id: metric.id,
            report_id: report.id,
            day_index,
            system_profile,
        }
    }

    /// Validates `event_codes` against a metric's declared dimensions
    ///: no dimensions declared accepts empty or
    /// all-zero codes; otherwise exactly one code per dimension, each
    /// within its declared `max_event_code`.
    pub fn validate_event_codes(metric: &Metric, event_codes: &[u32]) -> Result<(), Status> {
        if metric.dimensions.is_empty() {
            if event_codes.iter().all(|&c| c == 0) {
                return Ok(());
            }
            return Err(Status::new(
                StatusCode::InvalidArguments,
                "metric declares no dimensions but event codes were non-zero",
            ));
        }
        if event_codes.len() != metric.dimensions.len() {
            return Err(Status::new(
                StatusCode::InvalidArguments,
                format!(
                    "expected {} event codes, got {}",
                    metric.dimensions.len(),
                    event_codes.len()
                ),
            ));
        }
        for (code, dimension) in event_codes.iter().zip(metric.dimensions.iter()) {
            if *code > dimension.max_event_code {
                return Err(Status::new(
                    StatusCode::InvalidArguments,
                    format!(
                        "event code {code} exceeds max_event_code {}",
                        dimension.max_event_code
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn encode_unique_actives(
        &self,
        context: EncodeContext,
        metric: &Metric,
        report: &Report,
        day_index: u32,
        event_code: u32,
        active: bool,
        window: AggregationWindow,
    ) -> Result<(Observation, ObservationMetadata), Status> {
        let observation = Observation::UniqueActives {
            window,
            event_code,
            active,
        };
        Ok((observation, self.metadata(context, metric, report, day_index, None)))
    }

    pub fn encode_per_device_numeric(
        &self,
        context: EncodeContext,
        metric: &Metric,
        report: &Report,
        day_index: u32,
        component: &str,
        event_codes: &[u32],
        value: i64,
        window: AggregationWindow,
    ) -> Result<(Observation, ObservationMetadata), Status> {
        let packed = pack_event_codes(event_codes)?;
        let observation = Observation::PerDeviceNumeric {
            window,
            component: component.to_owned(),
            packed_event_codes: packed,
            value,
        };
        Ok((observation, self.metadata(context, metric, report, day_index, None)))
    }

    pub fn encode_per_device_histogram(
        &self,
        context: EncodeContext,
        metric: &Metric,
        report: &Report,
        day_index: u32,
        component: &str,
        event_codes: &[u32],
        value: i64,
        window: AggregationWindow,
    ) -> Result<(Observation, ObservationMetadata), Status> {
        let packed = pack_event_codes(event_codes)?;
        let observation = Observation::Histogram {
            event_code: packed,
            component_name_hash: hash_component(component),
            buckets: vec![HistogramBucket {
                index: 0,
                count: value.max(0) as u64,
            }],
        };
        let _ = window; // carried via the caller's bookkeeping, not the observation itself
        Ok((observation, self.metadata(context, metric, report, day_index, None)))
    }

    pub fn encode_report_participation(
        &self,
        context: EncodeContext,
        metric: &Metric,
        report: &Report,
        day_index: u32,
    ) -> Result<(Observation, ObservationMetadata), Status> {
        Ok((
            Observation::ReportParticipation,
            self.metadata(context, metric, report, day_index, None),
        ))
    }

    /// Dispatches an immediately-encoded event to the report's configured
    /// privacy mechanism.
    pub fn encode_immediate(
        &self,
        context: EncodeContext,
        event: &Event,
        metric: &Metric,
        report: &Report,
        day_index: u32,
        system_profile: Option<SystemProfile>,
    ) -> Result<(Observation, ObservationMetadata), Status> {
        use crate::proto::cobalt::config::ReportType;

        Self::validate_event_codes(metric, event.event_codes())?;

        let observation = match report.report_type {
            ReportType::Forculus => self.encode_forculus(event, report)?,
            ReportType::StringRappor => self.encode_string_rappor(event, report)?,
            ReportType::BasicRappor => self.encode_basic_rappor(event, report)?,
            ReportType::Histogram => self.encode_histogram(event)?,
            ReportType::SimpleOccurrenceCount => self.encode_integer_event(event, 1)?,
            other => {
                return Err(Status::new(
                    StatusCode::InvalidConfig,
                    format!("{other:?} has no immediate encoding"),
                ))
            }
        };

        Ok((
            observation,
            self.metadata(context, metric, report, day_index, system_profile),
        ))
    }

    fn string_value(event: &Event) -> Result<&str, Status> {
        match event {
            Event::Custom { values } => values
                .values()
                .find_map(|v| match v {
                    CustomValue::String(s) => Some(s.as_str()),
                    CustomValue::Int(_) => None,
                })
                .ok_or_else(|| {
                    Status::new(StatusCode::InvalidArguments, "event carries no string value")
                }),
            _ => Err(Status::new(
                StatusCode::InvalidArguments,
                "report requires a string-valued custom event",
            )),
        }
    }

    fn encode_forculus(&self, event: &Event, report: &Report) -> Result<Observation, Status> {
        let value = Self::string_value(event)?;
        let params = report.forculus.ok_or_else(|| {
            Status::new(StatusCode::InvalidConfig, "report has no forculus config")
        })?;
        let encoder = ForculusEncoder::new(params.threshold)?;
        let share = encoder.encode(value.as_bytes())?;
        Ok(Observation::Forculus {
            ciphertext: share.ciphertext,
            point_x: share.point_x,
            point_y: share.point_y,
        })
    }

    fn encode_string_rappor(&self, event: &Event, report: &Report) -> Result<Observation, Status> {
        let value = Self::string_value(event)?;
        let params = report
            .rappor
            .as_ref()
            .ok_or_else(|| Status::new(StatusCode::InvalidConfig, "report has no rappor config"))?;
        let encoder = RapporEncoder::new(params)?;
        let share = encoder.encode(&self.client_secret, value)?;
        Ok(Observation::Rappor {
            cohort: share.cohort,
            data: share.data,
        })
    }

    fn encode_basic_rappor(&self, event: &Event, report: &Report) -> Result<Observation, Status> {
        let value = Self::string_value(event)?;
        let params = report
            .rappor
            .as_ref()
            .ok_or_else(|| Status::new(StatusCode::InvalidConfig, "report has no rappor config"))?;
        let encoder = BasicRapporEncoder::new(params)?;
        let data = encoder.encode(&self.client_secret, value)?;
        Ok(Observation::BasicRappor { data })
    }

    fn encode_histogram(&self, event: &Event) -> Result<Observation, Status> {
        let (event_codes, component, buckets) = match event {
            Event::IntHistogram {
                event_codes,
                component,
                buckets,
            } => (event_codes, component, buckets.clone()),
            _ => {
                return Err(Status::new(
                    StatusCode::InvalidArguments,
                    "histogram report requires an IntHistogramEvent",
                ))
            }
        };
        let packed = pack_event_codes(event_codes)?;
        Ok(Observation::Histogram {
            event_code: packed,
            component_name_hash: hash_component(component.as_deref().unwrap_or("")),
            buckets,
        })
    }

    fn encode_integer_event(&self, event: &Event, default_value: i64) -> Result<Observation, Status> {
        let (event_codes, component, value) = match event {
            Event::Occurrence { event_codes } => (event_codes.clone(), None, default_value),
            Event::Count {
                event_codes,
                component,
                count,
                ..
            } => (event_codes.clone(), component.clone(), *count),
            Event::ElapsedTime {
                event_codes,
                component,
                elapsed_micros,
            } => (event_codes.clone(), component.clone(), *elapsed_micros),
            Event::FrameRate {
                event_codes,
                component,
                frames_per_1000_seconds,
            } => (event_codes.clone(), component.clone(), *frames_per_1000_seconds),
            Event::MemoryUsage {
                event_codes,
                component,
                bytes,
            } => (event_codes.clone(), component.clone(), *bytes),
            _ => {
                return Err(Status::new(
                    StatusCode::InvalidArguments,
                    "event variant has no integer encoding",
                ))
            }
        };
        let packed = pack_event_codes(&event_codes)?;
        Ok(Observation::IntegerEvent {
            event_code: packed,
            component_name_hash: hash_component(component.as_deref().unwrap_or("")),
            value,
        })
    }
}

/// A 32-byte hash of a free-form component string; components never leave
/// the device in the clear.
fn hash_component(component: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"cobalt.component");
    hasher.update(component.as_bytes());
    hasher.finalize().into()
}
