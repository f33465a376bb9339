//! Event and observation domain types shared across the encoder and
//! aggregation pipelines.

use crate::status::{Status, StatusCode};

/// Maximum number of event-code dimensions a metric may declare; bounded by
/// the 10-bit-per-dimension packing into a `u64`.
pub const MAX_EVENT_CODE_DIMENSIONS: usize = 6;
const BITS_PER_DIMENSION: u32 = 10;
const MAX_EVENT_CODE_VALUE: u32 = (1 << BITS_PER_DIMENSION) - 1;

/// Packs up to six dimensioned event codes into one `u64`, dimension 0 in
/// the low 10 bits. Used both as the aggregate store's map key component and
/// as the wire representation for PerDeviceNumeric/Histogram observations.
pub fn pack_event_codes(event_codes: &[u32]) -> Result<u64, Status> {
    if event_codes.len() > MAX_EVENT_CODE_DIMENSIONS {
        return Err(Status::new(
            StatusCode::InvalidArguments,
            format!(
                "too many event code dimensions: {} > {}",
                event_codes.len(),
                MAX_EVENT_CODE_DIMENSIONS
            ),
        ));
    }
    let mut packed: u64 = 0;
    for (i, code) in event_codes.iter().enumerate() {
        if *code > MAX_EVENT_CODE_VALUE {
            return Err(Status::new(
                StatusCode::InvalidArguments,
                format!("event code {code} exceeds 10-bit field width"),
            ));
        }
        packed |= (*code as u64) << (BITS_PER_DIMENSION * i as u32);
    }
    Ok(packed)
}

/// Inverse of [`pack_event_codes`] for a known dimension count.
pub fn unpack_event_codes(packed: u64, num_dimensions: usize) -> Vec<u32> {
    (0..num_dimensions)
        .map(|i| ((packed >> (BITS_PER_DIMENSION * i as u32)) & MAX_EVENT_CODE_VALUE as u64) as u32)
        .collect()
}

/// A single histogram bucket: (index, count).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramBucket {
    pub index: u32,
    pub count: u64,
}

/// An aggregation window, as stored sorted within an `AggregationConfig`.
/// Day-denominated windows sort after hour-denominated windows; the `Ord`
/// impl below encodes that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AggregationWindow {
    Hours(u32),
    Days(u32),
}

impl AggregationWindow {
    /// Window size expressed in whole days, for garbage-collection and
    /// backfill math. An hour-window contributes one day.
    pub fn as_days(&self) -> u32 {
        match self {
            AggregationWindow::Hours(_) => 1,
            AggregationWindow::Days(d) => *d,
        }
    }

    pub fn validate(&self) -> Result<(), Status> {
        match self {
            AggregationWindow::Hours(h) if *h == 0 || *h > 23 => Err(Status::new(
                StatusCode::InvalidArguments,
                format!("hour window {h} out of range 1..=23"),
            )),
            AggregationWindow::Days(d) if *d == 0 || *d > 365 => Err(Status::new(
                StatusCode::InvalidArguments,
                format!("day window {d} out of range 1..=365"),
            )),
            _ => Ok(()),
        }
    }
}

/// The variant forms a single logged client event can take.
#[derive(Debug, Clone)]
pub enum Event {
    Occurrence {
        event_codes: Vec<u32>,
    },
    Count {
        event_codes: Vec<u32>,
        component: Option<String>,
        period_duration_micros: u64,
        count: i64,
    },
    ElapsedTime {
        event_codes: Vec<u32>,
        component: Option<String>,
        elapsed_micros: i64,
    },
    FrameRate {
        event_codes: Vec<u32>,
        component: Option<String>,
        frames_per_1000_seconds: i64,
    },
    MemoryUsage {
        event_codes: Vec<u32>,
        component: Option<String>,
        bytes: i64,
    },
    IntHistogram {
        event_codes: Vec<u32>,
        component: Option<String>,
        buckets: Vec<HistogramBucket>,
    },
    Custom {
        values: std::collections::HashMap<String, CustomValue>,
    },
}

/// A value within a `CustomEvent`'s name→value map.
#[derive(Debug, Clone)]
pub enum CustomValue {
    Int(i64),
    String(String),
}

impl Event {
    /// The event codes declared on this event, empty for `Custom`.
    pub fn event_codes(&self) -> &[u32] {
        match self {
            Event::Occurrence { event_codes }
            | Event::Count { event_codes, .. }
            | Event::ElapsedTime { event_codes, .. }
            | Event::FrameRate { event_codes, .. }
            | Event::MemoryUsage { event_codes, .. }
            | Event::IntHistogram { event_codes, .. } => event_codes,
            Event::Custom { .. } => &[],
        }
    }

    pub fn component(&self) -> Option<&str> {
        match self {
            Event::Count { component, .. }
            | Event::ElapsedTime { component, .. }
            | Event::FrameRate { component, .. }
            | Event::MemoryUsage { component, .. }
            | Event::IntHistogram { component, .. } => component.as_deref(),
            Event::Occurrence { .. } | Event::Custom { .. } => None,
        }
    }
}

/// An encoded observation, ready for envelope packing. Mirrors
/// `proto::cobalt::observation::observation::Value` but as an ergonomic enum
/// the encoder builds before serializing to wire bytes.
#[derive(Debug, Clone)]
pub enum Observation {
    Forculus {
        ciphertext: Vec<u8>,
        point_x: Vec<u8>,
        point_y: Vec<u8>,
    },
    Rappor {
        cohort: u32,
        data: Vec<u8>,
    },
    BasicRappor {
        data: Vec<u8>,
    },
    IntegerEvent {
        event_code: u64,
        component_name_hash: [u8; 32],
        value: i64,
    },
    Histogram {
        event_code: u64,
        component_name_hash: [u8; 32],
        buckets: Vec<HistogramBucket>,
    },
    Custom {
        values: std::collections::HashMap<String, i64>,
    },
    UniqueActives {
        window: AggregationWindow,
        event_code: u32,
        active: bool,
    },
    PerDeviceNumeric {
        window: AggregationWindow,
        component: String,
        packed_event_codes: u64,
        value: i64,
    },
    ReportParticipation,
}

/// Identifies which (customer, project, metric, report, day, profile) an
/// observation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObservationMetadata {
    pub customer_id: u32,
    pub project_id: u32,
    pub metric_id: u32,
    pub report_id: u32,
    pub day_index: u32,
    pub system_profile: Option<crate::system_data::SystemProfile>,
}

/// (metric_id, report_id) pair, globally unique within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricReportId {
    pub metric_id: u32,
    pub report_id: u32,
}

/// The primary key into `AggregateStore`: a project key extended with a
/// `MetricReportId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportAggregationKey {
    pub customer_id: u32,
    pub project_id: u32,
    pub metric_id: u32,
    pub report_id: u32,
}

impl ReportAggregationKey {
    /// Deterministic serialization used as the map key within
    /// `LocalAggregateStore`/`AggregatedObservationHistoryStore`, base64
    /// encoded.
    pub fn to_base64_key(&self) -> String {
        let mut bytes = Vec::with_capacity(16);
        bytes.extend_from_slice(&self.customer_id.to_be_bytes());
        bytes.extend_from_slice(&self.project_id.to_be_bytes());
        bytes.extend_from_slice(&self.metric_id.to_be_bytes());
        bytes.extend_from_slice(&self.report_id.to_be_bytes());
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)
    }
}
