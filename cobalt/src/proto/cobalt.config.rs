#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CobaltConfig {
    #[prost(message, repeated, tag = "1")]
    pub customers: ::prost::alloc::vec::Vec<CustomerConfig>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CustomerConfig {
    #[prost(uint32, tag = "1")]
    pub customer_id: u32,
    #[prost(string, tag = "2")]
    pub customer_name: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "3")]
    pub projects: ::prost::alloc::vec::Vec<ProjectConfig>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProjectConfig {
    #[prost(uint32, tag = "1")]
    pub project_id: u32,
    #[prost(string, tag = "2")]
    pub project_name: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "3")]
    pub metrics: ::prost::alloc::vec::Vec<MetricDefinition>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MetricDimension {
    #[prost(uint32, tag = "1")]
    pub max_event_code: u32,
    #[prost(map = "uint32, string", tag = "2")]
    pub named_codes: ::std::collections::HashMap<u32, ::prost::alloc::string::String>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MetricDefinition {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(enumeration = "MetricType", tag = "3")]
    pub metric_type: i32,
    #[prost(message, repeated, tag = "4")]
    pub dimensions: ::prost::alloc::vec::Vec<MetricDimension>,
    #[prost(enumeration = "TimeZonePolicy", tag = "5")]
    pub time_zone_policy: i32,
    #[prost(message, repeated, tag = "6")]
    pub reports: ::prost::alloc::vec::Vec<ReportDefinition>,
    #[prost(string, repeated, tag = "7")]
    pub system_profile_fields: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RapporConfig {
    #[prost(double, tag = "1")]
    pub probability_p: f64,
    #[prost(double, tag = "2")]
    pub probability_q: f64,
    #[prost(uint32, tag = "3")]
    pub num_bloom_bits: u32,
    #[prost(uint32, tag = "4")]
    pub num_hashes: u32,
    #[prost(uint32, tag = "5")]
    pub num_cohorts: u32,
    #[prost(string, repeated, tag = "6")]
    pub categories: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ForculusConfig {
    #[prost(uint32, tag = "1")]
    pub threshold: u32,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnDeviceAggregationWindow {
    #[prost(oneof = "on_device_aggregation_window::Unit", tags = "1, 2")]
    pub unit: ::core::option::Option<on_device_aggregation_window::Unit>,
}
/// Nested message and enum types in `OnDeviceAggregationWindow`.
pub mod on_device_aggregation_window {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, Copy, PartialEq, ::prost::Oneof)]
    pub enum Unit {
        #[prost(uint32, tag = "1")]
        Days(u32),
        #[prost(uint32, tag = "2")]
        Hours(u32),
    }
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReportDefinition {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(enumeration = "ReportType", tag = "3")]
    pub report_type: i32,
    #[prost(enumeration = "AggregationType", tag = "4")]
    pub aggregation_type: i32,
    #[prost(message, repeated, tag = "5")]
    pub windows: ::prost::alloc::vec::Vec<OnDeviceAggregationWindow>,
    #[prost(message, optional, tag = "6")]
    pub rappor: ::core::option::Option<RapporConfig>,
    #[prost(message, optional, tag = "7")]
    pub forculus: ::core::option::Option<ForculusConfig>,
    #[prost(double, tag = "8")]
    pub noise_level: f64,
    #[prost(bool, tag = "9")]
    pub has_export_config: bool,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MetricType {
    Unspecified = 0,
    EventOccurred = 1,
    EventCount = 2,
    ElapsedTime = 3,
    FrameRate = 4,
    MemoryUsage = 5,
    IntHistogram = 6,
    Custom = 7,
}
impl MetricType {
    /// String value of the enum field names used in the ProtoBuf definition.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            MetricType::Unspecified => "METRIC_TYPE_UNSPECIFIED",
            MetricType::EventOccurred => "EVENT_OCCURRED",
            MetricType::EventCount => "EVENT_COUNT",
            MetricType::ElapsedTime => "ELAPSED_TIME",
            MetricType::FrameRate => "FRAME_RATE",
            MetricType::MemoryUsage => "MEMORY_USAGE",
            MetricType::IntHistogram => "INT_HISTOGRAM",
            MetricType::Custom => "CUSTOM",
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TimeZonePolicy {
    Unspecified = 0,
    Utc = 1,
    Local = 2,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ReportType {
    Unspecified = 0,
    SimpleOccurrenceCount = 1,
    UniqueNDayActives = 2,
    PerDeviceCount = 3,
    PerDeviceHistogram = 4,
    PerDeviceNumericStats = 5,
    Histogram = 6,
    Forculus = 7,
    StringRappor = 8,
    BasicRappor = 9,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AggregationType {
    Unspecified = 0,
    Sum = 1,
    Max = 2,
    Min = 3,
}
