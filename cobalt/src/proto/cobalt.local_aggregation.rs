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
pub struct AggregationConfig {
    #[prost(uint32, tag = "1")]
    pub customer_id: u32,
    #[prost(uint32, tag = "2")]
    pub project_id: u32,
    #[prost(uint32, tag = "3")]
    pub metric_id: u32,
    #[prost(uint32, tag = "4")]
    pub report_id: u32,
    #[prost(bool, tag = "5")]
    pub metric_is_utc: bool,
    #[prost(uint32, tag = "6")]
    pub report_type: u32,
    #[prost(uint32, tag = "7")]
    pub aggregation_type: u32,
    #[prost(message, repeated, tag = "8")]
    pub windows: ::prost::alloc::vec::Vec<OnDeviceAggregationWindow>,
    #[prost(uint32, tag = "9")]
    pub max_event_code: u32,
    #[prost(uint32, repeated, tag = "10")]
    pub legacy_window_size_days: ::prost::alloc::vec::Vec<u32>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DayValue {
    #[prost(int64, tag = "1")]
    pub value: i64,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DayActivity {
    #[prost(bool, tag = "1")]
    pub activity_indicator: bool,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UniqueActivesAggregates {
    #[prost(map = "uint32, message", tag = "1")]
    pub by_event_code: ::std::collections::HashMap<u32, EventCodeActivity>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventCodeActivity {
    #[prost(map = "uint32, message", tag = "1")]
    pub by_day: ::std::collections::HashMap<u32, DayActivity>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PerDeviceNumericAggregates {
    #[prost(map = "string, message", tag = "1")]
    pub by_component: ::std::collections::HashMap<::prost::alloc::string::String, PackedCodeValues>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PackedCodeValues {
    #[prost(map = "uint64, message", tag = "1")]
    pub by_packed_codes: ::std::collections::HashMap<u64, DayValues>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DayValues {
    #[prost(map = "uint32, message", tag = "1")]
    pub by_day: ::std::collections::HashMap<u32, DayValue>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReportAggregates {
    #[prost(oneof = "report_aggregates::Aggregates", tags = "1, 2")]
    pub aggregates: ::core::option::Option<report_aggregates::Aggregates>,
}
/// Nested message and enum types in `ReportAggregates`.
pub mod report_aggregates {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Aggregates {
        #[prost(message, tag = "1")]
        UniqueActives(super::UniqueActivesAggregates),
        #[prost(message, tag = "2")]
        PerDeviceNumeric(super::PerDeviceNumericAggregates),
    }
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AggregateStoreEntry {
    #[prost(message, optional, tag = "1")]
    pub config: ::core::option::Option<AggregationConfig>,
    #[prost(message, optional, tag = "2")]
    pub aggregates: ::core::option::Option<ReportAggregates>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LocalAggregateStore {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(map = "string, message", tag = "2")]
    pub by_report_key: ::std::collections::HashMap<::prost::alloc::string::String, AggregateStoreEntry>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WindowHistory {
    #[prost(map = "uint32, uint32", tag = "1")]
    pub last_generated_day_by_window: ::std::collections::HashMap<u32, u32>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PackedCodeHistory {
    #[prost(map = "uint64, message", tag = "1")]
    pub by_packed_codes: ::std::collections::HashMap<u64, WindowHistory>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ComponentHistory {
    #[prost(map = "string, message", tag = "1")]
    pub by_component: ::std::collections::HashMap<::prost::alloc::string::String, PackedCodeHistory>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReportHistory {
    #[prost(message, optional, tag = "1")]
    pub per_device: ::core::option::Option<ComponentHistory>,
    #[prost(map = "uint32, message", tag = "3")]
    pub unique_actives_by_event_code: ::std::collections::HashMap<u32, WindowHistory>,
    #[prost(map = "uint32, uint32", tag = "4")]
    pub report_participation_last_generated_day: ::std::collections::HashMap<u32, u32>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AggregatedObservationHistoryStore {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(map = "string, message", tag = "2")]
    pub by_report_key: ::std::collections::HashMap<::prost::alloc::string::String, ReportHistory>,
}
