#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SystemProfile {
    #[prost(string, tag = "1")]
    pub board_name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub os_name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub arch: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub channel: ::prost::alloc::string::String,
    #[prost(uint32, repeated, tag = "5")]
    pub experiment_ids: ::prost::alloc::vec::Vec<u32>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ObservationMetadata {
    #[prost(uint32, tag = "1")]
    pub customer_id: u32,
    #[prost(uint32, tag = "2")]
    pub project_id: u32,
    #[prost(uint32, tag = "3")]
    pub metric_id: u32,
    #[prost(uint32, tag = "4")]
    pub report_id: u32,
    #[prost(uint32, tag = "5")]
    pub day_index: u32,
    #[prost(message, optional, tag = "6")]
    pub system_profile: ::core::option::Option<SystemProfile>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ForculusObservation {
    #[prost(bytes = "vec", tag = "1")]
    pub ciphertext: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub point_x: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub point_y: ::prost::alloc::vec::Vec<u8>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RapporObservation {
    #[prost(uint32, tag = "1")]
    pub cohort: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BasicRapporObservation {
    #[prost(bytes = "vec", tag = "1")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IntegerEventObservation {
    #[prost(uint64, tag = "1")]
    pub event_code: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub component_name_hash: ::prost::alloc::vec::Vec<u8>,
    #[prost(int64, tag = "3")]
    pub value: i64,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HistogramBucket {
    #[prost(uint32, tag = "1")]
    pub index: u32,
    #[prost(uint64, tag = "2")]
    pub count: u64,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HistogramObservation {
    #[prost(uint64, tag = "1")]
    pub event_code: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub component_name_hash: ::prost::alloc::vec::Vec<u8>,
    #[prost(message, repeated, tag = "3")]
    pub buckets: ::prost::alloc::vec::Vec<HistogramBucket>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CustomObservation {
    #[prost(map = "string, int64", tag = "1")]
    pub values: ::std::collections::HashMap<::prost::alloc::string::String, i64>,
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
pub struct UniqueActivesObservation {
    #[prost(message, optional, tag = "1")]
    pub window: ::core::option::Option<OnDeviceAggregationWindow>,
    #[prost(uint32, tag = "2")]
    pub event_code: u32,
    #[prost(bool, tag = "3")]
    pub active: bool,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PerDeviceNumericObservation {
    #[prost(message, optional, tag = "1")]
    pub window: ::core::option::Option<OnDeviceAggregationWindow>,
    #[prost(string, tag = "2")]
    pub component: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub packed_event_codes: u64,
    #[prost(int64, tag = "4")]
    pub value: i64,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReportParticipationObservation {}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Observation {
    #[prost(
        oneof = "observation::Value",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9"
    )]
    pub value: ::core::option::Option<observation::Value>,
}
/// Nested message and enum types in `Observation`.
pub mod observation {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(message, tag = "1")]
        Forculus(super::ForculusObservation),
        #[prost(message, tag = "2")]
        Rappor(super::RapporObservation),
        #[prost(message, tag = "3")]
        BasicRappor(super::BasicRapporObservation),
        #[prost(message, tag = "4")]
        IntegerEvent(super::IntegerEventObservation),
        #[prost(message, tag = "5")]
        Histogram(super::HistogramObservation),
        #[prost(message, tag = "6")]
        Custom(super::CustomObservation),
        #[prost(message, tag = "7")]
        UniqueActives(super::UniqueActivesObservation),
        #[prost(message, tag = "8")]
        PerDeviceNumeric(super::PerDeviceNumericObservation),
        #[prost(message, tag = "9")]
        ReportParticipation(super::ReportParticipationObservation),
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EncryptionScheme {
    None = 0,
    HybridEcdhV1 = 1,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EncryptedMessage {
    #[prost(enumeration = "EncryptionScheme", tag = "1")]
    pub scheme: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub ciphertext: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub public_key_fingerprint: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub ephemeral_public_key: ::prost::alloc::vec::Vec<u8>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Batch {
    #[prost(message, optional, tag = "1")]
    pub meta: ::core::option::Option<ObservationMetadata>,
    #[prost(message, repeated, tag = "2")]
    pub encrypted_observations: ::prost::alloc::vec::Vec<EncryptedMessage>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Envelope {
    #[prost(message, repeated, tag = "1")]
    pub batch: ::prost::alloc::vec::Vec<Batch>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PersistedObservationStore {
    #[prost(message, repeated, tag = "1")]
    pub envelopes: ::prost::alloc::vec::Vec<Envelope>,
}
