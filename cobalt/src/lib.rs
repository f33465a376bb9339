//! Cobalt is the on-device half of a privacy-preserving telemetry pipeline:
//! it encodes logged events into observations using Forculus threshold
//! encryption, RAPPOR/Basic RAPPOR randomized response, or plain passthrough
//! encoding, rolls some of them up into daily local aggregates, packs the
//! result into encrypted envelopes, and ships those envelopes to a shuffler
//! over gRPC.
//!
//! # Getting started
//!
//! A `CobaltConfig` (see [`proto::cobalt::config`]) is decoded once at
//! startup and turned into a [`registry::Registry`]. From there, a
//! [`logger::Logger`] is the per-project entry point client code logs
//! events through; [`event_aggregator::EventAggregator`] and
//! [`pipeline::shipping_manager::ShippingManager`] run as background workers
//! moving data from the registry through to the network.

pub mod aggregate_store;
pub mod client_secret;
pub mod clock;
pub mod consistent_proto_store;
pub mod encoder;
pub mod event_aggregator;
pub mod logger;
pub mod pipeline;
pub mod registry;
pub mod status;
pub mod system_data;
pub mod types;
pub mod undated_event_manager;
pub mod util;

pub use client_secret::ClientSecret;
pub use clock::{Clock, ClockValidator, SystemClock, TimeZone};
pub use event_aggregator::{EventAggregator, EventAggregatorConfig};
pub use logger::Logger;
pub use registry::Registry;
pub use status::{Status, StatusCode};
pub use types::{Event, Observation, ObservationMetadata};
pub use undated_event_manager::UndatedEventManager;

/// Internal generated protobuf types - ideally you shouldn't need to do much
/// with them directly. Exported in case you need them.
pub mod proto;
