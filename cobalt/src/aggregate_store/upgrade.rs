//! Version constants and the on-load upgrade routines for the two persisted
//! local-aggregation stores.

use crate::proto::cobalt::local_aggregation::{
    on_device_aggregation_window::Unit, AggregatedObservationHistoryStore, LocalAggregateStore,
    OnDeviceAggregationWindow,
};
use crate::status::{Status, StatusCode};

pub const CURRENT_LOCAL_AGGREGATE_STORE_VERSION: u32 = 1;
pub const CURRENT_OBSERVATION_HISTORY_STORE_VERSION: u32 = 0;
pub const MAX_ALLOWED_BACKFILL_DAYS: u32 = 1000;
pub const MAX_ALLOWED_AGGREGATION_DAYS: u32 = 365;
pub const MAX_ALLOWED_AGGREGATION_HOURS: u32 = 23;

/// Version 0 stored each report's window list as a flat `legacy_window_size_days`
/// field; version 1 moved to the sorted `windows` list shared with the rest of
/// the registry. Unknown versions are rejected so the caller can fall back to
/// an empty store.
pub fn maybe_upgrade_local_aggregate_store(
    mut store: LocalAggregateStore,
) -> Result<LocalAggregateStore, Status> {
    match store.version {
        v if v == CURRENT_LOCAL_AGGREGATE_STORE_VERSION => Ok(store),
        0 => {
            for entry in store.by_report_key.values_mut() {
                if let Some(config) = entry.config.as_mut() {
                    if config.windows.is_empty() && !config.legacy_window_size_days.is_empty() {
                        let mut days = std::mem::take(&mut config.legacy_window_size_days);
                        days.sort_unstable();
                        days.dedup();
                        config.windows = days
                            .into_iter()
                            .map(|d| OnDeviceAggregationWindow { unit: Some(Unit::Days(d)) })
                            .collect();
                    }
                }
            }
            store.version = CURRENT_LOCAL_AGGREGATE_STORE_VERSION;
            Ok(store)
        }
        other => Err(Status::new(
            StatusCode::Other,
            format!("unknown local aggregate store version {other}"),
        )),
    }
}

/// No version of `AggregatedObservationHistoryStore` predates the current
/// one, so this only validates; an unknown version is rejected the same way
///.
pub fn maybe_upgrade_observation_history_store(
    store: AggregatedObservationHistoryStore,
) -> Result<AggregatedObservationHistoryStore, Status> {
    if store.version == CURRENT_OBSERVATION_HISTORY_STORE_VERSION {
        Ok(store)
    } else {
        Err(Status::new(
            StatusCode::Other,
            format!("unknown observation history store version {}", store.version),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::proto::cobalt::local_aggregation::{AggregateStoreEntry, AggregationConfig};

    #[test_log::test]
    fn current_version_passes_through_unchanged() {
        let store = LocalAggregateStore {
            version: CURRENT_LOCAL_AGGREGATE_STORE_VERSION,
            by_report_key: Default::default(),
        };
        let upgraded = maybe_upgrade_local_aggregate_store(store.clone()).expect("no-op upgrade");
        assert_eq!(upgraded, store);
    }

    #[test_log::test]
    fn version_0_converts_legacy_window_list() {
        let mut by_report_key = std::collections::HashMap::new();
        by_report_key.insert(
            "key".to_string(),
            AggregateStoreEntry {
                config: Some(AggregationConfig {
                    customer_id: 1,
                    project_id: 1,
                    metric_id: 1,
                    report_id: 1,
                    metric_is_utc: true,
                    report_type: 0,
                    aggregation_type: 0,
                    windows: vec![],
                    max_event_code: 0,
                    legacy_window_size_days: vec![30, 7, 7],
                }),
                aggregates: None,
            },
        );
        let store = LocalAggregateStore { version: 0, by_report_key };
        let upgraded = maybe_upgrade_local_aggregate_store(store).expect("upgrades");
        assert_eq!(upgraded.version, CURRENT_LOCAL_AGGREGATE_STORE_VERSION);
        let config = upgraded.by_report_key["key"].config.as_ref().unwrap();
        assert_eq!(config.windows, vec![
            OnDeviceAggregationWindow { unit: Some(Unit::Days(7)) },
            OnDeviceAggregationWindow { unit: Some(Unit::Days(30)) },
        ]);
        assert!(config.legacy_window_size_days.is_empty());
    }

    #[test_log::test]
    fn unknown_version_is_rejected() {
        let store = LocalAggregateStore { version: 99, by_report_key: Default::default() };
        assert_eq!(
            maybe_upgrade_local_aggregate_store(store).unwrap_err().code(),
            StatusCode::Other
        );
    }
}
