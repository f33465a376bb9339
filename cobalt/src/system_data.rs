//! A startup-computed snapshot of the running system, attached to
//! observations whose metric declares `system_profile_fields`.
//!
//! A mostly-static `SystemProfile` plus a dynamically updatable experiment
//! list, guarded by its own lock rather than the caller's.

use std::sync::RwLock;

use crate::proto::cobalt::observation::SystemProfile as WireSystemProfile;

/// Release stage of the running build; informs server-side filtering, not
/// represented in the wire `SystemProfile` itself but kept alongside it for
/// parity with the original `SystemData` interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStage {
    Debug,
    Fishfood,
    Dogfood,
    Ga,
}

/// A board/OS/arch/channel snapshot plus the experiment IDs currently
/// active on this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemProfile {
    pub board_name: String,
    pub os_name: String,
    pub arch: String,
    pub channel: String,
    pub experiment_ids: Vec<u32>,
}

impl From<SystemProfile> for WireSystemProfile {
    fn from(value: SystemProfile) -> Self {
        WireSystemProfile {
            board_name: value.board_name,
            os_name: value.os_name,
            arch: value.arch,
            channel: value.channel,
            experiment_ids: value.experiment_ids,
        }
    }
}

/// Holds the system profile plus the mutable experiment-state overlay.
/// Constructed once at startup and shared by reference thereafter; only
/// `set_experiment_state`/`set_channel` mutate it, each under the same
/// internal lock (mirrors the original's `experiments_mutex_`, but scoped to
/// cover the channel field too since our `SystemProfile` embeds it).
pub struct SystemData {
    release_stage: ReleaseStage,
    inner: RwLock<SystemProfile>,
}

impl SystemData {
    pub fn new(
        board_name: impl Into<String>,
        os_name: impl Into<String>,
        arch: impl Into<String>,
        channel: impl Into<String>,
        release_stage: ReleaseStage,
    ) -> Self {
        Self {
            release_stage,
            inner: RwLock::new(SystemProfile {
                board_name: board_name.into(),
                os_name: os_name.into(),
                arch: arch.into(),
                channel: channel.into(),
                experiment_ids: Vec::new(),
            }),
        }
    }

    pub fn system_profile(&self) -> SystemProfile {
        self.inner
            .read()
            .expect("system data lock poisoned")
            .clone()
    }

    pub fn release_stage(&self) -> ReleaseStage {
        self.release_stage
    }

    pub fn set_experiment_state(&self, experiment_ids: Vec<u32>) {
        self.inner
            .write()
            .expect("system data lock poisoned")
            .experiment_ids = experiment_ids;
    }

    pub fn set_channel(&self, channel: impl Into<String>) {
        self.inner.write().expect("system data lock poisoned").channel = channel.into();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test_log::test]
    fn set_experiment_state_is_visible_to_later_reads() {
        let data = SystemData::new("vim3", "fuchsia", "arm64", "stable", ReleaseStage::Ga);
        assert!(data.system_profile().experiment_ids.is_empty());
        data.set_experiment_state(vec![42, 7]);
        assert_eq!(data.system_profile().experiment_ids, vec![42, 7]);
    }

    #[test_log::test]
    fn set_channel_updates_snapshot() {
        let data = SystemData::new("vim3", "fuchsia", "arm64", "stable", ReleaseStage::Dogfood);
        data.set_channel("beta");
        assert_eq!(data.system_profile().channel, "beta");
    }
}
