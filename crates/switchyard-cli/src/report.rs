// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 Switchyard Contributors

//! Point-in-time view of a directory for `switchyard inspect`.

use std::fmt;

use serde::Serialize;
use switchyard::{Role, ServiceType, SinkDirectory, SinkRef, SinkRefList, SinkStatus};

#[derive(Debug, Clone, Serialize)]
pub struct SlotReport {
    pub sink_id: i32,
    pub system_id: i32,
    pub service_type: ServiceType,
    pub name: String,
    pub status: SinkStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl SlotReport {
    fn of(reference: &SinkRef) -> Self {
        Self {
            sink_id: reference.sink_id(),
            system_id: reference.system_id(),
            service_type: reference.service_type(),
            name: reference.name(),
            status: reference.status(),
            endpoint: reference.endpoint(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleReport {
    pub role: &'static str,
    pub sink_id: i32,
    pub status: SinkStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryReport {
    pub directory_id: u64,
    pub system_id: i32,
    pub capacity: usize,
    pub modify_time: u64,
    pub warmup: bool,
    /// Slots whose service type is set. Untyped placeholders are omitted.
    pub slots: Vec<SlotReport>,
    pub roles: Vec<RoleReport>,
    pub strategies: Vec<i32>,
    pub local_sinks: Vec<i32>,
    pub remote_sinks: Vec<i32>,
    pub remote_admins: Vec<i32>,
}

fn sink_ids(list: SinkRefList) -> Vec<i32> {
    list.iter().map(|reference| reference.sink_id()).collect()
}

impl DirectoryReport {
    pub fn capture(directory: &dyn SinkDirectory, warmup: bool) -> Self {
        let slots = directory
            .sinks()
            .iter()
            .filter(|slot| !slot.service_type().is_null())
            .map(|slot| SlotReport::of(slot))
            .collect();
        let roles = Role::ALL
            .iter()
            .map(|&role| {
                let reference = directory.role(role);
                RoleReport {
                    role: role.mnemonic(),
                    sink_id: reference.sink_id(),
                    status: reference.status(),
                }
            })
            .collect();

        Self {
            directory_id: directory.id(),
            system_id: directory.system_id(),
            capacity: directory.capacity(),
            modify_time: directory.modify_time(),
            warmup,
            slots,
            roles,
            strategies: sink_ids(directory.strategies()),
            local_sinks: sink_ids(directory.local_sinks()),
            remote_sinks: sink_ids(directory.remote_sinks()),
            remote_admins: sink_ids(directory.remote_admins()),
        }
    }
}

impl fmt::Display for DirectoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "directory {} (system {}, capacity {}{})",
            self.directory_id,
            self.system_id,
            self.capacity,
            if self.warmup { ", warmup" } else { "" }
        )?;

        writeln!(f, "slots:")?;
        for slot in &self.slots {
            write!(
                f,
                "  {:>5}  {:<28} system {:<4} {:<5} {}",
                slot.sink_id,
                slot.service_type.as_str(),
                slot.system_id,
                slot.status.to_string(),
                slot.name
            )?;
            match &slot.endpoint {
                Some(endpoint) => writeln!(f, " @ {endpoint}")?,
                None => writeln!(f)?,
            }
        }

        writeln!(f, "roles:")?;
        for role in self.roles.iter().filter(|role| role.sink_id >= 0) {
            writeln!(f, "  {:<14} -> {} ({})", role.role, role.sink_id, role.status)?;
        }

        writeln!(f, "strategies:    {:?}", self.strategies)?;
        writeln!(f, "local sinks:   {:?}", self.local_sinks)?;
        writeln!(f, "remote sinks:  {:?}", self.remote_sinks)?;
        write!(f, "remote admins: {:?}", self.remote_admins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use switchyard::{Directory, RingBuffer};

    #[test]
    fn test_capture_lists_typed_slots_and_bound_roles() {
        let directory = Directory::new(1, 8).unwrap();
        let ring = Arc::new(RingBuffer::new(4, 32).unwrap());
        directory
            .create_and_register_local_queue_sink(2, ServiceType::Strategy, "momentum", ring)
            .unwrap();

        let report = DirectoryReport::capture(&directory, false);
        assert_eq!(report.capacity, 8);
        assert_eq!(report.slots.len(), 1);
        assert_eq!(report.slots[0].name, "momentum");
        assert_eq!(report.strategies, vec![2]);
        assert_eq!(report.local_sinks, vec![2]);
        assert_eq!(report.roles.len(), Role::COUNT);
        assert!(report.roles.iter().all(|role| role.sink_id == -1));

        let text = report.to_string();
        assert!(text.contains("momentum"));
        assert!(text.contains("strategies:    [2]"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["slots"][0]["service_type"], "strategy");
        assert_eq!(json["slots"][0]["status"], "up");
        assert!(json["slots"][0].get("endpoint").is_none());
    }
}
