// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 Switchyard Contributors

//! Topology file loading.
//!
//! A topology names the local system, sizes its directory and local queues,
//! and lists the sinks to register at start-up.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use switchyard::ServiceType;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("topology file not found at {path}")]
    FileNotFound { path: PathBuf },

    #[error("invalid TOML at line {line}, column {column}: {message}")]
    InvalidToml {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("missing required fields: {fields:?}")]
    MissingRequiredFields { fields: Vec<String> },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("I/O error reading topology: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Topology {
    pub system: SystemConfig,
    pub queue: QueueConfig,
    pub network: NetworkConfig,
    #[serde(rename = "sink")]
    pub sinks: Vec<SinkConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub id: i32,
    pub name: String,
    /// Number of sink slots in the directory.
    pub capacity: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            id: 0,
            name: "switchyard".to_string(),
            capacity: 64,
        }
    }
}

/// Sizing of the ring buffer behind every local sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub slots: usize,
    pub slot_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            slots: 1024,
            slot_size: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub max_datagram_size: usize,
    pub bind: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_datagram_size: 1400,
            bind: "0.0.0.0:0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Local,
    Udp,
    /// Reserve the slot; it stays a placeholder.
    #[serde(rename = "none")]
    Unwired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    pub sink_id: i32,
    /// Owning system; defaults to the local system.
    #[serde(default)]
    pub system_id: Option<i32>,
    pub service_type: ServiceType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl SinkConfig {
    pub fn system_id_or(&self, local: i32) -> i32 {
        self.system_id.unwrap_or(local)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.service_type.as_str())
    }
}

impl Topology {
    /// Parsed bind address for outgoing UDP publications.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.network
            .bind
            .parse()
            .map_err(|e| ConfigError::invalid("network.bind", format!("{e}")))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.system.id < 0 {
            return Err(ConfigError::invalid("system.id", "must be non-negative"));
        }
        if self.system.capacity == 0 {
            return Err(ConfigError::invalid("system.capacity", "must be positive"));
        }
        if self.system.capacity > i32::MAX as usize {
            return Err(ConfigError::invalid(
                "system.capacity",
                format!("must not exceed {}", i32::MAX),
            ));
        }
        if self.queue.slots == 0 || self.queue.slot_size == 0 {
            return Err(ConfigError::invalid(
                "queue",
                "slots and slot_size must be positive",
            ));
        }
        if self.network.max_datagram_size == 0 {
            return Err(ConfigError::invalid(
                "network.max_datagram_size",
                "must be positive",
            ));
        }
        self.bind_addr()?;

        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for (index, sink) in self.sinks.iter().enumerate() {
            let field = |name: &str| format!("sink[{index}].{name}");

            if sink.sink_id < 0 || sink.sink_id as usize >= self.system.capacity {
                return Err(ConfigError::invalid(
                    field("sink_id"),
                    format!(
                        "{} is outside [0, {})",
                        sink.sink_id, self.system.capacity
                    ),
                ));
            }
            if !seen.insert(sink.sink_id) {
                return Err(ConfigError::invalid(
                    field("sink_id"),
                    format!("{} is declared more than once", sink.sink_id),
                ));
            }
            if sink.service_type.is_null() && sink.transport != TransportKind::Unwired {
                return Err(ConfigError::invalid(
                    field("service_type"),
                    "null sinks must use transport \"none\"",
                ));
            }

            let system_id = sink.system_id_or(self.system.id);
            match sink.transport {
                TransportKind::Local if system_id != self.system.id => {
                    return Err(ConfigError::invalid(
                        field("system_id"),
                        format!(
                            "local sinks belong to system {}, not {system_id}",
                            self.system.id
                        ),
                    ));
                }
                TransportKind::Udp => match sink.endpoint.as_deref() {
                    None => missing.push(field("endpoint")),
                    Some(endpoint) => {
                        endpoint.parse::<SocketAddr>().map_err(|e| {
                            ConfigError::invalid(field("endpoint"), format!("{e}"))
                        })?;
                    }
                },
                _ => {}
            }
        }

        if !missing.is_empty() {
            return Err(ConfigError::MissingRequiredFields { fields: missing });
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
struct ConfigOverrides {
    system_id: Option<String>,
    capacity: Option<String>,
}

/// Load a topology from `path`, applying `SWITCHYARD_*` environment overrides.
pub fn load_topology(path: &Path) -> Result<Topology, ConfigError> {
    load_topology_with_overrides(path, config_overrides_from_env())
}

/// Parse a topology from a TOML string, applying environment overrides.
pub fn load_topology_from_str(toml_str: &str) -> Result<Topology, ConfigError> {
    load_topology_from_str_with_overrides(toml_str, config_overrides_from_env())
}

fn load_topology_with_overrides(
    path: &Path,
    overrides: ConfigOverrides,
) -> Result<Topology, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(ConfigError::Io(e)),
    };

    load_topology_from_str_with_overrides(&contents, overrides)
}

fn load_topology_from_str_with_overrides(
    toml_str: &str,
    overrides: ConfigOverrides,
) -> Result<Topology, ConfigError> {
    let mut topology: Topology = toml::from_str(toml_str).map_err(|e| {
        let (line, column) = e.span().map_or((0, 0), |span| {
            let before = &toml_str[..span.start];
            let line = before.chars().filter(|&c| c == '\n').count() + 1;
            let column = before
                .rfind('\n')
                .map_or(span.start + 1, |nl| span.start - nl);
            (line, column)
        });
        ConfigError::InvalidToml {
            line,
            column,
            message: e.message().to_string(),
        }
    })?;

    apply_overrides(&mut topology, overrides)?;
    topology.validate()?;

    Ok(topology)
}

fn config_overrides_from_env() -> ConfigOverrides {
    ConfigOverrides {
        system_id: std::env::var("SWITCHYARD_SYSTEM_ID").ok(),
        capacity: std::env::var("SWITCHYARD_CAPACITY").ok(),
    }
}

fn apply_overrides(topology: &mut Topology, overrides: ConfigOverrides) -> Result<(), ConfigError> {
    if let Some(id) = overrides.system_id {
        topology.system.id = id
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid("SWITCHYARD_SYSTEM_ID", format!("not an integer: {id}")))?;
    }
    if let Some(capacity) = overrides.capacity {
        topology.system.capacity = capacity.trim().parse().map_err(|_| {
            ConfigError::invalid("SWITCHYARD_CAPACITY", format!("not an integer: {capacity}"))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse_without_env(toml_str: &str) -> Result<Topology, ConfigError> {
        load_topology_from_str_with_overrides(toml_str, ConfigOverrides::default())
    }

    fn valid_toml() -> &'static str {
        r#"
[system]
id = 1
name = "alpha"
capacity = 16

[queue]
slots = 64
slot_size = 256

[network]
max_datagram_size = 1200
bind = "127.0.0.1:0"

[[sink]]
sink_id = 1
service_type = "admin"
name = "admin"
transport = "local"

[[sink]]
sink_id = 2
service_type = "portfolio-and-risk"

[[sink]]
sink_id = 9
system_id = 2
service_type = "admin"
name = "remote-admin"
transport = "udp"
endpoint = "127.0.0.1:40123"

[[sink]]
sink_id = 10
service_type = "pricing"
transport = "none"
"#
    }

    #[test]
    fn test_parses_full_topology() {
        let topology = parse_without_env(valid_toml()).unwrap();
        assert_eq!(topology.system.id, 1);
        assert_eq!(topology.system.name, "alpha");
        assert_eq!(topology.system.capacity, 16);
        assert_eq!(topology.queue.slots, 64);
        assert_eq!(topology.network.max_datagram_size, 1200);
        assert_eq!(topology.sinks.len(), 4);

        let risk = &topology.sinks[1];
        assert_eq!(risk.service_type, ServiceType::PortfolioAndRisk);
        assert_eq!(risk.transport, TransportKind::Local);
        assert_eq!(risk.system_id_or(topology.system.id), 1);
        assert_eq!(risk.display_name(), "portfolio-and-risk");

        let remote = &topology.sinks[2];
        assert_eq!(remote.system_id, Some(2));
        assert_eq!(remote.transport, TransportKind::Udp);
        assert_eq!(remote.endpoint.as_deref(), Some("127.0.0.1:40123"));
    }

    #[test]
    fn test_empty_topology_uses_defaults() {
        let topology = parse_without_env("").unwrap();
        assert_eq!(topology.system.id, 0);
        assert_eq!(topology.system.capacity, 64);
        assert_eq!(topology.queue.slots, 1024);
        assert_eq!(topology.queue.slot_size, 512);
        assert_eq!(topology.network.bind, "0.0.0.0:0");
        assert!(topology.sinks.is_empty());
    }

    #[test]
    fn test_invalid_toml_reports_position() {
        let err = parse_without_env("[system]\nid = \"one\"\n").unwrap_err();
        match err {
            ConfigError::InvalidToml { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_service_type_is_rejected() {
        let err = parse_without_env(
            "[[sink]]\nsink_id = 1\nservice_type = \"teleport\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidToml { .. }));
    }

    #[test]
    fn test_rejects_negative_system_id() {
        let err = parse_without_env("[system]\nid = -1\n").unwrap_err();
        assert!(err.to_string().contains("system.id"));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = parse_without_env("[system]\ncapacity = 0\n").unwrap_err();
        assert!(err.to_string().contains("system.capacity"));
    }

    #[test]
    fn test_rejects_sink_id_outside_capacity() {
        let toml = r#"
[system]
capacity = 4

[[sink]]
sink_id = 4
service_type = "echo"
"#;
        let err = parse_without_env(toml).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for sink[0].sink_id: 4 is outside [0, 4)"
        );
    }

    #[test]
    fn test_rejects_duplicate_sink_ids() {
        let toml = r#"
[[sink]]
sink_id = 3
service_type = "echo"

[[sink]]
sink_id = 3
service_type = "pricing"
"#;
        let err = parse_without_env(toml).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_udp_sink_requires_endpoint() {
        let toml = r#"
[[sink]]
sink_id = 3
system_id = 2
service_type = "echo"
transport = "udp"
"#;
        let err = parse_without_env(toml).unwrap_err();
        match err {
            ConfigError::MissingRequiredFields { fields } => {
                assert_eq!(fields, vec!["sink[0].endpoint".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_local_sink_must_belong_to_local_system() {
        let toml = r#"
[system]
id = 1

[[sink]]
sink_id = 3
system_id = 2
service_type = "echo"
"#;
        let err = parse_without_env(toml).unwrap_err();
        assert!(err.to_string().contains("sink[0].system_id"));
    }

    #[test]
    fn test_overrides_apply_before_validation() {
        let overrides = ConfigOverrides {
            system_id: Some("7".to_string()),
            capacity: Some("128".to_string()),
        };
        let topology =
            load_topology_from_str_with_overrides("[system]\nid = 1\n", overrides).unwrap();
        assert_eq!(topology.system.id, 7);
        assert_eq!(topology.system.capacity, 128);

        let overrides = ConfigOverrides {
            system_id: None,
            capacity: Some("lots".to_string()),
        };
        let err = load_topology_from_str_with_overrides("", overrides).unwrap_err();
        assert!(err.to_string().contains("SWITCHYARD_CAPACITY"));
    }

    #[test]
    fn test_loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(valid_toml().as_bytes()).unwrap();

        let topology =
            load_topology_with_overrides(file.path(), ConfigOverrides::default()).unwrap();
        assert_eq!(topology.system.name, "alpha");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = load_topology_with_overrides(&path, ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { path: p } if p == path));
    }
}
