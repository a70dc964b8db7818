// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML QoS profile loader.
//!
//! Provides YAML-based configuration for the QoS policies this crate
//! consumes, with a clean, human-friendly format.
//!
//! # Example YAML
//!
//! ```yaml
//! # qos_profiles.yaml
//! profiles:
//!   sensor_history:
//!     history:
//!       kind: KEEP_LAST
//!       depth: 100
//!     deadline:
//!       period_ms: 1000
//!     resource_limits:
//!       max_samples: 500
//!       max_instances: 5
//!       max_samples_per_instance: 100
//!
//!   archive:
//!     history:
//!       kind: KEEP_ALL
//!     memory_policy: DYNAMIC
//! default_profile: sensor_history
//! ```

use crate::qos::{Deadline, History, MemoryPolicy, QosProfile, ResourceLimits};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// YAML QoS profile loader.
pub struct YamlLoader;

/// Root YAML document structure.
#[derive(Debug, Deserialize)]
pub struct YamlQosDocument {
    /// Named QoS profiles.
    #[serde(default)]
    pub profiles: HashMap<String, YamlQosProfile>,

    /// Default profile name (optional).
    #[serde(default)]
    pub default_profile: Option<String>,
}

/// A single QoS profile in YAML format.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct YamlQosProfile {
    /// History configuration
    pub history: Option<YamlHistory>,

    /// Deadline configuration
    pub deadline: Option<YamlDeadline>,

    /// Resource limits
    pub resource_limits: Option<YamlResourceLimits>,

    /// Memory policy: PREALLOCATED, PREALLOCATED_REALLOC, or DYNAMIC
    pub memory_policy: Option<String>,
}

/// History policy in YAML format.
#[derive(Debug, Deserialize)]
pub struct YamlHistory {
    /// KEEP_LAST or KEEP_ALL
    pub kind: String,
    /// Depth for KEEP_LAST (ignored for KEEP_ALL).
    #[serde(default)]
    pub depth: Option<u32>,
}

/// Deadline policy in YAML format.
#[derive(Debug, Deserialize)]
pub struct YamlDeadline {
    /// Period in milliseconds.
    pub period_ms: u64,
}

/// Resource limits in YAML format. Omitted fields keep their defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct YamlResourceLimits {
    pub allocated_samples: Option<usize>,
    pub max_samples: Option<usize>,
    pub max_instances: Option<usize>,
    pub max_samples_per_instance: Option<usize>,
}

/// Profiles resolved from a YAML document.
#[derive(Debug)]
pub struct LoadedProfiles {
    pub profiles: HashMap<String, QosProfile>,
    pub default_profile: Option<String>,
}

impl LoadedProfiles {
    /// The profile named by `default_profile`, if both exist.
    pub fn default_qos(&self) -> Option<&QosProfile> {
        self.default_profile
            .as_deref()
            .and_then(|name| self.profiles.get(name))
    }
}

impl YamlLoader {
    /// Load QoS profiles from a YAML file.
    pub fn load_file(path: &Path) -> Result<LoadedProfiles, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        Self::load_str(&content)
    }

    /// Load QoS profiles from a YAML string.
    pub fn load_str(yaml: &str) -> Result<LoadedProfiles, String> {
        let doc: YamlQosDocument =
            serde_yaml::from_str(yaml).map_err(|e| format!("invalid QoS YAML: {}", e))?;

        let mut profiles = HashMap::new();
        for (name, raw) in doc.profiles {
            let profile = convert_profile(&raw).map_err(|e| format!("profile '{}': {}", name, e))?;
            profile.validate().map_err(|e| format!("profile '{}': {}", name, e))?;
            profiles.insert(name, profile);
        }

        if let Some(default) = &doc.default_profile {
            if !profiles.contains_key(default) {
                return Err(format!("default_profile '{}' is not defined", default));
            }
        }

        Ok(LoadedProfiles {
            profiles,
            default_profile: doc.default_profile,
        })
    }
}

fn convert_profile(raw: &YamlQosProfile) -> Result<QosProfile, String> {
    let mut qos = QosProfile::default();

    if let Some(history) = &raw.history {
        qos.history = match history.kind.as_str() {
            "KEEP_LAST" => History::KeepLast(history.depth.unwrap_or(1)),
            "KEEP_ALL" => History::KeepAll,
            other => return Err(format!("unknown history kind '{}'", other)),
        };
    }

    if let Some(deadline) = &raw.deadline {
        qos.deadline = Deadline::from_millis(deadline.period_ms);
    }

    if let Some(limits) = &raw.resource_limits {
        let defaults = ResourceLimits::default();
        qos.resource_limits = ResourceLimits {
            allocated_samples: limits.allocated_samples.unwrap_or(defaults.allocated_samples),
            max_samples: limits.max_samples.unwrap_or(defaults.max_samples),
            max_instances: limits.max_instances.unwrap_or(defaults.max_instances),
            max_samples_per_instance: limits
                .max_samples_per_instance
                .unwrap_or(defaults.max_samples_per_instance),
        };
    }

    if let Some(policy) = &raw.memory_policy {
        qos.memory_policy = match policy.as_str() {
            "PREALLOCATED" => MemoryPolicy::Preallocated,
            "PREALLOCATED_REALLOC" => MemoryPolicy::PreallocatedRealloc,
            "DYNAMIC" => MemoryPolicy::Dynamic,
            other => return Err(format!("unknown memory policy '{}'", other)),
        };
    }

    Ok(qos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
profiles:
  sensor_history:
    history:
      kind: KEEP_LAST
      depth: 100
    deadline:
      period_ms: 1000
    resource_limits:
      max_samples: 500
      max_instances: 5
      max_samples_per_instance: 100
  archive:
    history:
      kind: KEEP_ALL
    memory_policy: DYNAMIC
default_profile: sensor_history
"#;

    #[test]
    fn test_load_str_parses_profiles() {
        let loaded = YamlLoader::load_str(SAMPLE).expect("sample should parse");
        assert_eq!(loaded.profiles.len(), 2);

        let sensor = &loaded.profiles["sensor_history"];
        assert_eq!(sensor.history, History::KeepLast(100));
        assert_eq!(sensor.deadline, Deadline::from_millis(1000));
        assert_eq!(sensor.resource_limits.max_samples, 500);
        assert_eq!(sensor.resource_limits.max_instances, 5);

        let archive = &loaded.profiles["archive"];
        assert_eq!(archive.history, History::KeepAll);
        assert_eq!(archive.memory_policy, MemoryPolicy::Dynamic);
    }

    #[test]
    fn test_default_profile_resolution() {
        let loaded = YamlLoader::load_str(SAMPLE).expect("sample should parse");
        let default = loaded.default_qos().expect("default profile exists");
        assert_eq!(default.history, History::KeepLast(100));
    }

    #[test]
    fn test_unknown_history_kind_rejected() {
        let yaml = "profiles:\n  bad:\n    history:\n      kind: KEEP_SOME\n";
        let err = YamlLoader::load_str(yaml).unwrap_err();
        assert!(err.contains("unknown history kind"));
    }

    #[test]
    fn test_missing_default_profile_rejected() {
        let yaml = "profiles: {}\ndefault_profile: nope\n";
        let err = YamlLoader::load_str(yaml).unwrap_err();
        assert!(err.contains("not defined"));
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let yaml = "profiles:\n  bad:\n    history:\n      kind: KEEP_LAST\n      depth: 0\n";
        let err = YamlLoader::load_str(yaml).unwrap_err();
        assert!(err.contains("requires n > 0"));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SAMPLE.as_bytes()).expect("write sample");
        let loaded = YamlLoader::load_file(file.path()).expect("file should load");
        assert_eq!(loaded.default_profile.as_deref(), Some("sensor_history"));
    }
}
