/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Platform configuration loading.
//!
//! Mirrors the reference platform generator (`platform_catalog`) but reads
//! its device/transfer-rate description from a user-supplied YAML file
//! instead of the built-in constant catalogue, for benchmarking against an
//! alternate hardware description. The load pipeline follows the same shape
//! used elsewhere in this crate for loosely-typed config: deserialize into a
//! private file-shaped struct, validate/default, then convert into the
//! public domain type ([`Platform`]).
//!
//! Expected YAML structure:
//! ```yaml
//! memories:
//!   Main_RAM:
//!     data_rate: 42672.0
//!     streaming_allowed: true
//! processors:
//!   CPU:
//!     serial_rate: 11600.0
//!     parallel_rate: 11600.0
//!     default_memory: Main_RAM
//! connections:
//!   - { a: CPU, b: Main_RAM, rate: 42672.0 }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::platform::{DeviceId, Memory, Platform, Processor};

#[derive(Debug, Deserialize)]
struct PlatformFile {
    #[serde(default)]
    memories: HashMap<String, MemoryEntry>,
    #[serde(default)]
    processors: HashMap<String, ProcessorEntry>,
    #[serde(default)]
    connections: Vec<ConnectionEntry>,
}

#[derive(Debug, Deserialize)]
struct MemoryEntry {
    data_rate: f64,
    #[serde(default = "default_memory_streaming")]
    streaming_allowed: bool,
}

fn default_memory_streaming() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ProcessorEntry {
    serial_rate: f64,
    parallel_rate: f64,
    default_memory: String,
    #[serde(default)]
    streaming_allowed: bool,
    #[serde(default = "default_capacity")]
    capacity: f64,
}

fn default_capacity() -> f64 {
    f64::INFINITY
}

#[derive(Debug, Deserialize)]
struct ConnectionEntry {
    a: String,
    b: String,
    rate: f64,
    #[serde(default)]
    directed: bool,
}

/// Parses `path` into a [`Platform`]: every memory/processor becomes a
/// device named by its YAML key, and every connection entry a (possibly
/// bidirectional) transfer rate between two such devices.
///
/// # Errors
/// Returns an error, with the file path in its context chain, if the file
/// cannot be read, the YAML is structurally invalid, or a processor's
/// `default_memory` or a connection's endpoint names a memory/processor the
/// file never declared.
pub fn load_platform(path: &Path) -> Result<Platform> {
    info!(path = %path.display(), "loading platform configuration");

    let content = std::fs::read_to_string(path).with_context(|| format!("cannot open platform configuration: {}", path.display()))?;
    let file: PlatformFile = serde_yaml::from_str(&content).with_context(|| format!("failed to parse platform YAML: {}", path.display()))?;

    let mut platform = Platform::new();
    let mut devices: HashMap<String, DeviceId> = HashMap::new();

    for (label, entry) in &file.memories {
        let id = platform.add_memory(Memory {
            label: label.clone(),
            streaming_allowed: entry.streaming_allowed,
            data_rate: entry.data_rate,
        });
        debug!(memory = %label, rate = entry.data_rate, "loaded memory");
        devices.insert(label.clone(), id);
    }

    for (label, entry) in &file.processors {
        let default_memory = *devices
            .get(&entry.default_memory)
            .with_context(|| format!("processor '{label}' names unknown default_memory '{}'", entry.default_memory))?;
        let id = platform.add_processor(Processor {
            label: label.clone(),
            streaming_allowed: entry.streaming_allowed,
            serial_rate: entry.serial_rate,
            parallel_rate: entry.parallel_rate,
            capacity: entry.capacity,
            default_memory,
        });
        debug!(processor = %label, serial_rate = entry.serial_rate, "loaded processor");
        devices.insert(label.clone(), id);
    }

    for conn in &file.connections {
        let &a = devices.get(&conn.a).with_context(|| format!("connection names unknown device '{}'", conn.a))?;
        let &b = devices.get(&conn.b).with_context(|| format!("connection names unknown device '{}'", conn.b))?;
        if conn.directed {
            platform.set_directed_connection(a, b, conn.rate);
        } else {
            platform.set_data_connection(a, b, conn.rate);
        }
    }

    info!(
        memories = file.memories.len(),
        processors = file.processors.len(),
        connections = file.connections.len(),
        "platform configuration loaded"
    );
    Ok(platform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    const SMALL_PLATFORM: &str = r#"
memories:
  Main_RAM:
    data_rate: 42672.0
processors:
  CPU:
    serial_rate: 11600.0
    parallel_rate: 11600.0
    default_memory: Main_RAM
connections:
  - { a: CPU, b: Main_RAM, rate: 42672.0 }
"#;

    #[test]
    fn loads_processor_and_memory_with_connection() {
        let f = yaml_tempfile(SMALL_PLATFORM);
        let platform = load_platform(f.path()).unwrap();

        let cpu = platform.find_processor_by_label("CPU").unwrap();
        let ram = platform.find_memory_by_label("Main_RAM").unwrap();
        assert_eq!(platform.transfer_rate_mbps(cpu, ram), 42672.0);
        assert_eq!(platform.transfer_rate_mbps(ram, cpu), 42672.0);
    }

    #[test]
    fn memory_streaming_allowed_defaults_true() {
        let f = yaml_tempfile(SMALL_PLATFORM);
        let platform = load_platform(f.path()).unwrap();
        let ram = platform.find_memory_by_label("Main_RAM").unwrap();
        assert!(platform.streaming_allowed(ram));
    }

    #[test]
    fn processor_streaming_allowed_defaults_false() {
        let f = yaml_tempfile(SMALL_PLATFORM);
        let platform = load_platform(f.path()).unwrap();
        let cpu = platform.find_processor_by_label("CPU").unwrap();
        assert!(!platform.streaming_allowed(cpu));
    }

    #[test]
    fn processor_capacity_defaults_infinite() {
        let f = yaml_tempfile(SMALL_PLATFORM);
        let platform = load_platform(f.path()).unwrap();
        let cpu = platform.find_processor_by_label("CPU").unwrap();
        assert_eq!(platform.processor(cpu).capacity, f64::INFINITY);
    }

    #[test]
    fn unknown_default_memory_is_reported() {
        let yaml = "processors:\n  CPU:\n    serial_rate: 1.0\n    parallel_rate: 1.0\n    default_memory: Nonexistent\n";
        let f = yaml_tempfile(yaml);
        assert!(load_platform(f.path()).is_err());
    }

    #[test]
    fn directed_connection_is_one_way() {
        let yaml = r#"
memories:
  A: { data_rate: 10.0 }
  B: { data_rate: 10.0 }
processors:
  CPU: { serial_rate: 1.0, parallel_rate: 1.0, default_memory: A }
connections:
  - { a: CPU, b: A, rate: 5.0, directed: true }
"#;
        let f = yaml_tempfile(yaml);
        let platform = load_platform(f.path()).unwrap();
        let cpu = platform.find_processor_by_label("CPU").unwrap();
        let a = platform.find_memory_by_label("A").unwrap();
        assert_eq!(platform.transfer_rate_mbps(cpu, a), 5.0);
        assert_eq!(platform.transfer_rate_mbps(a, cpu), 0.0);
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(load_platform(Path::new("/nonexistent/platform.yaml")).is_err());
    }
}
