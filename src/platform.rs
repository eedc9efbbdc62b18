/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Platform model: processors and memories joined by a directed, pairwise
//! transfer-rate graph.
//!
//! The original `Device`/`Processor`/`Memory` inheritance hierarchy is
//! replaced by a tagged [`DeviceId`] plus two flat arenas on [`Platform`],
//! per SPEC_FULL.md §9's "polymorphism over device kinds" note.

use std::collections::HashMap;

use crate::types::{Area, DataRate, DataSize, Time};

/// Identifies a processor or memory inside a [`Platform`]'s arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceId {
    Processor(usize),
    Memory(usize),
}

#[derive(Debug, Clone)]
pub struct Processor {
    pub label: String,
    pub streaming_allowed: bool,
    /// MB/s at 0% parallelizability.
    pub serial_rate: DataRate,
    /// MB/s at 100% parallelizability.
    pub parallel_rate: DataRate,
    /// Abstract capacity budget; `f64::INFINITY` means unconstrained.
    pub capacity: Area,
    pub default_memory: DeviceId,
}

impl Processor {
    /// `((100-p)/serial + p/parallel) * 10 * size`; infinite if the serial
    /// rate is non-positive.
    pub fn processing_time_ms(&self, size: DataSize, parallelizability: f64) -> Time {
        if self.serial_rate <= 0.0 {
            return f64::INFINITY;
        }
        ((100.0 - parallelizability) / self.serial_rate + parallelizability / self.parallel_rate)
            * 10.0
            * size
    }

    pub fn is_streaming_device(&self) -> bool {
        self.streaming_allowed
    }
}

#[derive(Debug, Clone)]
pub struct Memory {
    pub label: String,
    /// Defaults `true` in the catalogue factory — a real asymmetry with
    /// `Processor`'s `false` default, preserved per SPEC_FULL.md §9 (iii).
    pub streaming_allowed: bool,
    pub data_rate: DataRate,
}

/// Owns processors/memories and their pairwise directed transfer-rate table.
#[derive(Debug, Default)]
pub struct Platform {
    processors: Vec<Processor>,
    memories: Vec<Memory>,
    /// Unlisted pairs are infeasible (rate 0), except a device paired with
    /// itself, which is always infinite (zero-cost self-transfer).
    datarates: HashMap<(DeviceId, DeviceId), DataRate>,
}

impl Platform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_processor(&mut self, p: Processor) -> DeviceId {
        let id = DeviceId::Processor(self.processors.len());
        self.processors.push(p);
        id
    }

    pub fn add_memory(&mut self, m: Memory) -> DeviceId {
        let id = DeviceId::Memory(self.memories.len());
        self.memories.push(m);
        id
    }

    pub fn processor(&self, id: DeviceId) -> &Processor {
        match id {
            DeviceId::Processor(i) => &self.processors[i],
            DeviceId::Memory(_) => panic!("DeviceId does not refer to a processor"),
        }
    }

    pub fn memory(&self, id: DeviceId) -> &Memory {
        match id {
            DeviceId::Memory(i) => &self.memories[i],
            DeviceId::Processor(_) => panic!("DeviceId does not refer to a memory"),
        }
    }

    pub fn processors(&self) -> impl Iterator<Item = DeviceId> + '_ {
        (0..self.processors.len()).map(DeviceId::Processor)
    }

    pub fn memories(&self) -> impl Iterator<Item = DeviceId> + '_ {
        (0..self.memories.len()).map(DeviceId::Memory)
    }

    pub fn label(&self, id: DeviceId) -> &str {
        match id {
            DeviceId::Processor(i) => &self.processors[i].label,
            DeviceId::Memory(i) => &self.memories[i].label,
        }
    }

    pub fn streaming_allowed(&self, id: DeviceId) -> bool {
        match id {
            DeviceId::Processor(i) => self.processors[i].streaming_allowed,
            DeviceId::Memory(i) => self.memories[i].streaming_allowed,
        }
    }

    pub fn find_processor_by_label(&self, label: &str) -> Option<DeviceId> {
        self.processors
            .iter()
            .position(|p| p.label == label)
            .map(DeviceId::Processor)
    }

    pub fn find_memory_by_label(&self, label: &str) -> Option<DeviceId> {
        self.memories
            .iter()
            .position(|m| m.label == label)
            .map(DeviceId::Memory)
    }

    /// Sets a directed transfer rate `from -> to`.
    pub fn set_directed_connection(&mut self, from: DeviceId, to: DeviceId, rate: DataRate) {
        self.datarates.insert((from, to), rate);
    }

    /// Sets the same rate in both directions.
    pub fn set_data_connection(&mut self, a: DeviceId, b: DeviceId, rate: DataRate) {
        self.set_directed_connection(a, b, rate);
        self.set_directed_connection(b, a, rate);
    }

    /// A device's transfer rate to itself is infinite (zero-cost transfer);
    /// an unlisted pair is 0 (infeasible).
    pub fn transfer_rate_mbps(&self, from: DeviceId, to: DeviceId) -> DataRate {
        if from == to {
            return f64::INFINITY;
        }
        *self.datarates.get(&(from, to)).unwrap_or(&0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_platform() -> (Platform, DeviceId, DeviceId) {
        let mut p = Platform::new();
        let mem = p.add_memory(Memory {
            label: "Mem".into(),
            streaming_allowed: true,
            data_rate: 100.0,
        });
        let cpu = p.add_processor(Processor {
            label: "CPU".into(),
            streaming_allowed: false,
            serial_rate: 11600.0,
            parallel_rate: 11600.0,
            capacity: f64::INFINITY,
            default_memory: mem,
        });
        (p, cpu, mem)
    }

    #[test]
    fn self_transfer_rate_is_infinite() {
        let (p, cpu, _) = simple_platform();
        assert_eq!(p.transfer_rate_mbps(cpu, cpu), f64::INFINITY);
    }

    #[test]
    fn unset_pair_is_zero() {
        let (p, cpu, mem) = simple_platform();
        assert_eq!(p.transfer_rate_mbps(cpu, mem), 0.0);
    }

    #[test]
    fn set_data_connection_is_symmetric() {
        let (mut p, cpu, mem) = simple_platform();
        p.set_data_connection(cpu, mem, 50.0);
        assert_eq!(p.transfer_rate_mbps(cpu, mem), 50.0);
        assert_eq!(p.transfer_rate_mbps(mem, cpu), 50.0);
    }

    #[test]
    fn processing_time_zero_serial_rate_is_infinite() {
        let proc = Processor {
            label: "Dead".into(),
            streaming_allowed: false,
            serial_rate: 0.0,
            parallel_rate: 10.0,
            capacity: f64::INFINITY,
            default_memory: DeviceId::Memory(0),
        };
        assert_eq!(proc.processing_time_ms(1.0, 50.0), f64::INFINITY);
    }

    #[test]
    fn processing_time_matches_formula() {
        let (p, cpu, _) = simple_platform();
        let proc = p.processor(cpu);
        let t = proc.processing_time_ms(1.0, 100.0);
        assert!((t - 1000.0 / 11600.0).abs() < 1e-9);
    }
}
