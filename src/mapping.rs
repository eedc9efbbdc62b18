/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! [`Mapping`]: the partial function Task → (proc, mem_in, mem_out), plus the
//! [`MappingView`] overlay used by iterative mappers to score candidate moves
//! without reallocating a full copy of the base mapping.

use std::collections::HashMap;

use crate::platform::DeviceId;
use crate::task_graph::{TaskGraph, TaskId};

/// A task's complete device assignment: the processor plus its input and
/// output staging memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DevicePair {
    pub proc: DeviceId,
    pub mem_in: DeviceId,
    pub mem_out: DeviceId,
}

impl DevicePair {
    pub fn new(proc: DeviceId, mem_in: DeviceId, mem_out: DeviceId) -> Self {
        DevicePair {
            proc,
            mem_in,
            mem_out,
        }
    }

    /// A device pair whose input and output memory are the same device.
    pub fn same_memory(proc: DeviceId, mem: DeviceId) -> Self {
        DevicePair::new(proc, mem, mem)
    }
}

/// Read-only lookup shared by [`Mapping`] and [`MappingView`], so the
/// evaluator and sortings can be written once against either.
pub trait MappingLookup {
    fn lookup(&self, task: TaskId) -> Option<DevicePair>;

    fn proc(&self, task: TaskId) -> Option<DeviceId> {
        self.lookup(task).map(|p| p.proc)
    }

    fn mem_in(&self, task: TaskId) -> Option<DeviceId> {
        self.lookup(task).map(|p| p.mem_in)
    }

    fn mem_out(&self, task: TaskId) -> Option<DeviceId> {
        self.lookup(task).map(|p| p.mem_out)
    }
}

/// Task → (proc, mem_in, mem_out) partial function.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    assignments: HashMap<TaskId, DevicePair>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, task: TaskId, pair: DevicePair) {
        self.assignments.insert(task, pair);
    }

    pub fn unset(&mut self, task: TaskId) {
        self.assignments.remove(&task);
    }

    pub fn get(&self, task: TaskId) -> Option<DevicePair> {
        self.assignments.get(&task).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.assignments.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskId, DevicePair)> + '_ {
        self.assignments.iter().map(|(&k, &v)| (k, v))
    }

    /// Every task in `graph` has an entry.
    pub fn is_complete(&self, graph: &TaskGraph) -> bool {
        graph.tasks().all(|t| self.assignments.contains_key(&t))
    }
}

impl MappingLookup for Mapping {
    fn lookup(&self, task: TaskId) -> Option<DevicePair> {
        self.get(task)
    }
}

/// An overlay composing a base [`Mapping`] with local deltas. Reads check the
/// deltas first, then fall through to the base. `apply` merges the deltas
/// onto a target mapping; `reset` rebinds the base reference and clears the
/// deltas without freeing their backing allocation.
pub struct MappingView<'a> {
    base: &'a Mapping,
    deltas: HashMap<TaskId, DevicePair>,
}

impl<'a> MappingView<'a> {
    pub fn new(base: &'a Mapping) -> Self {
        MappingView {
            base,
            deltas: HashMap::new(),
        }
    }

    pub fn set(&mut self, task: TaskId, pair: DevicePair) {
        self.deltas.insert(task, pair);
    }

    pub fn base(&self) -> &Mapping {
        self.base
    }

    pub fn deltas(&self) -> impl Iterator<Item = (TaskId, DevicePair)> + '_ {
        self.deltas.iter().map(|(&k, &v)| (k, v))
    }

    /// Merges deltas onto `target`, leaving this view's deltas untouched.
    pub fn apply(&self, target: &mut Mapping) {
        for (&task, &pair) in &self.deltas {
            target.set(task, pair);
        }
    }

    /// Rebinds to a new base and clears deltas, keeping the deltas map's
    /// allocated capacity for the next round of candidate moves.
    pub fn reset(&mut self, base: &'a Mapping) {
        self.base = base;
        self.deltas.clear();
    }
}

impl<'a> MappingLookup for MappingView<'a> {
    fn lookup(&self, task: TaskId) -> Option<DevicePair> {
        self.deltas.get(&task).copied().or_else(|| self.base.get(task))
    }
}
