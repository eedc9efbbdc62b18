/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The `Mapper` trait all algorithms implement, plus the shared
//! sub-modules.

pub mod decomposition;
pub mod genetic;
pub mod greedy;
pub mod heft;
pub mod milp;
pub mod path_based;
pub mod peft;
pub mod simulated_annealing;

use crate::mapping::Mapping;
use crate::system::System;

/// Produces a task-to-device mapping for a system. An empty `Mapping`
/// signals "no solution this attempt" (timeout/infeasible) — mappers never
/// panic or abort the process on a failed search.
pub trait Mapper<S: System> {
    fn label(&self) -> &str;

    fn map(&self, system: &S) -> Mapping;
}
