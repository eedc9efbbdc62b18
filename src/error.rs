/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the mapping engine.
//!
//! Three enums model the three failure layers that actually surface to a
//! caller:
//!
//! * [`IngestError`] — a workflow/platform description could not be read.
//! * [`EvaluatorError`] — a [`Mapping`](crate::mapping::Mapping) failed
//!   validation before costing.
//! * [`MilpError`] — the external MILP solver backend failed or timed out.
//!
//! **Do not** collapse these into `anyhow::Error` inside the engine — the
//! structured variants let callers (the CLI, tests) match on *why* without
//! string parsing. `anyhow` is reserved for the CLI's own top-level glue.

use thiserror::Error;

/// Failure reading a platform/workflow description from disk.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot open {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("folders.cfg at {path} has no BENCHMARK_FOLDER entry")]
    MissingBenchmarkFolder { path: String },
}

/// Why a [`Mapping`](crate::mapping::Mapping) failed validation before an
/// evaluator would cost it.
///
/// Carried inside [`EvaluatorError`] variants so the caller always knows
/// which task/processor pair is at fault.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    /// A task in the graph has no entry in the mapping.
    IncompleteMapping { task: String },
    /// A task was mapped to a processor it is not compatible with.
    IncompatibleAssignment { task: String, processor: String },
    /// A capacity-bounded processor is over-subscribed.
    CapacityExceeded {
        processor: String,
        used: f64,
        capacity: f64,
    },
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationFailure::IncompleteMapping { task } => {
                write!(f, "task '{}' has no mapping entry", task)
            }
            ValidationFailure::IncompatibleAssignment { task, processor } => write!(
                f,
                "task '{}' is not compatible with processor '{}'",
                task, processor
            ),
            ValidationFailure::CapacityExceeded {
                processor,
                used,
                capacity,
            } => write!(
                f,
                "processor '{}' used area {:.2} exceeds capacity {:.2}",
                processor, used, capacity
            ),
        }
    }
}

/// Top-level error returned by
/// [`MappingEvaluator::evaluate_mapping_with_check`](crate::evaluator::MappingEvaluator::evaluate_mapping_with_check).
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("mapping failed validation: {0}")]
    Invalid(ValidationFailure),
}

/// Failure from the pluggable MILP mapper.
#[derive(Debug, Error)]
pub enum MilpError {
    #[error("MILP solver reported infeasible")]
    Infeasible,

    #[error("MILP solver backend error: {0}")]
    Solver(String),
}
