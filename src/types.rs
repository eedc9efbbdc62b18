/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scalar unit aliases shared across the mapping engine.
//!
//! These stay plain `f64` aliases rather than newtypes: no single owning
//! struct attaches an invariant to the type itself (range checks live on the
//! struct that holds the value, e.g. `Task::parallelizability`), so a wrapper
//! would only add ceremony.

/// Milliseconds, unless stated otherwise.
pub type Time = f64;

/// Megabytes, unless stated otherwise.
pub type DataSize = f64;

/// Megabytes per second.
pub type DataRate = f64;

/// Abstract per-processor capacity cost.
pub type Area = f64;

/// A percentage in `[0, 100]`.
pub type Percent = f64;

/// A unitless multiplicative scale factor.
pub type ScaleFactor = f64;

/// RNG seed, resolved once at the CLI boundary.
pub type Seed = u64;
