//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::warn;

// BGP errors.
#[derive(Debug, PartialEq)]
pub enum Error {
    // Route flap damping configuration
    InvalidDampingParameter(&'static str, f64),
    InvalidHalfLife(u32),
    InvalidThresholds(f64, f64),
    InvalidMaxSuppressTime(u32, u32),
    InvalidCeiling(f64, f64),
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::InvalidDampingParameter(name, value) => {
                warn!(%name, %value, "{}", self);
            }
            Error::InvalidHalfLife(half_life) => {
                warn!(%half_life, "{}", self);
            }
            Error::InvalidThresholds(reuse, suppress) => {
                warn!(%reuse, %suppress, "{}", self);
            }
            Error::InvalidMaxSuppressTime(max_suppress_time, half_life) => {
                warn!(%max_suppress_time, %half_life, "{}", self);
            }
            Error::InvalidCeiling(ceiling, suppress) => {
                warn!(%ceiling, %suppress, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidDampingParameter(name, _) => {
                write!(f, "invalid damping parameter: {name}")
            }
            Error::InvalidHalfLife(..) => {
                write!(f, "damping half-life must be greater than zero")
            }
            Error::InvalidThresholds(..) => {
                write!(
                    f,
                    "reuse threshold must be lower than the suppress threshold"
                )
            }
            Error::InvalidMaxSuppressTime(..) => {
                write!(
                    f,
                    "maximum suppress time can't be shorter than the half-life"
                )
            }
            Error::InvalidCeiling(..) => {
                write!(
                    f,
                    "penalty ceiling is lower than the suppress threshold"
                )
            }
        }
    }
}

impl std::error::Error for Error {}
