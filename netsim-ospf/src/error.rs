//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use tracing::warn;

// OSPF errors.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    // Configuration
    MissingRouterId,
    DuplicateArea(Ipv4Addr),
    // Lookups
    AreaIdNotFound(Ipv4Addr),
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::MissingRouterId => {
                warn!("{}", self);
            }
            Error::DuplicateArea(area_id) | Error::AreaIdNotFound(area_id) => {
                warn!(%area_id, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingRouterId => {
                write!(f, "missing router-id")
            }
            Error::DuplicateArea(..) => {
                write!(f, "duplicate area configuration")
            }
            Error::AreaIdNotFound(..) => {
                write!(f, "area ID not found")
            }
        }
    }
}

impl std::error::Error for Error {}
