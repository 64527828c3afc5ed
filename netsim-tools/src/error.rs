//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::warn;

// Replay errors.
#[derive(Debug)]
pub enum Error {
    Ospf(netsim_ospf::error::Error),
    Bgp(netsim_bgp::error::Error),
    EventParse(usize, serde_json::Error),
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::Ospf(error) => {
                error.log();
            }
            Error::Bgp(error) => {
                error.log();
            }
            Error::EventParse(line, error) => {
                warn!(%line, %error, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Ospf(error) => error.fmt(f),
            Error::Bgp(error) => error.fmt(f),
            Error::EventParse(line, _) => {
                write!(f, "failed to parse event at line {line}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Ospf(error) => Some(error),
            Error::Bgp(error) => Some(error),
            Error::EventParse(_, error) => Some(error),
        }
    }
}

impl From<netsim_ospf::error::Error> for Error {
    fn from(error: netsim_ospf::error::Error) -> Error {
        Error::Ospf(error)
    }
}

impl From<netsim_bgp::error::Error> for Error {
    fn from(error: netsim_bgp::error::Error) -> Error {
        Error::Bgp(error)
    }
}
