//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::area::AreaType;
use crate::packet::lsa::LsaHdr;

// OSPF debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    // Instances
    InstanceCreate(Ipv4Addr),
    // Areas
    AreaCreate(Ipv4Addr, AreaType),
    // LSDB maintenance
    LsaDiscard(&'a LsaHdr, LsaDiscardReason),
    LsaInstall(&'a LsaHdr),
    LsaOriginate(&'a LsaHdr),
    LsaFlush(&'a LsaHdr, LsaFlushReason),
    LsaRefresh(&'a LsaHdr),
    LsdbClear(usize),
}

// Reason why an LSA was discarded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum LsaDiscardReason {
    NotNewer,
    TypeMismatch,
    InvalidAreaType(AreaType),
}

// Reason why an LSA is being flushed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum LsaFlushReason {
    Expiry,
    PrematureAging,
}

// ===== impl Debug =====

impl Debug<'_> {
    // Log debug message using the tracing API.
    pub(crate) fn log(&self) {
        match self {
            Debug::InstanceCreate(router_id) => {
                debug!(%router_id, "{}", self);
            }
            Debug::AreaCreate(area_id, area_type) => {
                debug_span!("area", %area_id).in_scope(|| {
                    debug!(?area_type, "{}", self);
                })
            }
            Debug::LsaDiscard(lsa_hdr, reason) => {
                // Parent span(s): lsdb
                debug!(?lsa_hdr, %reason, "{}", self);
            }
            Debug::LsaInstall(lsa_hdr)
            | Debug::LsaOriginate(lsa_hdr)
            | Debug::LsaRefresh(lsa_hdr) => {
                // Parent span(s): lsdb
                debug!(?lsa_hdr, "{}", self);
            }
            Debug::LsaFlush(lsa_hdr, reason) => {
                // Parent span(s): lsdb
                debug!(?lsa_hdr, %reason, "{}", self);
            }
            Debug::LsdbClear(count) => {
                // Parent span(s): lsdb
                debug!(%count, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::InstanceCreate(..) => {
                write!(f, "instance created")
            }
            Debug::AreaCreate(..) => {
                write!(f, "area created")
            }
            Debug::LsaDiscard(..) => {
                write!(f, "discarding LSA")
            }
            Debug::LsaInstall(..) => {
                write!(f, "installing LSA")
            }
            Debug::LsaOriginate(..) => {
                write!(f, "originating LSA")
            }
            Debug::LsaFlush(..) => {
                write!(f, "flushing LSA")
            }
            Debug::LsaRefresh(..) => {
                write!(f, "refreshing LSA")
            }
            Debug::LsdbClear(..) => {
                write!(f, "clearing LSDB")
            }
        }
    }
}

// ===== impl LsaDiscardReason =====

impl std::fmt::Display for LsaDiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LsaDiscardReason::NotNewer => {
                write!(f, "database copy is at least as recent")
            }
            LsaDiscardReason::TypeMismatch => {
                write!(f, "LSA type doesn't match the LSA body")
            }
            LsaDiscardReason::InvalidAreaType(area_type) => {
                write!(f, "LSA type not allowed in {area_type} area")
            }
        }
    }
}

// ===== impl LsaFlushReason =====

impl std::fmt::Display for LsaFlushReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LsaFlushReason::Expiry => {
                write!(f, "LSA reached MaxAge")
            }
            LsaFlushReason::PrematureAging => {
                write!(f, "premature aging")
            }
        }
    }
}
