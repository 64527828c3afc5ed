//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use netsim_utils::clock::Clock;
use serde::{Deserialize, Serialize};
use tracing::debug_span;

use crate::debug::{Debug, LsaDiscardReason};
use crate::lsdb::Lsdb;
use crate::packet::lsa::{LsaBody, LsaHdr, LsaType, LsaTypeCode};

#[derive(Debug)]
pub struct Area<C: Clock> {
    // Area ID.
    pub area_id: Ipv4Addr,
    // Area type.
    pub area_type: AreaType,
    // Area-scope LSDB.
    pub lsdb: Lsdb<C>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AreaType {
    #[default]
    Normal,
    Stub,
    Nssa,
}

// ===== impl Area =====

impl<C> Area<C>
where
    C: Clock,
{
    pub fn new(area_id: Ipv4Addr, area_type: AreaType, clock: C) -> Area<C> {
        Debug::AreaCreate(area_id, area_type).log();

        Area {
            area_id,
            area_type,
            lsdb: Lsdb::new(area_id, clock),
        }
    }

    pub fn is_backbone(&self) -> bool {
        self.area_id.is_unspecified()
    }

    // Installs an LSA received from a neighbor, provided that its type is
    // acceptable in this area.
    pub fn receive_lsa(&mut self, hdr: LsaHdr, body: LsaBody) -> bool {
        if !lsa_type_is_valid(self.area_type, hdr.lsa_type) {
            let reason = LsaDiscardReason::InvalidAreaType(self.area_type);
            debug_span!("area", area_id = %self.area_id).in_scope(|| {
                Debug::LsaDiscard(&hdr, reason).log();
            });
            return false;
        }

        self.lsdb.add_lsa(hdr, body)
    }
}

// ===== impl AreaType =====

impl std::fmt::Display for AreaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AreaType::Normal => write!(f, "normal"),
            AreaType::Stub => write!(f, "stub"),
            AreaType::Nssa => write!(f, "NSSA"),
        }
    }
}

// ===== global functions =====

// Checks whether the given LSA type can be accepted in an area of the
// provided type.
//
// AS-external and type-4 summary LSAs (as per errata 3746 of RFC 2328) are
// rejected in stub/NSSA areas. NSSA-external LSAs are only valid in NSSA
// areas (RFC 3101).
pub fn lsa_type_is_valid(area_type: AreaType, lsa_type: LsaType) -> bool {
    match lsa_type.type_code() {
        None => false,
        Some(LsaTypeCode::SummaryRouter | LsaTypeCode::AsExternal) => {
            area_type == AreaType::Normal
        }
        Some(LsaTypeCode::NssaExternal) => area_type == AreaType::Nssa,
        Some(_) => true,
    }
}

// ===== unit tests =====
