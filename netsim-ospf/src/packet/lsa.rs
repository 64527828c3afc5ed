//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::time::Instant;

use bitflags::bitflags;
use derive_new::new;
use enum_as_inner::EnumAsInner;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::lsdb::LSA_MAX_AGE;
use crate::packet::Options;

// OSPF LSA.
//
// LSAs are never partially modified once installed in an LSDB. A newer
// instance replaces the stored one as a whole; the only exception is the
// age field, which is updated in place by the aging procedure.
#[derive(Clone, Debug, PartialEq)]
#[derive(Serialize)]
pub struct Lsa {
    // LSA header.
    pub hdr: LsaHdr,
    // LSA body.
    pub body: LsaBody,
    // Time the LSA was originated or installed.
    #[serde(skip)]
    pub install_time: Instant,
}

// OSPF LSA key. It serves both as a global LSA identifier and as a key to store
// LSAs in an LSDB.
//
// Please be aware that modifying the order of the fields will impact operations
// such as iterating over LSDBs.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, new)]
#[derive(Deserialize, Serialize)]
pub struct LsaKey {
    // LSA type.
    pub lsa_type: LsaType,
    // LSA advertising router.
    pub adv_rtr: Ipv4Addr,
    // LSA ID.
    pub lsa_id: Ipv4Addr,
}

// OSPFv2 LSA type.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct LsaType(pub u8);

// OSPFv2 LSA type code.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv2-parameters/ospfv2-parameters.xhtml#ospfv2-parameters-5
#[derive(Clone, Copy, Debug, Eq, Ord, FromPrimitive, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum LsaTypeCode {
    Router = 1,
    Network = 2,
    SummaryNetwork = 3,
    SummaryRouter = 4,
    AsExternal = 5,
    NssaExternal = 7,
}

//
// OSPFv2 LSA header.
//
// The sequence number is optional: LSAs learned from sources that don't
// carry one sort before any LSA that does. Length and checksum are computed
// by the packet codec and are left unset for locally built LSAs.
//
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LsaHdr {
    #[serde(default)]
    pub age: u16,
    #[serde(default)]
    pub options: Options,
    pub lsa_type: LsaType,
    pub lsa_id: Ipv4Addr,
    pub adv_rtr: Ipv4Addr,
    #[serde(default)]
    pub seq_no: Option<u32>,
    #[serde(default)]
    pub cksum: Option<u16>,
    #[serde(default)]
    pub length: Option<u16>,
}

// OSPFv2 LSA body.
#[derive(Clone, Debug, EnumAsInner, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum LsaBody {
    Router(LsaRouter),
    Network(LsaNetwork),
    SummaryNetwork(LsaSummary),
    SummaryRouter(LsaSummary),
    AsExternal(LsaAsExternal),
    NssaExternal(LsaAsExternal),
}

// OSPFv2 Router-LSA.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LsaRouter {
    #[serde(default)]
    pub flags: LsaRouterFlags,
    #[serde(default)]
    pub links: Vec<LsaRouterLink>,
}

// OSPFv2 Router Properties Registry.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv2-parameters/ospfv2-parameters.xhtml#ospfv2-parameters-11
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct LsaRouterFlags: u8 {
        const B = 0x01;
        const E = 0x02;
        const V = 0x04;
        const NT = 0x10;
    }
}

// OSPFv2 Router LSA Link Type.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv2-parameters/ospfv2-parameters.xhtml#ospfv2-parameters-7
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum LsaRouterLinkType {
    PointToPoint = 0x01,
    TransitNetwork = 0x02,
    StubNetwork = 0x03,
    VirtualLink = 0x04,
}

#[derive(Clone, Debug, Eq, PartialEq, new)]
#[derive(Deserialize, Serialize)]
pub struct LsaRouterLink {
    pub link_type: LsaRouterLinkType,
    pub link_id: Ipv4Addr,
    pub link_data: Ipv4Addr,
    pub metric: u16,
}

// OSPFv2 Network-LSA.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LsaNetwork {
    pub mask: Ipv4Addr,
    pub attached_rtrs: BTreeSet<Ipv4Addr>,
}

// OSPFv2 Summary-LSA (types 3 and 4).
#[derive(Clone, Debug, Eq, PartialEq, new)]
#[derive(Deserialize, Serialize)]
pub struct LsaSummary {
    pub mask: Ipv4Addr,
    pub metric: u32,
}

// OSPFv2 AS-External-LSA. NSSA-External-LSAs (RFC 3101) share the same
// format.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LsaAsExternal {
    pub mask: Ipv4Addr,
    #[serde(default)]
    pub flags: LsaAsExternalFlags,
    pub metric: u32,
    #[serde(default)]
    pub fwd_addr: Option<Ipv4Addr>,
    #[serde(default)]
    pub tag: u32,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct LsaAsExternalFlags: u8 {
        const E = 0x80;
    }
}

// External metric type, as encoded by the E-bit of external LSAs.
//
// Type 1 metrics are comparable to the link-state metric, whereas type 2
// metrics are considered larger than any intra-AS path.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExternalMetricType {
    Type1,
    #[default]
    Type2,
}

// ===== impl Lsa =====

impl Lsa {
    pub fn new(
        age: u16,
        options: Options,
        lsa_id: Ipv4Addr,
        adv_rtr: Ipv4Addr,
        seq_no: Option<u32>,
        body: LsaBody,
        install_time: Instant,
    ) -> Self {
        // Build LSA header (the length and checksum are computed later).
        let hdr = LsaHdr::new(
            age,
            options,
            body.lsa_type(),
            lsa_id,
            adv_rtr,
            seq_no,
        );

        Lsa {
            hdr,
            body,
            install_time,
        }
    }
}

// ===== impl LsaType =====

impl LsaType {
    pub fn type_code(&self) -> Option<LsaTypeCode> {
        LsaTypeCode::from_u8(self.0)
    }

    pub fn is_summary(&self) -> bool {
        matches!(
            self.type_code(),
            Some(LsaTypeCode::SummaryNetwork | LsaTypeCode::SummaryRouter)
        )
    }
}

impl std::fmt::Display for LsaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<LsaTypeCode> for LsaType {
    fn from(code: LsaTypeCode) -> LsaType {
        LsaType(code as u8)
    }
}

// ===== impl LsaHdr =====

impl LsaHdr {
    pub fn new(
        age: u16,
        options: Options,
        lsa_type: LsaType,
        lsa_id: Ipv4Addr,
        adv_rtr: Ipv4Addr,
        seq_no: Option<u32>,
    ) -> Self {
        LsaHdr {
            age,
            options,
            lsa_type,
            lsa_id,
            adv_rtr,
            seq_no,
            cksum: None,
            length: None,
        }
    }

    pub fn key(&self) -> LsaKey {
        LsaKey {
            lsa_type: self.lsa_type,
            adv_rtr: self.adv_rtr,
            lsa_id: self.lsa_id,
        }
    }

    pub fn is_maxage(&self) -> bool {
        self.age >= LSA_MAX_AGE
    }
}

// ===== impl LsaBody =====

impl LsaBody {
    pub fn lsa_type(&self) -> LsaType {
        match self {
            LsaBody::Router(_) => LsaTypeCode::Router.into(),
            LsaBody::Network(_) => LsaTypeCode::Network.into(),
            LsaBody::SummaryNetwork(_) => LsaTypeCode::SummaryNetwork.into(),
            LsaBody::SummaryRouter(_) => LsaTypeCode::SummaryRouter.into(),
            LsaBody::AsExternal(_) => LsaTypeCode::AsExternal.into(),
            LsaBody::NssaExternal(_) => LsaTypeCode::NssaExternal.into(),
        }
    }

    pub fn as_summary(&self) -> Option<&LsaSummary> {
        match self {
            LsaBody::SummaryNetwork(summary)
            | LsaBody::SummaryRouter(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn as_external(&self) -> Option<&LsaAsExternal> {
        match self {
            LsaBody::AsExternal(ext) | LsaBody::NssaExternal(ext) => Some(ext),
            _ => None,
        }
    }
}

// ===== impl LsaAsExternal =====

impl LsaAsExternal {
    pub fn metric_type(&self) -> ExternalMetricType {
        if self.flags.contains(LsaAsExternalFlags::E) {
            ExternalMetricType::Type2
        } else {
            ExternalMetricType::Type1
        }
    }
}

// ===== impl ExternalMetricType =====

impl From<ExternalMetricType> for LsaAsExternalFlags {
    fn from(metric_type: ExternalMetricType) -> LsaAsExternalFlags {
        match metric_type {
            ExternalMetricType::Type1 => LsaAsExternalFlags::empty(),
            ExternalMetricType::Type2 => LsaAsExternalFlags::E,
        }
    }
}
