//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use serde::Deserialize;

use crate::area::AreaType;

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstanceCfg {
    pub router_id: Option<Ipv4Addr>,
    pub areas: Vec<AreaCfg>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaCfg {
    pub area_id: Ipv4Addr,
    #[serde(default)]
    pub area_type: AreaType,
}

// ===== impl InstanceCfg =====

impl Default for InstanceCfg {
    fn default() -> InstanceCfg {
        InstanceCfg {
            router_id: None,
            areas: vec![AreaCfg::backbone()],
        }
    }
}

// ===== impl AreaCfg =====

impl AreaCfg {
    pub fn backbone() -> AreaCfg {
        AreaCfg {
            area_id: Ipv4Addr::UNSPECIFIED,
            area_type: AreaType::Normal,
        }
    }
}
