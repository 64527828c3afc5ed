//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use netsim_utils::clock::Clock;
use tracing::debug_span;

use crate::area::{Area, AreaType};
use crate::config::InstanceCfg;
use crate::debug::Debug;
use crate::error::Error;
use crate::lsdb::ExternalRoute;
use crate::packet::lsa::{LsaBody, LsaHdr, LsaRouterFlags, LsaRouterLink};

// Local OSPF routing process.
//
// Owns one LSDB per configured area. The instance is a plain value: whoever
// embeds it is responsible for serializing access to it.
#[derive(Debug)]
pub struct Instance<C: Clock> {
    // Router ID.
    pub router_id: Ipv4Addr,
    // Areas, indexed by area ID.
    areas: BTreeMap<Ipv4Addr, Area<C>>,
    // Whether external routes are being redistributed.
    asbr: bool,
}

// ===== impl Instance =====

impl<C> Instance<C>
where
    C: Clock,
{
    pub fn new(config: &InstanceCfg, clock: C) -> Result<Instance<C>, Error> {
        let router_id = config.router_id.ok_or(Error::MissingRouterId)?;
        Debug::InstanceCreate(router_id).log();

        let mut areas = BTreeMap::new();
        for area_cfg in &config.areas {
            if areas.contains_key(&area_cfg.area_id) {
                return Err(Error::DuplicateArea(area_cfg.area_id));
            }
            let area =
                Area::new(area_cfg.area_id, area_cfg.area_type, clock.clone());
            areas.insert(area_cfg.area_id, area);
        }

        Ok(Instance {
            router_id,
            areas,
            asbr: false,
        })
    }

    pub fn area(&self, area_id: Ipv4Addr) -> Result<&Area<C>, Error> {
        self.areas
            .get(&area_id)
            .ok_or(Error::AreaIdNotFound(area_id))
    }

    pub fn area_mut(
        &mut self,
        area_id: Ipv4Addr,
    ) -> Result<&mut Area<C>, Error> {
        self.areas
            .get_mut(&area_id)
            .ok_or(Error::AreaIdNotFound(area_id))
    }

    pub fn areas(&self) -> impl Iterator<Item = &Area<C>> {
        self.areas.values()
    }

    pub fn is_abr(&self) -> bool {
        self.areas.len() > 1 && self.areas.values().any(|a| a.is_backbone())
    }

    pub fn is_asbr(&self) -> bool {
        self.asbr
    }

    // Processes an LSA received on the given area.
    pub fn receive_lsa(
        &mut self,
        area_id: Ipv4Addr,
        hdr: LsaHdr,
        body: LsaBody,
    ) -> Result<bool, Error> {
        let area = self.area_mut(area_id)?;
        Ok(area.receive_lsa(hdr, body))
    }

    // (Re)originates the Router-LSA of the given area.
    pub fn originate_router_lsa(
        &mut self,
        area_id: Ipv4Addr,
        links: Vec<LsaRouterLink>,
    ) -> Result<bool, Error> {
        let router_id = self.router_id;
        let flags = self.router_lsa_flags();
        let area = self.area_mut(area_id)?;
        Ok(area.lsdb.install_router_lsa(router_id, flags, links))
    }

    // Redistributes an external route into all areas that accept it.
    //
    // Normal areas get an AS-External-LSA and NSSA areas an NSSA-External-LSA.
    // Stub areas don't carry external routing information. Returns the number
    // of LSAs that were originated.
    pub fn redistribute(&mut self, route: &ExternalRoute) -> usize {
        let _span =
            debug_span!("redistribute", prefix = %route.prefix).entered();

        // Router-LSAs originated from now on advertise the E-bit.
        self.asbr = true;

        let router_id = self.router_id;
        let mut count = 0;
        for area in self.areas.values_mut() {
            let installed = match area.area_type {
                AreaType::Normal => {
                    area.lsdb.install_external_lsa(router_id, route)
                }
                AreaType::Nssa => area.lsdb.install_nssa_lsa(router_id, route),
                AreaType::Stub => false,
            };
            if installed {
                count += 1;
            }
        }
        count
    }

    // Ages the LSDBs of all areas. Returns the total number of flushed LSAs.
    pub fn age_lsas(&mut self, elapsed: u64) -> usize {
        self.areas
            .values_mut()
            .map(|area| area.lsdb.age_lsas(elapsed))
            .sum()
    }

    // Refreshes the self-originated LSAs of all areas. Returns the total
    // number of refreshed LSAs.
    pub fn refresh_lsas(&mut self) -> usize {
        self.areas
            .values_mut()
            .map(|area| area.lsdb.refresh_lsas())
            .sum()
    }

    fn router_lsa_flags(&self) -> LsaRouterFlags {
        let mut flags = LsaRouterFlags::empty();
        if self.is_abr() {
            flags.insert(LsaRouterFlags::B);
        }
        if self.is_asbr() {
            flags.insert(LsaRouterFlags::E);
        }
        flags
    }
}
