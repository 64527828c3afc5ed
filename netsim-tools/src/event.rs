//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use ipnetwork::IpNetwork;
use netsim_bgp::damping::{DampingStats, FlapDamping};
use netsim_ospf::area::AreaType;
use netsim_ospf::instance::Instance;
use netsim_ospf::lsdb::ExternalRoute;
use netsim_ospf::packet::lsa::{LsaBody, LsaHdr, LsaRouterLink};
use netsim_utils::clock::ManualClock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::Error;

// Event that can be replayed from a record file.
#[derive(Clone, Debug, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Event {
    // LSA received from a neighbor.
    LsaRcvd {
        area_id: Ipv4Addr,
        hdr: LsaHdr,
        body: LsaBody,
    },
    // Local Router-LSA (re)origination.
    RouterLsaOrig {
        area_id: Ipv4Addr,
        #[serde(default)]
        links: Vec<LsaRouterLink>,
    },
    // External route redistribution.
    Redistribute(ExternalRoute),
    // Explicit LSDB aging, in seconds.
    Age { elapsed: u64 },
    // Refresh of self-originated LSAs.
    Refresh,
    // Simulated time moving forward, in seconds.
    ClockAdvance { secs: u64 },
    // BGP route events.
    RouteWithdrawn {
        prefix: IpNetwork,
    },
    RouteAnnounced {
        prefix: IpNetwork,
        #[serde(default)]
        attribute_changed: bool,
    },
    ClearHistory {
        prefix: IpNetwork,
    },
}

// Protocol state engines driven by a single simulated clock.
#[derive(Debug)]
pub struct Replay {
    clock: ManualClock,
    ospf: Instance<ManualClock>,
    damping: FlapDamping<ManualClock>,
}

// Final state of a replay session.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub router_id: Ipv4Addr,
    pub areas: Vec<AreaSummary>,
    pub damping: DampingStats,
    pub suppressed_routes: Vec<IpNetwork>,
}

#[derive(Debug, Serialize)]
pub struct AreaSummary {
    pub area_id: Ipv4Addr,
    pub area_type: AreaType,
    pub orig_lsa_count: u32,
    pub rcvd_lsa_count: u32,
    pub lsa_headers: Vec<LsaHdr>,
}

// ===== impl Replay =====

impl Replay {
    pub fn new(config: &Config) -> Result<Replay, Error> {
        let clock = ManualClock::new();
        let ospf = Instance::new(&config.ospf, clock.clone())?;
        let damping =
            FlapDamping::new(config.damping.clone(), clock.clone())?;

        Ok(Replay {
            clock,
            ospf,
            damping,
        })
    }

    // Parses and processes one line of a record file. Blank lines are
    // ignored.
    pub fn process_line(
        &mut self,
        lineno: usize,
        line: &str,
    ) -> Result<(), Error> {
        if line.trim().is_empty() {
            return Ok(());
        }
        let event = serde_json::from_str(line)
            .map_err(|error| Error::EventParse(lineno, error))?;
        self.process(event)
    }

    pub fn process(&mut self, event: Event) -> Result<(), Error> {
        debug!(?event, "processing event");

        match event {
            Event::LsaRcvd { area_id, hdr, body } => {
                self.ospf.receive_lsa(area_id, hdr, body)?;
            }
            Event::RouterLsaOrig { area_id, links } => {
                self.ospf.originate_router_lsa(area_id, links)?;
            }
            Event::Redistribute(route) => {
                self.ospf.redistribute(&route);
            }
            Event::Age { elapsed } => {
                self.ospf.age_lsas(elapsed);
            }
            Event::Refresh => {
                self.ospf.refresh_lsas();
            }
            Event::ClockAdvance { secs } => {
                // LSAs age in lockstep with the simulated clock.
                self.clock.advance_secs(secs);
                self.ospf.age_lsas(secs);
            }
            Event::RouteWithdrawn { prefix } => {
                self.damping.route_withdrawn(prefix);
            }
            Event::RouteAnnounced {
                prefix,
                attribute_changed,
            } => {
                self.damping.route_announced(prefix, attribute_changed);
            }
            Event::ClearHistory { prefix } => {
                self.damping.clear_history(&prefix);
            }
        }

        Ok(())
    }

    pub fn summary(&mut self) -> Summary {
        let areas = self
            .ospf
            .areas()
            .map(|area| {
                let stats = area.lsdb.stats();
                AreaSummary {
                    area_id: area.area_id,
                    area_type: area.area_type,
                    orig_lsa_count: stats.orig_lsa_count,
                    rcvd_lsa_count: stats.rcvd_lsa_count,
                    lsa_headers: area.lsdb.get_lsa_headers(),
                }
            })
            .collect();

        Summary {
            router_id: self.ospf.router_id,
            areas,
            damping: self.damping.stats(),
            suppressed_routes: self
                .damping
                .suppressed_routes()
                .copied()
                .collect(),
        }
    }
}
