//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use derive_new::new;
use ipnetwork::Ipv4Network;
use netsim_utils::clock::Clock;
use serde::{Deserialize, Serialize};
use tracing::debug_span;

use crate::debug::{Debug, LsaDiscardReason, LsaFlushReason};
use crate::packet::Options;
use crate::packet::lsa::{
    ExternalMetricType, Lsa, LsaAsExternal, LsaBody, LsaHdr, LsaKey,
    LsaRouter, LsaRouterFlags, LsaRouterLink, LsaType, LsaTypeCode,
};

// Architectural Constants.
pub const LSA_REFRESH_TIME: u16 = 1800;
pub const LSA_MAX_AGE: u16 = 3600;
pub const LSA_INFINITY: u32 = 0x00ffffff;
pub const LSA_INIT_SEQ_NO: u32 = 0x80000001;
pub const LSA_MAX_SEQ_NO: u32 = 0x7fffffff;
pub const LSA_RESERVED_SEQ_NO: u32 = 0x80000000;

// Maximum size of the LSA log record.
const LSA_LOG_MAX_SIZE: usize = 64;

// Link-State Database of a single OSPF area.
//
// The LSDB has no timers of its own. LSA aging is driven by the owner through
// `age_lsas` (or `age_tick`), and all timestamps come from the injected clock.
#[derive(Debug)]
pub struct Lsdb<C: Clock> {
    // Area ID.
    pub area_id: Ipv4Addr,
    // LSA entries, indexed by LSA key.
    tree: BTreeMap<LsaKey, LsaEntry>,
    // Last time `age_tick` was processed.
    last_age_tick: Instant,
    // Log of the most recent LSDB changes.
    lsa_log: VecDeque<LsaLogEntry>,
    lsa_log_next_id: u32,
    // Statistics.
    stats: LsdbStats,
    // Time source.
    clock: C,
}

#[derive(Clone, Debug)]
pub struct LsaEntry {
    // LSA data.
    pub data: Arc<Lsa>,
    // LSA entry flags.
    pub flags: LsaEntryFlags,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct LsaEntryFlags: u8 {
        const RECEIVED = 0x01;
        const SELF_ORIGINATED = 0x02;
    }
}

// External route to be advertised in an AS-External-LSA or
// NSSA-External-LSA.
#[derive(Clone, Debug, Eq, PartialEq, new)]
#[derive(Deserialize, Serialize)]
pub struct ExternalRoute {
    pub prefix: Ipv4Network,
    pub metric: u32,
    #[serde(default)]
    pub metric_type: ExternalMetricType,
    #[serde(default)]
    pub fwd_addr: Option<Ipv4Addr>,
    #[serde(default)]
    pub tag: u32,
}

#[derive(Debug, Serialize)]
pub struct LsdbStats {
    // Number of LSAs originated by the local router.
    pub orig_lsa_count: u32,
    // Number of LSAs accepted from the neighbor-exchange layer.
    pub rcvd_lsa_count: u32,
    // Time of the last LSDB change.
    pub discontinuity_time: DateTime<Utc>,
}

#[derive(Debug, new)]
pub struct LsaLogEntry {
    pub id: u32,
    pub lsa: LsaLogId,
    pub time: Instant,
    pub reason: LsaLogReason,
}

#[derive(Clone, Debug)]
pub struct LsaLogId {
    pub lsa_type: LsaType,
    pub lsa_id: Ipv4Addr,
    pub adv_rtr: Ipv4Addr,
    pub seq_no: Option<u32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LsaLogReason {
    Refresh,
    ContentChange,
    Purge,
}

// ===== impl Lsdb =====

impl<C> Lsdb<C>
where
    C: Clock,
{
    pub fn new(area_id: Ipv4Addr, clock: C) -> Lsdb<C> {
        let last_age_tick = clock.now();
        Lsdb {
            area_id,
            tree: Default::default(),
            last_age_tick,
            lsa_log: Default::default(),
            lsa_log_next_id: 0,
            stats: Default::default(),
            clock,
        }
    }

    // Installs an LSA received from a neighbor.
    //
    // Returns true if the LSA was installed, or false if it was discarded
    // because the database already holds an instance that is at least as
    // recent.
    pub fn add_lsa(&mut self, hdr: LsaHdr, body: LsaBody) -> bool {
        self.install(hdr, body, LsaEntryFlags::RECEIVED)
    }

    // Checks whether the given LSA header is more recent than the database
    // copy, if any.
    pub fn is_lsa_newer(&self, hdr: &LsaHdr) -> bool {
        match self.tree.get(&hdr.key()) {
            Some(lse) => is_newer(hdr, &lse.data.hdr),
            None => true,
        }
    }

    // Increments the age of all LSAs by the given number of seconds.
    //
    // LSAs that reach MaxAge are removed from the database. Returns the
    // number of LSAs that were removed.
    pub fn age_lsas(&mut self, elapsed: u64) -> usize {
        let _span = debug_span!("lsdb", area_id = %self.area_id).entered();
        let elapsed = u16::try_from(elapsed).unwrap_or(u16::MAX);

        let mut expired = vec![];
        for (key, lse) in self.tree.iter_mut() {
            let age = std::cmp::min(
                lse.data.hdr.age.saturating_add(elapsed),
                LSA_MAX_AGE,
            );
            if age != lse.data.hdr.age {
                Arc::make_mut(&mut lse.data).hdr.age = age;
            }
            if age == LSA_MAX_AGE {
                expired.push(*key);
            }
        }

        for key in &expired {
            self.remove(key, LsaFlushReason::Expiry);
        }

        expired.len()
    }

    // Ages the LSDB by the amount of whole seconds elapsed since the last
    // call, according to the LSDB clock.
    //
    // Sub-second remainders are carried over to the next call. This is an
    // alternative to `age_lsas`; the two shouldn't be mixed on the same LSDB.
    pub fn age_tick(&mut self) -> usize {
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(self.last_age_tick);
        let secs = elapsed.as_secs();
        self.last_age_tick += Duration::from_secs(secs);
        self.age_lsas(secs)
    }

    // Builds a new instance of the local Router-LSA.
    pub fn create_router_lsa(
        &self,
        router_id: Ipv4Addr,
        flags: LsaRouterFlags,
        links: Vec<LsaRouterLink>,
    ) -> Lsa {
        let body = LsaBody::Router(LsaRouter { flags, links });
        self.create_lsa(Options::E, router_id, router_id, body)
    }

    // Builds a new instance of an AS-External-LSA.
    //
    // The Link State ID is the network address of the route, host bits
    // cleared.
    pub fn create_external_lsa(
        &self,
        router_id: Ipv4Addr,
        route: &ExternalRoute,
    ) -> Lsa {
        let body = LsaBody::AsExternal(route.lsa_body());
        self.create_lsa(Options::E, route.prefix.network(), router_id, body)
    }

    // Builds a new instance of an NSSA-External-LSA.
    //
    // The P-bit is always set, requesting translation into the backbone by
    // the NSSA border router (RFC 3101 - Section 2.3).
    pub fn create_nssa_lsa(
        &self,
        router_id: Ipv4Addr,
        route: &ExternalRoute,
    ) -> Lsa {
        let body = LsaBody::NssaExternal(route.lsa_body());
        self.create_lsa(Options::NP, route.prefix.network(), router_id, body)
    }

    // (Re)originates the local Router-LSA.
    pub fn install_router_lsa(
        &mut self,
        router_id: Ipv4Addr,
        flags: LsaRouterFlags,
        links: Vec<LsaRouterLink>,
    ) -> bool {
        let lsa = self.create_router_lsa(router_id, flags, links);
        self.originate(lsa)
    }

    // (Re)originates an AS-External-LSA.
    pub fn install_external_lsa(
        &mut self,
        router_id: Ipv4Addr,
        route: &ExternalRoute,
    ) -> bool {
        let lsa = self.create_external_lsa(router_id, route);
        self.originate(lsa)
    }

    // (Re)originates an NSSA-External-LSA.
    pub fn install_nssa_lsa(
        &mut self,
        router_id: Ipv4Addr,
        route: &ExternalRoute,
    ) -> bool {
        let lsa = self.create_nssa_lsa(router_id, route);
        self.originate(lsa)
    }

    // Flushes a self-originated LSA from the database (premature aging).
    pub fn flush_lsa(&mut self, key: &LsaKey) -> bool {
        let self_originated = self.tree.get(key).is_some_and(|lse| {
            lse.flags.contains(LsaEntryFlags::SELF_ORIGINATED)
        });
        if !self_originated {
            return false;
        }

        let _span = debug_span!("lsdb", area_id = %self.area_id).entered();
        self.remove(key, LsaFlushReason::PrematureAging);
        true
    }

    // Reoriginates all self-originated LSAs whose age reached
    // LSA_REFRESH_TIME. Returns the number of refreshed LSAs.
    pub fn refresh_lsas(&mut self) -> usize {
        let refresh = self
            .tree
            .values()
            .filter(|lse| lse.flags.contains(LsaEntryFlags::SELF_ORIGINATED))
            .filter(|lse| lse.data.hdr.age >= LSA_REFRESH_TIME)
            .map(|lse| lse.data.clone())
            .collect::<Vec<_>>();

        for old_lsa in &refresh {
            let _span =
                debug_span!("lsdb", area_id = %self.area_id).entered();
            Debug::LsaRefresh(&old_lsa.hdr).log();

            let lsa = self.create_lsa(
                old_lsa.hdr.options,
                old_lsa.hdr.lsa_id,
                old_lsa.hdr.adv_rtr,
                old_lsa.body.clone(),
            );
            self.originate(lsa);
        }

        refresh.len()
    }

    // Returns the headers of all LSAs, as used to build Database Description
    // packets.
    pub fn get_lsa_headers(&self) -> Vec<LsaHdr> {
        self.tree.values().map(|lse| lse.data.hdr).collect()
    }

    pub fn get_lsa(
        &self,
        lsa_type: LsaType,
        lsa_id: Ipv4Addr,
        adv_rtr: Ipv4Addr,
    ) -> Option<&Arc<Lsa>> {
        let key = LsaKey::new(lsa_type, adv_rtr, lsa_id);
        self.tree.get(&key).map(|lse| &lse.data)
    }

    pub fn get_entry(&self, key: &LsaKey) -> Option<&LsaEntry> {
        self.tree.get(key)
    }

    pub fn get_all_lsas(&self) -> impl Iterator<Item = &Arc<Lsa>> {
        self.tree.values().map(|lse| &lse.data)
    }

    pub fn get_router_lsas(&self) -> impl Iterator<Item = &Arc<Lsa>> {
        self.lsas_by_type(|code| code == LsaTypeCode::Router)
    }

    pub fn get_network_lsas(&self) -> impl Iterator<Item = &Arc<Lsa>> {
        self.lsas_by_type(|code| code == LsaTypeCode::Network)
    }

    pub fn get_summary_lsas(&self) -> impl Iterator<Item = &Arc<Lsa>> {
        self.lsas_by_type(|code| {
            matches!(
                code,
                LsaTypeCode::SummaryNetwork | LsaTypeCode::SummaryRouter
            )
        })
    }

    pub fn get_external_lsas(&self) -> impl Iterator<Item = &Arc<Lsa>> {
        self.lsas_by_type(|code| code == LsaTypeCode::AsExternal)
    }

    pub fn get_nssa_lsas(&self) -> impl Iterator<Item = &Arc<Lsa>> {
        self.lsas_by_type(|code| code == LsaTypeCode::NssaExternal)
    }

    pub fn get_size(&self) -> usize {
        self.tree.len()
    }

    // Removes all LSAs from the database. Returns the number of removed LSAs.
    pub fn clear(&mut self) -> usize {
        let count = self.tree.len();
        self.tree.clear();
        if count > 0 {
            let _span =
                debug_span!("lsdb", area_id = %self.area_id).entered();
            Debug::LsdbClear(count).log();
            self.stats.discontinuity_time = Utc::now();
        }
        count
    }

    pub fn lsa_log(&self) -> impl Iterator<Item = &LsaLogEntry> {
        self.lsa_log.iter()
    }

    pub fn stats(&self) -> &LsdbStats {
        &self.stats
    }

    fn lsas_by_type(
        &self,
        filter: impl Fn(LsaTypeCode) -> bool,
    ) -> impl Iterator<Item = &Arc<Lsa>> {
        self.tree
            .iter()
            .filter(move |(key, _)| {
                key.lsa_type.type_code().is_some_and(&filter)
            })
            .map(|(_, lse)| &lse.data)
    }

    // Builds a new LSA instance, using the sequence number that follows the
    // one from the database copy (if any).
    fn create_lsa(
        &self,
        options: Options,
        lsa_id: Ipv4Addr,
        adv_rtr: Ipv4Addr,
        body: LsaBody,
    ) -> Lsa {
        let lsa_key = LsaKey::new(body.lsa_type(), adv_rtr, lsa_id);

        // Get next sequence number.
        let seq_no = self
            .tree
            .get(&lsa_key)
            .and_then(|old_lse| old_lse.data.hdr.seq_no)
            .map(|seq_no| seq_no.wrapping_add(1))
            .unwrap_or(LSA_INIT_SEQ_NO);

        let now = self.clock.now();
        Lsa::new(0, options, lsa_id, adv_rtr, Some(seq_no), body, now)
    }

    // Installs a self-originated LSA.
    fn originate(&mut self, mut lsa: Lsa) -> bool {
        let _span = debug_span!("lsdb", area_id = %self.area_id).entered();

        // When an attempt is made to increment the sequence number past the
        // maximum value of MaxSequenceNumber, the current instance of the LSA
        // must first be flushed from the routing domain. A new instance can
        // then be originated with sequence number of InitialSequenceNumber.
        if lsa.hdr.seq_no == Some(LSA_RESERVED_SEQ_NO) {
            self.remove(&lsa.hdr.key(), LsaFlushReason::PrematureAging);
            lsa.hdr.seq_no = Some(LSA_INIT_SEQ_NO);
        }

        Debug::LsaOriginate(&lsa.hdr).log();
        let installed =
            self.install(lsa.hdr, lsa.body, LsaEntryFlags::SELF_ORIGINATED);
        if installed {
            self.stats.orig_lsa_count += 1;
        }
        installed
    }

    fn install(
        &mut self,
        mut hdr: LsaHdr,
        body: LsaBody,
        flags: LsaEntryFlags,
    ) -> bool {
        let _span = debug_span!("lsdb", area_id = %self.area_id).entered();

        if hdr.lsa_type != body.lsa_type() {
            Debug::LsaDiscard(&hdr, LsaDiscardReason::TypeMismatch).log();
            return false;
        }
        hdr.age = std::cmp::min(hdr.age, LSA_MAX_AGE);

        // Compare against the database copy, if any.
        let key = hdr.key();
        let content_change = match self.tree.get(&key) {
            Some(old_lse) => {
                if !is_newer(&hdr, &old_lse.data.hdr) {
                    Debug::LsaDiscard(&hdr, LsaDiscardReason::NotNewer).log();
                    return false;
                }
                old_lse.data.body != body
                    || old_lse.data.hdr.options != hdr.options
            }
            None => true,
        };

        Debug::LsaInstall(&hdr).log();

        // Add entry to LSA log.
        let reason = if hdr.is_maxage() {
            LsaLogReason::Purge
        } else if content_change {
            LsaLogReason::ContentChange
        } else {
            LsaLogReason::Refresh
        };
        self.log_lsa(&hdr, reason);

        // Update statistics.
        if flags.contains(LsaEntryFlags::RECEIVED) {
            self.stats.rcvd_lsa_count += 1;
        }
        self.stats.discontinuity_time = Utc::now();

        // Replace the old instance (if any) as a whole.
        let lsa = Lsa {
            hdr,
            body,
            install_time: self.clock.now(),
        };
        let lse = LsaEntry {
            data: Arc::new(lsa),
            flags,
        };
        self.tree.insert(key, lse);

        true
    }

    fn remove(&mut self, key: &LsaKey, reason: LsaFlushReason) {
        if let Some(lse) = self.tree.remove(key) {
            Debug::LsaFlush(&lse.data.hdr, reason).log();
            self.log_lsa(&lse.data.hdr, LsaLogReason::Purge);
            self.stats.discontinuity_time = Utc::now();
        }
    }

    // Adds log entry for the given LSA.
    fn log_lsa(&mut self, hdr: &LsaHdr, reason: LsaLogReason) {
        // Get next log ID.
        self.lsa_log_next_id += 1;

        // Add new log entry.
        let lsa = LsaLogId::from(hdr);
        let log_entry = LsaLogEntry::new(
            self.lsa_log_next_id,
            lsa,
            self.clock.now(),
            reason,
        );
        self.lsa_log.push_front(log_entry);

        // Remove old entries if necessary.
        self.lsa_log.truncate(LSA_LOG_MAX_SIZE);
    }
}

// ===== impl ExternalRoute =====

impl ExternalRoute {
    fn lsa_body(&self) -> LsaAsExternal {
        LsaAsExternal {
            mask: self.prefix.mask(),
            flags: self.metric_type.into(),
            metric: std::cmp::min(self.metric, LSA_INFINITY),
            fwd_addr: self.fwd_addr,
            tag: self.tag,
        }
    }
}

// ===== impl LsdbStats =====

impl Default for LsdbStats {
    fn default() -> LsdbStats {
        LsdbStats {
            orig_lsa_count: 0,
            rcvd_lsa_count: 0,
            discontinuity_time: Utc::now(),
        }
    }
}

// ===== impl LsaLogId =====

impl From<&LsaHdr> for LsaLogId {
    fn from(hdr: &LsaHdr) -> LsaLogId {
        LsaLogId {
            lsa_type: hdr.lsa_type,
            lsa_id: hdr.lsa_id,
            adv_rtr: hdr.adv_rtr,
            seq_no: hdr.seq_no,
        }
    }
}

// ===== global functions =====

// Compares which LSA is more recent according to the rules specified in Section
// 13.1 of RFC 2328.
//
// A missing sequence number is older than any present one. When both are
// missing, the LSAs are considered identical regardless of their checksums.
//
// Returns:
// - Ordering::Greater when `a` is more recent
// - Ordering::Less when `b` is more recent
// - Ordering::Equal when the two LSAs are considered to be identical
pub fn lsa_compare(a: &LsaHdr, b: &LsaHdr) -> Ordering {
    match (a.seq_no, b.seq_no) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a_seq_no), Some(b_seq_no)) => {
            let cmp = (a_seq_no as i32).cmp(&(b_seq_no as i32));
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
    }

    a.cksum.unwrap_or(0).cmp(&b.cksum.unwrap_or(0))
}

// Returns whether `a` is strictly more recent than `b`.
pub fn is_newer(a: &LsaHdr, b: &LsaHdr) -> bool {
    lsa_compare(a, b) == Ordering::Greater
}

// ===== unit tests =====
