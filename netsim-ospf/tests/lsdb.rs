//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;
use std::time::Duration;

use const_addrs::ip4;
use ipnetwork::Ipv4Network;
use maplit::btreeset;
use netsim_ospf::lsdb::*;
use netsim_ospf::packet::Options;
use netsim_ospf::packet::lsa::*;
use netsim_utils::clock::{Clock, ManualClock};

const AREA_ID: Ipv4Addr = Ipv4Addr::UNSPECIFIED;
const ROUTER_ID: Ipv4Addr = ip4!("1.1.1.1");

//
// Helper functions.
//

fn new_lsdb() -> (Lsdb<ManualClock>, ManualClock) {
    netsim_utils::test::setup();
    let clock = ManualClock::new();
    let lsdb = Lsdb::new(AREA_ID, clock.clone());
    (lsdb, clock)
}

fn router_hdr(adv_rtr: Ipv4Addr, age: u16, seq_no: Option<u32>) -> LsaHdr {
    LsaHdr::new(
        age,
        Options::E,
        LsaTypeCode::Router.into(),
        adv_rtr,
        adv_rtr,
        seq_no,
    )
}

fn add_router_lsa(
    lsdb: &mut Lsdb<ManualClock>,
    adv_rtr: Ipv4Addr,
    age: u16,
    seq_no: Option<u32>,
    metric: u16,
) -> bool {
    lsdb.add_lsa(router_hdr(adv_rtr, age, seq_no), router_body(metric))
}

fn router_body(metric: u16) -> LsaBody {
    LsaBody::Router(LsaRouter {
        flags: LsaRouterFlags::empty(),
        links: vec![LsaRouterLink::new(
            LsaRouterLinkType::StubNetwork,
            ip4!("10.0.1.0"),
            ip4!("255.255.255.0"),
            metric,
        )],
    })
}

fn external_route(metric_type: ExternalMetricType) -> ExternalRoute {
    let prefix = Ipv4Network::new(ip4!("172.16.1.0"), 24).unwrap();
    ExternalRoute::new(prefix, 20, metric_type, None, 0)
}

fn router_key(adv_rtr: Ipv4Addr) -> LsaKey {
    LsaKey::new(LsaTypeCode::Router.into(), adv_rtr, adv_rtr)
}

//
// Tests.
//

#[test]
fn test_add_lsa_new_key() {
    let (mut lsdb, _) = new_lsdb();
    let rtr = ip4!("2.2.2.2");

    assert!(lsdb.is_lsa_newer(&router_hdr(rtr, 0, Some(LSA_INIT_SEQ_NO))));
    assert!(add_router_lsa(&mut lsdb, rtr, 10, Some(LSA_INIT_SEQ_NO), 10));
    assert_eq!(lsdb.get_size(), 1);

    let lse = lsdb.get_entry(&router_key(rtr)).unwrap();
    assert!(lse.flags.contains(LsaEntryFlags::RECEIVED));
    assert!(!lse.flags.contains(LsaEntryFlags::SELF_ORIGINATED));
    assert_eq!(lse.data.hdr.age, 10);
    assert_eq!(lsdb.stats().rcvd_lsa_count, 1);
}

#[test]
fn test_add_lsa_replacement() {
    let (mut lsdb, _) = new_lsdb();
    let rtr = ip4!("2.2.2.2");

    assert!(add_router_lsa(&mut lsdb, rtr, 0, Some(0x80000001), 10));
    assert!(add_router_lsa(&mut lsdb, rtr, 0, Some(0x80000002), 20));
    assert_eq!(lsdb.get_size(), 1);

    // The newer instance replaces the older one as a whole.
    let lsa = lsdb.get_lsa(LsaTypeCode::Router.into(), rtr, rtr).unwrap();
    assert_eq!(lsa.hdr.seq_no, Some(0x80000002));
    assert_eq!(lsa.body, router_body(20));

    // An older instance is discarded without side effects.
    assert!(!lsdb.is_lsa_newer(&router_hdr(rtr, 0, Some(0x80000001))));
    assert!(!add_router_lsa(&mut lsdb, rtr, 0, Some(0x80000001), 30));
    let lsa = lsdb.get_lsa(LsaTypeCode::Router.into(), rtr, rtr).unwrap();
    assert_eq!(lsa.hdr.seq_no, Some(0x80000002));
    assert_eq!(lsa.body, router_body(20));
}

#[test]
fn test_add_lsa_reserved_seq_no() {
    let (mut lsdb, _) = new_lsdb();
    let rtr = ip4!("1.1.1.1");

    assert!(add_router_lsa(&mut lsdb, rtr, 0, Some(0x80000001), 10));

    // The reserved sequence number is the smallest signed value and never
    // beats an installed instance.
    assert!(!lsdb.is_lsa_newer(&router_hdr(rtr, 0, Some(0x80000000))));
    assert!(!add_router_lsa(&mut lsdb, rtr, 0, Some(0x80000000), 20));
    let lsa = lsdb.get_lsa(LsaTypeCode::Router.into(), rtr, rtr).unwrap();
    assert_eq!(lsa.hdr.seq_no, Some(0x80000001));
    assert_eq!(lsa.body, router_body(10));

    assert!(add_router_lsa(&mut lsdb, rtr, 0, Some(0x80000002), 30));
    let lsa = lsdb.get_lsa(LsaTypeCode::Router.into(), rtr, rtr).unwrap();
    assert_eq!(lsa.hdr.seq_no, Some(0x80000002));
    assert_eq!(lsa.body, router_body(30));
    assert_eq!(lsdb.get_size(), 1);
    assert_eq!(lsdb.stats().rcvd_lsa_count, 2);
}

#[test]
fn test_add_lsa_idempotent() {
    let (mut lsdb, _) = new_lsdb();
    let rtr = ip4!("2.2.2.2");
    let hdr = router_hdr(rtr, 0, Some(LSA_INIT_SEQ_NO));

    assert!(lsdb.add_lsa(hdr, router_body(10)));
    let headers = lsdb.get_lsa_headers();
    assert!(!lsdb.add_lsa(hdr, router_body(10)));
    assert_eq!(lsdb.get_lsa_headers(), headers);
    assert_eq!(lsdb.stats().rcvd_lsa_count, 1);
}

#[test]
fn test_add_lsa_missing_seq_no() {
    let (mut lsdb, _) = new_lsdb();
    let rtr = ip4!("2.2.2.2");

    // Any sequence number beats a missing one.
    assert!(add_router_lsa(&mut lsdb, rtr, 0, None, 10));
    assert!(!add_router_lsa(&mut lsdb, rtr, 0, None, 20));
    assert!(add_router_lsa(&mut lsdb, rtr, 0, Some(LSA_INIT_SEQ_NO), 20));
    assert!(!add_router_lsa(&mut lsdb, rtr, 0, None, 30));

    let lsa = lsdb.get_lsa(LsaTypeCode::Router.into(), rtr, rtr).unwrap();
    assert_eq!(lsa.hdr.seq_no, Some(LSA_INIT_SEQ_NO));
}

#[test]
fn test_add_lsa_type_mismatch() {
    let (mut lsdb, _) = new_lsdb();
    let mut hdr = router_hdr(ip4!("2.2.2.2"), 0, Some(LSA_INIT_SEQ_NO));
    hdr.lsa_type = LsaTypeCode::Network.into();

    assert!(!lsdb.add_lsa(hdr, router_body(10)));
    assert_eq!(lsdb.get_size(), 0);
}

#[test]
fn test_age_lsas() {
    let (mut lsdb, _) = new_lsdb();
    let rtr1 = ip4!("2.2.2.2");
    let rtr2 = ip4!("3.3.3.3");
    add_router_lsa(&mut lsdb, rtr1, 0, Some(LSA_INIT_SEQ_NO), 10);
    add_router_lsa(&mut lsdb, rtr2, 3500, Some(LSA_INIT_SEQ_NO), 10);

    // Ages never decrease.
    assert_eq!(lsdb.age_lsas(60), 0);
    let ages = lsdb
        .get_lsa_headers()
        .iter()
        .map(|hdr| hdr.age)
        .collect::<Vec<_>>();
    assert_eq!(ages, vec![60, 3560]);

    // The second LSA reaches MaxAge and is flushed.
    assert_eq!(lsdb.age_lsas(40), 1);
    assert_eq!(lsdb.get_size(), 1);
    assert!(lsdb.get_entry(&router_key(rtr2)).is_none());
    assert_eq!(lsdb.get_entry(&router_key(rtr1)).unwrap().data.hdr.age, 100);

    // Huge elapsed values saturate.
    assert_eq!(lsdb.age_lsas(u64::MAX), 1);
    assert_eq!(lsdb.get_size(), 0);
}

#[test]
fn test_add_lsa_maxage() {
    let (mut lsdb, _) = new_lsdb();
    let rtr = ip4!("2.2.2.2");

    // Ages above MaxAge are clamped on installation.
    assert!(add_router_lsa(&mut lsdb, rtr, 4000, Some(LSA_INIT_SEQ_NO), 10));
    let lse = lsdb.get_entry(&router_key(rtr)).unwrap();
    assert_eq!(lse.data.hdr.age, LSA_MAX_AGE);
    assert!(lse.data.hdr.is_maxage());

    // MaxAge LSAs are flushed on the next aging pass.
    assert_eq!(lsdb.age_lsas(0), 1);
    assert_eq!(lsdb.get_size(), 0);
    let purge = lsdb.lsa_log().next().unwrap();
    assert_eq!(purge.reason, LsaLogReason::Purge);
}

#[test]
fn test_age_tick() {
    let (mut lsdb, clock) = new_lsdb();
    let rtr = ip4!("2.2.2.2");
    add_router_lsa(&mut lsdb, rtr, 0, Some(LSA_INIT_SEQ_NO), 10);

    let age = |lsdb: &Lsdb<ManualClock>| {
        lsdb.get_entry(&router_key(rtr)).unwrap().data.hdr.age
    };

    assert_eq!(lsdb.age_tick(), 0);
    assert_eq!(age(&lsdb), 0);

    // Sub-second remainders are carried over.
    clock.advance(Duration::from_millis(1500));
    lsdb.age_tick();
    assert_eq!(age(&lsdb), 1);
    clock.advance(Duration::from_millis(600));
    lsdb.age_tick();
    assert_eq!(age(&lsdb), 2);

    clock.advance_secs(LSA_MAX_AGE as u64);
    assert_eq!(lsdb.age_tick(), 1);
    assert_eq!(lsdb.get_size(), 0);
}

#[test]
fn test_install_router_lsa() {
    let (mut lsdb, clock) = new_lsdb();
    let flags = LsaRouterFlags::B;

    assert!(lsdb.install_router_lsa(ROUTER_ID, flags, vec![]));
    let lsa = lsdb
        .get_lsa(LsaTypeCode::Router.into(), ROUTER_ID, ROUTER_ID)
        .unwrap()
        .clone();
    assert_eq!(lsa.hdr.seq_no, Some(LSA_INIT_SEQ_NO));
    assert_eq!(lsa.hdr.age, 0);
    assert_eq!(lsa.hdr.options, Options::E);
    assert_eq!(lsa.hdr.cksum, None);
    assert_eq!(lsa.hdr.length, None);
    assert_eq!(lsa.install_time, clock.now());

    // Each reorigination increments the sequence number by one.
    let links = router_body(10).into_router().unwrap().links;
    assert!(lsdb.install_router_lsa(ROUTER_ID, flags, links.clone()));
    assert!(lsdb.install_router_lsa(ROUTER_ID, flags, links.clone()));
    let lsa = lsdb
        .get_lsa(LsaTypeCode::Router.into(), ROUTER_ID, ROUTER_ID)
        .unwrap();
    assert_eq!(lsa.hdr.seq_no, Some(LSA_INIT_SEQ_NO + 2));
    assert_eq!(lsa.body.as_router().unwrap().links, links);

    let lse = lsdb.get_entry(&router_key(ROUTER_ID)).unwrap();
    assert!(lse.flags.contains(LsaEntryFlags::SELF_ORIGINATED));
    assert_eq!(lsdb.stats().orig_lsa_count, 3);
    assert_eq!(lsdb.stats().rcvd_lsa_count, 0);
}

#[test]
fn test_create_lsa_is_pure() {
    let (mut lsdb, _) = new_lsdb();
    add_router_lsa(&mut lsdb, ROUTER_ID, 300, Some(0x80000010), 10);

    let flags = LsaRouterFlags::empty();
    let lsa = lsdb.create_router_lsa(ROUTER_ID, flags, vec![]);
    assert_eq!(lsa.hdr.seq_no, Some(0x80000011));
    assert_eq!(lsa.hdr.age, 0);

    // Creating an LSA doesn't touch the database.
    let lse = lsdb.get_entry(&router_key(ROUTER_ID)).unwrap();
    assert_eq!(lse.data.hdr.seq_no, Some(0x80000010));
    assert_eq!(lse.data.hdr.age, 300);
}

#[test]
fn test_originate_after_missing_seq_no() {
    let (mut lsdb, _) = new_lsdb();
    add_router_lsa(&mut lsdb, ROUTER_ID, 0, None, 10);

    let flags = LsaRouterFlags::empty();
    assert!(lsdb.install_router_lsa(ROUTER_ID, flags, vec![]));
    let lsa = lsdb
        .get_lsa(LsaTypeCode::Router.into(), ROUTER_ID, ROUTER_ID)
        .unwrap();
    assert_eq!(lsa.hdr.seq_no, Some(LSA_INIT_SEQ_NO));
}

#[test]
fn test_sequence_number_wrap() {
    let (mut lsdb, _) = new_lsdb();
    add_router_lsa(&mut lsdb, ROUTER_ID, 0, Some(LSA_MAX_SEQ_NO), 10);

    // The old instance is flushed and a new one is originated with the
    // initial sequence number.
    let flags = LsaRouterFlags::empty();
    assert!(lsdb.install_router_lsa(ROUTER_ID, flags, vec![]));
    let lsa = lsdb
        .get_lsa(LsaTypeCode::Router.into(), ROUTER_ID, ROUTER_ID)
        .unwrap();
    assert_eq!(lsa.hdr.seq_no, Some(LSA_INIT_SEQ_NO));
    assert_eq!(lsdb.get_size(), 1);

    let reasons = lsdb
        .lsa_log()
        .take(2)
        .map(|entry| (entry.reason, entry.lsa.seq_no))
        .collect::<Vec<_>>();
    assert_eq!(
        reasons,
        vec![
            (LsaLogReason::ContentChange, Some(LSA_INIT_SEQ_NO)),
            (LsaLogReason::Purge, Some(LSA_MAX_SEQ_NO)),
        ]
    );
}

#[test]
fn test_install_external_lsa() {
    let (mut lsdb, _) = new_lsdb();

    let route = external_route(ExternalMetricType::Type2);
    assert!(lsdb.install_external_lsa(ROUTER_ID, &route));
    let lsa = lsdb
        .get_lsa(LsaTypeCode::AsExternal.into(), ip4!("172.16.1.0"), ROUTER_ID)
        .unwrap();
    let ext = lsa.body.as_external().unwrap();
    assert_eq!(ext.mask, ip4!("255.255.255.0"));
    assert_eq!(ext.metric, 20);
    assert!(ext.flags.contains(LsaAsExternalFlags::E));
    assert_eq!(ext.metric_type(), ExternalMetricType::Type2);
    assert_eq!(lsa.hdr.options, Options::E);

    // Changing the metric type reoriginates the LSA without the E-bit.
    let route = external_route(ExternalMetricType::Type1);
    assert!(lsdb.install_external_lsa(ROUTER_ID, &route));
    let lsa = lsdb
        .get_lsa(LsaTypeCode::AsExternal.into(), ip4!("172.16.1.0"), ROUTER_ID)
        .unwrap();
    let ext = lsa.body.as_external().unwrap();
    assert!(ext.flags.is_empty());
    assert_eq!(lsa.hdr.seq_no, Some(LSA_INIT_SEQ_NO + 1));
}

#[test]
fn test_install_external_lsa_metric_infinity() {
    let (mut lsdb, _) = new_lsdb();

    let mut route = external_route(ExternalMetricType::Type1);
    route.metric = u32::MAX;
    let lsa = lsdb.create_external_lsa(ROUTER_ID, &route);
    assert_eq!(lsa.body.as_external().unwrap().metric, LSA_INFINITY);
    assert!(lsdb.install_external_lsa(ROUTER_ID, &route));
}

#[test]
fn test_install_nssa_lsa() {
    let (mut lsdb, _) = new_lsdb();

    let route = external_route(ExternalMetricType::Type1);
    assert!(lsdb.install_nssa_lsa(ROUTER_ID, &route));
    let lsa = lsdb.get_nssa_lsas().next().unwrap();
    assert_eq!(lsa.hdr.lsa_type, LsaTypeCode::NssaExternal.into());
    assert!(lsa.hdr.options.contains(Options::NP));
    assert_eq!(
        lsa.body.as_external().unwrap().metric_type(),
        ExternalMetricType::Type1
    );
    assert_eq!(lsdb.get_external_lsas().count(), 0);
}

#[test]
fn test_install_external_lsa_host_bits() {
    let (mut lsdb, _) = new_lsdb();

    let route = external_route(ExternalMetricType::Type2);
    assert!(lsdb.install_external_lsa(ROUTER_ID, &route));

    // A prefix with host bits set maps to the same Link State ID.
    let mut route = external_route(ExternalMetricType::Type2);
    route.prefix = Ipv4Network::new(ip4!("172.16.1.5"), 24).unwrap();
    assert!(lsdb.install_external_lsa(ROUTER_ID, &route));

    let lsa_ids = lsdb
        .get_external_lsas()
        .map(|lsa| lsa.hdr.lsa_id)
        .collect::<Vec<_>>();
    assert_eq!(lsa_ids, vec![ip4!("172.16.1.0")]);
    let lsa = lsdb.get_external_lsas().next().unwrap();
    assert_eq!(lsa.hdr.seq_no, Some(LSA_INIT_SEQ_NO + 1));

    assert!(lsdb.install_nssa_lsa(ROUTER_ID, &route));
    let lsa = lsdb.get_nssa_lsas().next().unwrap();
    assert_eq!(lsa.hdr.lsa_id, ip4!("172.16.1.0"));
}

#[test]
fn test_get_lsa_headers_read_only() {
    let (mut lsdb, _) = new_lsdb();
    add_router_lsa(&mut lsdb, ip4!("2.2.2.2"), 5, Some(LSA_INIT_SEQ_NO), 10);
    lsdb.install_router_lsa(ROUTER_ID, LsaRouterFlags::empty(), vec![]);

    let headers = lsdb.get_lsa_headers();
    assert_eq!(headers.len(), 2);
    assert_eq!(lsdb.get_lsa_headers(), headers);
    assert_eq!(lsdb.get_size(), 2);
}

#[test]
fn test_get_lsas_by_type() {
    let (mut lsdb, _) = new_lsdb();
    let rtr = ip4!("2.2.2.2");
    let seq_no = Some(LSA_INIT_SEQ_NO);
    let mask = ip4!("255.255.255.0");

    let lsas = vec![
        (LsaTypeCode::Router, rtr, router_body(10)),
        (
            LsaTypeCode::Network,
            ip4!("10.0.1.2"),
            LsaBody::Network(LsaNetwork {
                mask,
                attached_rtrs: btreeset![ROUTER_ID, rtr],
            }),
        ),
        (
            LsaTypeCode::SummaryNetwork,
            ip4!("10.0.2.0"),
            LsaBody::SummaryNetwork(LsaSummary::new(mask, 10)),
        ),
        (
            LsaTypeCode::SummaryRouter,
            ip4!("4.4.4.4"),
            LsaBody::SummaryRouter(LsaSummary::new(Ipv4Addr::UNSPECIFIED, 10)),
        ),
    ];
    for (code, lsa_id, body) in lsas {
        let hdr = LsaHdr::new(0, Options::E, code.into(), lsa_id, rtr, seq_no);
        assert!(lsdb.add_lsa(hdr, body));
    }
    let route = external_route(ExternalMetricType::Type2);
    lsdb.install_external_lsa(ROUTER_ID, &route);
    lsdb.install_nssa_lsa(ROUTER_ID, &route);

    assert_eq!(lsdb.get_size(), 6);
    assert_eq!(lsdb.get_all_lsas().count(), 6);
    assert_eq!(lsdb.get_router_lsas().count(), 1);
    assert_eq!(lsdb.get_network_lsas().count(), 1);
    assert_eq!(lsdb.get_summary_lsas().count(), 2);
    assert!(lsdb.get_summary_lsas().all(|lsa| lsa.hdr.lsa_type.is_summary()));
    assert_eq!(lsdb.get_external_lsas().count(), 1);
    assert_eq!(lsdb.get_nssa_lsas().count(), 1);

    assert_eq!(lsdb.clear(), 6);
    assert_eq!(lsdb.get_size(), 0);
    assert_eq!(lsdb.clear(), 0);
}

#[test]
fn test_get_lsa_not_found() {
    let (lsdb, _) = new_lsdb();
    assert!(lsdb
        .get_lsa(LsaTypeCode::Router.into(), ROUTER_ID, ROUTER_ID)
        .is_none());
}

#[test]
fn test_flush_lsa() {
    let (mut lsdb, _) = new_lsdb();
    let rtr = ip4!("2.2.2.2");
    add_router_lsa(&mut lsdb, rtr, 0, Some(LSA_INIT_SEQ_NO), 10);
    lsdb.install_router_lsa(ROUTER_ID, LsaRouterFlags::empty(), vec![]);

    // Only self-originated LSAs can be flushed.
    assert!(!lsdb.flush_lsa(&router_key(rtr)));
    assert!(lsdb.flush_lsa(&router_key(ROUTER_ID)));
    assert!(!lsdb.flush_lsa(&router_key(ROUTER_ID)));
    assert_eq!(lsdb.get_size(), 1);
}

#[test]
fn test_refresh_lsas() {
    let (mut lsdb, _) = new_lsdb();
    let rtr = ip4!("2.2.2.2");
    add_router_lsa(&mut lsdb, rtr, 0, Some(LSA_INIT_SEQ_NO), 10);
    lsdb.install_router_lsa(ROUTER_ID, LsaRouterFlags::E, vec![]);

    assert_eq!(lsdb.refresh_lsas(), 0);
    lsdb.age_lsas(LSA_REFRESH_TIME as u64);

    // Received LSAs are never refreshed.
    assert_eq!(lsdb.refresh_lsas(), 1);
    let lsa = lsdb
        .get_lsa(LsaTypeCode::Router.into(), ROUTER_ID, ROUTER_ID)
        .unwrap();
    assert_eq!(lsa.hdr.age, 0);
    assert_eq!(lsa.hdr.seq_no, Some(LSA_INIT_SEQ_NO + 1));
    assert_eq!(lsa.body.as_router().unwrap().flags, LsaRouterFlags::E);
    let lsa = lsdb.get_lsa(LsaTypeCode::Router.into(), rtr, rtr).unwrap();
    assert_eq!(lsa.hdr.age, LSA_REFRESH_TIME);

    let entry = lsdb.lsa_log().next().unwrap();
    assert_eq!(entry.reason, LsaLogReason::Refresh);
}

#[test]
fn test_lsa_log_bounded() {
    let (mut lsdb, _) = new_lsdb();

    for i in 0..70u8 {
        let rtr = Ipv4Addr::new(10, 0, 0, i);
        add_router_lsa(&mut lsdb, rtr, 0, Some(LSA_INIT_SEQ_NO), 10);
    }

    // Most recent entries first.
    assert_eq!(lsdb.lsa_log().count(), 64);
    let first = lsdb.lsa_log().next().unwrap();
    assert_eq!(first.id, 70);
    assert_eq!(first.lsa.adv_rtr, ip4!("10.0.0.69"));
    assert_eq!(first.reason, LsaLogReason::ContentChange);
}
