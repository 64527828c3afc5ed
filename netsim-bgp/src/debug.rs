//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use ipnetwork::IpNetwork;
use tracing::{debug, debug_span};

// BGP debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    // Route flap damping
    DampingCreate(f64),
    RouteWithdrawn(&'a IpNetwork, f64),
    RouteAnnounced(&'a IpNetwork, f64, bool),
    RouteSuppressed(&'a IpNetwork, f64),
    RouteReused(&'a IpNetwork, f64),
    HistoryClear(&'a IpNetwork),
    HistoryPurge(usize),
}

// ===== impl Debug =====

impl Debug<'_> {
    // Log debug message using the tracing API.
    pub(crate) fn log(&self) {
        match self {
            Debug::DampingCreate(ceiling) => {
                debug_span!("damping").in_scope(|| {
                    debug!(%ceiling, "{}", self);
                });
            }
            Debug::RouteWithdrawn(prefix, penalty)
            | Debug::RouteSuppressed(prefix, penalty)
            | Debug::RouteReused(prefix, penalty) => {
                // Parent span(s): damping
                debug_span!("route", %prefix).in_scope(|| {
                    debug!(%penalty, "{}", self);
                });
            }
            Debug::RouteAnnounced(prefix, penalty, attribute_changed) => {
                // Parent span(s): damping
                debug_span!("route", %prefix).in_scope(|| {
                    debug!(%penalty, %attribute_changed, "{}", self);
                });
            }
            Debug::HistoryClear(prefix) => {
                // Parent span(s): damping
                debug_span!("route", %prefix).in_scope(|| {
                    debug!("{}", self);
                });
            }
            Debug::HistoryPurge(count) => {
                // Parent span(s): damping
                debug!(%count, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::DampingCreate(..) => {
                write!(f, "route flap damping enabled")
            }
            Debug::RouteWithdrawn(..) => {
                write!(f, "route withdrawn")
            }
            Debug::RouteAnnounced(..) => {
                write!(f, "route announced")
            }
            Debug::RouteSuppressed(..) => {
                write!(f, "route suppressed")
            }
            Debug::RouteReused(..) => {
                write!(f, "route reusable")
            }
            Debug::HistoryClear(..) => {
                write!(f, "flap history cleared")
            }
            Debug::HistoryPurge(..) => {
                write!(f, "stale flap histories released")
            }
        }
    }
}
