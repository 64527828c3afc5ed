//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use ipnetwork::IpNetwork;
use netsim_utils::clock::Clock;
use serde::{Deserialize, Serialize};
use tracing::debug_span;

use crate::debug::Debug;
use crate::error::Error;

// Route flap damping parameters (RFC 2439).
#[derive(Clone, Debug, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DampingCfg {
    pub withdrawal_penalty: f64,
    pub attribute_change_penalty: f64,
    pub suppress_threshold: f64,
    pub reuse_threshold: f64,
    // Penalty half-life, in seconds.
    pub half_life: u32,
    // Maximum time a route can stay suppressed, in seconds.
    pub max_suppress_time: u32,
}

// Route flap damping engine.
//
// Penalties are decayed lazily: every access to a route first brings its
// penalty up to date with the current time and stores the result.
#[derive(Debug)]
pub struct FlapDamping<C: Clock> {
    // Damping parameters.
    config: DampingCfg,
    // Penalty ceiling derived from the configuration.
    ceiling: f64,
    // Flap history, indexed by route prefix.
    routes: BTreeMap<IpNetwork, FlapInfo>,
    // Time source.
    clock: C,
}

// Flap history of a single route.
#[derive(Clone, Debug)]
pub struct FlapInfo {
    pub penalty: f64,
    pub last_update: Instant,
    pub flap_count: u32,
    pub withdrawal_count: u32,
    pub suppressed: bool,
    pub suppressed_since: Option<Instant>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[derive(Serialize)]
pub struct FlapStats {
    pub flap_count: u32,
    pub withdrawal_count: u32,
    pub penalty: f64,
    pub suppressed: bool,
    // Time spent in the suppressed state so far.
    pub suppressed_for: Option<Duration>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Serialize)]
pub struct DampingStats {
    pub total_flaps: u64,
    pub tracked_routes: usize,
    pub suppressed_routes: usize,
}

// ===== impl DampingCfg =====

impl DampingCfg {
    // Maximum penalty a route can accumulate (RFC 2439 - Section 4.2).
    pub fn ceiling(&self) -> f64 {
        let exp = self.max_suppress_time as f64 / self.half_life as f64;
        self.reuse_threshold * exp.exp2()
    }

    fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("withdrawal_penalty", self.withdrawal_penalty),
            ("attribute_change_penalty", self.attribute_change_penalty),
            ("suppress_threshold", self.suppress_threshold),
            ("reuse_threshold", self.reuse_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidDampingParameter(name, value));
            }
        }
        // Routes could never be reused with a zero reuse threshold.
        if self.reuse_threshold == 0.0 {
            return Err(Error::InvalidDampingParameter(
                "reuse_threshold",
                self.reuse_threshold,
            ));
        }
        if self.half_life == 0 {
            return Err(Error::InvalidHalfLife(self.half_life));
        }
        if self.reuse_threshold >= self.suppress_threshold {
            return Err(Error::InvalidThresholds(
                self.reuse_threshold,
                self.suppress_threshold,
            ));
        }
        if self.max_suppress_time < self.half_life {
            return Err(Error::InvalidMaxSuppressTime(
                self.max_suppress_time,
                self.half_life,
            ));
        }
        // The penalty must be able to reach the suppress threshold.
        let ceiling = self.ceiling();
        if ceiling < self.suppress_threshold {
            return Err(Error::InvalidCeiling(
                ceiling,
                self.suppress_threshold,
            ));
        }

        Ok(())
    }
}

impl Default for DampingCfg {
    fn default() -> DampingCfg {
        DampingCfg {
            withdrawal_penalty: 1000.0,
            attribute_change_penalty: 500.0,
            suppress_threshold: 3000.0,
            reuse_threshold: 750.0,
            half_life: 900,
            max_suppress_time: 3600,
        }
    }
}

// ===== impl FlapDamping =====

impl<C> FlapDamping<C>
where
    C: Clock,
{
    pub fn new(config: DampingCfg, clock: C) -> Result<FlapDamping<C>, Error> {
        config.validate()?;

        let ceiling = config.ceiling();
        Debug::DampingCreate(ceiling).log();

        Ok(FlapDamping {
            config,
            ceiling,
            routes: Default::default(),
            clock,
        })
    }

    // Records the withdrawal of a route.
    //
    // Returns whether the route is suppressed after the withdrawal.
    pub fn route_withdrawn(&mut self, prefix: IpNetwork) -> bool {
        let _span = debug_span!("damping").entered();

        let now = self.clock.now();
        let penalty = self.config.withdrawal_penalty;
        let flap = self
            .routes
            .entry(prefix)
            .or_insert_with(|| FlapInfo::new(now));
        flap.decay(now, &self.config);
        flap.add_penalty(penalty, self.ceiling);
        flap.flap_count += 1;
        flap.withdrawal_count += 1;
        Debug::RouteWithdrawn(&prefix, flap.penalty).log();

        flap.update_state(&prefix, now, &self.config);
        flap.penalty >= self.config.suppress_threshold
    }

    // Records the re-announcement of a route.
    //
    // Returns whether the route is still being held back, which is the case
    // while its penalty hasn't decayed below the reuse threshold.
    pub fn route_announced(
        &mut self,
        prefix: IpNetwork,
        attribute_changed: bool,
    ) -> bool {
        let _span = debug_span!("damping").entered();

        let now = self.clock.now();
        let flap = self
            .routes
            .entry(prefix)
            .or_insert_with(|| FlapInfo::new(now));
        flap.decay(now, &self.config);
        if attribute_changed {
            let penalty = self.config.attribute_change_penalty;
            flap.add_penalty(penalty, self.ceiling);
            flap.flap_count += 1;
        }
        Debug::RouteAnnounced(&prefix, flap.penalty, attribute_changed).log();

        flap.update_state(&prefix, now, &self.config);
        flap.penalty >= self.config.reuse_threshold
    }

    // Returns the current penalty of a route, or zero if the route has no
    // flap history.
    pub fn get_penalty(&mut self, prefix: &IpNetwork) -> f64 {
        self.refresh(prefix).map(|flap| flap.penalty).unwrap_or(0.0)
    }

    // Returns whether a route is currently suppressed.
    pub fn is_suppressed(&mut self, prefix: &IpNetwork) -> bool {
        self.refresh(prefix).is_some_and(|flap| flap.suppressed)
    }

    // Returns the time left until a suppressed route becomes reusable.
    pub fn reuse_time(&mut self, prefix: &IpNetwork) -> Option<Duration> {
        let reuse_threshold = self.config.reuse_threshold;
        let half_life = self.config.half_life as f64;
        let flap = self.refresh(prefix)?;
        if !flap.suppressed {
            return None;
        }

        let secs = half_life * (flap.penalty / reuse_threshold).log2();
        Some(Duration::from_secs_f64(secs.max(0.0)))
    }

    // Drops the flap history of a route.
    pub fn clear_history(&mut self, prefix: &IpNetwork) {
        if self.routes.remove(prefix).is_some() {
            let _span = debug_span!("damping").entered();
            Debug::HistoryClear(prefix).log();
        }
    }

    // Releases the flap history of unsuppressed routes whose penalty decayed
    // below half the reuse threshold. Returns the number of released routes.
    pub fn purge_history(&mut self) -> usize {
        self.refresh_all();

        let threshold = self.config.reuse_threshold / 2.0;
        let count = self.routes.len();
        self.routes
            .retain(|_, flap| flap.suppressed || flap.penalty >= threshold);
        let count = count - self.routes.len();
        if count > 0 {
            let _span = debug_span!("damping").entered();
            Debug::HistoryPurge(count).log();
        }
        count
    }

    pub fn route_stats(&mut self, prefix: &IpNetwork) -> Option<FlapStats> {
        let now = self.clock.now();
        self.refresh(prefix).map(|flap| FlapStats {
            flap_count: flap.flap_count,
            withdrawal_count: flap.withdrawal_count,
            penalty: flap.penalty,
            suppressed: flap.suppressed,
            suppressed_for: flap
                .suppressed_since
                .map(|since| now.saturating_duration_since(since)),
        })
    }

    pub fn stats(&mut self) -> DampingStats {
        self.refresh_all();

        DampingStats {
            total_flaps: self
                .routes
                .values()
                .map(|flap| flap.flap_count as u64)
                .sum(),
            tracked_routes: self.routes.len(),
            suppressed_routes: self
                .routes
                .values()
                .filter(|flap| flap.suppressed)
                .count(),
        }
    }

    pub fn suppressed_routes(&mut self) -> impl Iterator<Item = &IpNetwork> {
        self.refresh_all();

        self.routes
            .iter()
            .filter(|(_, flap)| flap.suppressed)
            .map(|(prefix, _)| prefix)
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    // Brings the flap history of a route up to date with the current time.
    fn refresh(&mut self, prefix: &IpNetwork) -> Option<&FlapInfo> {
        let now = self.clock.now();
        let flap = self.routes.get_mut(prefix)?;
        flap.decay(now, &self.config);
        let _span = debug_span!("damping").entered();
        flap.update_state(prefix, now, &self.config);
        Some(flap)
    }

    fn refresh_all(&mut self) {
        let now = self.clock.now();
        let _span = debug_span!("damping").entered();
        for (prefix, flap) in self.routes.iter_mut() {
            flap.decay(now, &self.config);
            flap.update_state(prefix, now, &self.config);
        }
    }
}

// ===== impl FlapInfo =====

impl FlapInfo {
    fn new(now: Instant) -> FlapInfo {
        FlapInfo {
            penalty: 0.0,
            last_update: now,
            flap_count: 0,
            withdrawal_count: 0,
            suppressed: false,
            suppressed_since: None,
        }
    }

    fn decay(&mut self, now: Instant, config: &DampingCfg) {
        let elapsed = now.saturating_duration_since(self.last_update);
        self.penalty = decay(self.penalty, elapsed, config.half_life);
        self.last_update = now;
    }

    fn add_penalty(&mut self, penalty: f64, ceiling: f64) {
        self.penalty = f64::min(self.penalty + penalty, ceiling);
    }

    // Suppressed routes are only reused once their penalty drops strictly
    // below the reuse threshold. A penalty equal to the threshold keeps the
    // route suppressed, as `route_announced` still reports it held back.
    fn update_state(
        &mut self,
        prefix: &IpNetwork,
        now: Instant,
        config: &DampingCfg,
    ) {
        if !self.suppressed && self.penalty >= config.suppress_threshold {
            self.suppressed = true;
            self.suppressed_since = Some(now);
            Debug::RouteSuppressed(prefix, self.penalty).log();
        } else if self.suppressed && self.penalty < config.reuse_threshold {
            self.suppressed = false;
            self.suppressed_since = None;
            Debug::RouteReused(prefix, self.penalty).log();
        }
    }
}

// ===== global functions =====

// Exponentially decays a penalty over the given amount of time.
pub fn decay(penalty: f64, elapsed: Duration, half_life: u32) -> f64 {
    let exp = -elapsed.as_secs_f64() / half_life as f64;
    f64::max(penalty * exp.exp2(), 0.0)
}

// ===== unit tests =====
