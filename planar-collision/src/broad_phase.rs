//! Broad-phase collision detection over fixture AABBs.
//!
//! The broad-phase keeps a persistent proxy per fixture and answers two
//! questions: which proxies overlap a query AABB, and which proxy pairs
//! overlap each other right now. Pairs that can never produce a contact
//! (two fixtures on the same body, two infinite-mass fixtures, or pairs
//! the collision filters reject) are excluded at this stage so the narrow
//! phase never sees them.
//!
//! # Algorithms
//!
//! - **Sweep-and-prune**: project proxies onto the axis with the largest
//!   spread, sort intervals by their minimum, and sweep; candidate pairs
//!   are confirmed with a full AABB test. O(n log n) plus output.
//! - **Brute force**: all pairs, for small scenes where sorting overhead
//!   isn't worth it.
//!
//! [`BroadPhaseDetector`] picks between them automatically by proxy count.
//!
//! # Example
//!
//! ```
//! use planar_collision::{BroadPhase, BroadPhaseDetector, Proxy};
//! use planar_geometry::Aabb;
//! use planar_types::{BodyId, FixtureId, FixtureKey};
//! use nalgebra::Point2;
//!
//! let mut detector = BroadPhaseDetector::default();
//! let a = FixtureKey::new(BodyId::new(1), FixtureId::new(0));
//! let b = FixtureKey::new(BodyId::new(2), FixtureId::new(0));
//!
//! detector.update(a, Proxy::dynamic(Aabb::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0))));
//! detector.update(b, Proxy::dynamic(Aabb::new(Point2::new(0.5, 0.5), Point2::new(1.5, 1.5))));
//!
//! let pairs = detector.detect();
//! assert_eq!(pairs.len(), 1);
//! ```

use std::collections::HashMap;

use planar_geometry::Aabb;
use planar_types::FixtureKey;

use crate::CollisionFilter;

/// A broad-phase entry: the fixture's world AABB plus the data needed to
/// rule pairs out early.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proxy {
    /// The fixture's world-space AABB.
    pub aabb: Aabb,
    /// The fixture's collision filter.
    pub filter: CollisionFilter,
    /// Whether the owning body has infinite mass.
    pub is_static: bool,
}

impl Proxy {
    /// Create a proxy for a dynamic body with the default filter.
    #[must_use]
    pub fn dynamic(aabb: Aabb) -> Self {
        Self {
            aabb,
            filter: CollisionFilter::default(),
            is_static: false,
        }
    }

    /// Create a proxy for an infinite-mass body with the default filter.
    #[must_use]
    pub fn fixed(aabb: Aabb) -> Self {
        Self {
            aabb,
            filter: CollisionFilter::default(),
            is_static: true,
        }
    }

    /// Set the collision filter.
    #[must_use]
    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Trait for broad-phase collision detection structures.
///
/// Implementations are free in how they index space, as long as `detect`
/// reports exactly the proxy pairs whose AABBs overlap at call time, with
/// no duplicates, excluding same-body, filtered, and static-static pairs.
pub trait BroadPhase {
    /// Insert or refresh the proxy for a fixture.
    fn update(&mut self, key: FixtureKey, proxy: Proxy);

    /// Remove a fixture's proxy. Returns whether it existed.
    fn remove(&mut self, key: &FixtureKey) -> bool;

    /// Find all proxies whose AABB overlaps the query AABB.
    fn query(&self, aabb: &Aabb) -> Vec<FixtureKey>;

    /// Find all overlapping proxy pairs.
    fn detect(&mut self) -> Vec<(FixtureKey, FixtureKey)>;

    /// Number of proxies currently stored.
    fn len(&self) -> usize;

    /// Whether the broad-phase is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Broad-phase algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadPhaseAlgorithm {
    /// Automatically choose based on proxy count.
    #[default]
    Auto,
    /// Always use brute force O(n²).
    BruteForce,
    /// Always use sweep-and-prune O(n log n).
    SweepAndPrune,
}

/// Configuration for broad-phase collision detection.
#[derive(Debug, Clone)]
pub struct BroadPhaseConfig {
    /// Algorithm to use for pair detection.
    pub algorithm: BroadPhaseAlgorithm,
    /// Margin added to stored AABBs so slowly moving fixtures don't churn
    /// the pair set every step.
    pub margin: f64,
    /// Proxy count below which brute force is used in `Auto` mode.
    pub brute_force_threshold: usize,
}

impl Default for BroadPhaseConfig {
    fn default() -> Self {
        Self {
            algorithm: BroadPhaseAlgorithm::Auto,
            margin: 0.0,
            brute_force_threshold: 32,
        }
    }
}

/// The default broad-phase: a persistent proxy table swept on the axis of
/// largest spread, with a brute-force path for small scenes.
#[derive(Debug, Clone, Default)]
pub struct BroadPhaseDetector {
    config: BroadPhaseConfig,
    proxies: HashMap<FixtureKey, Proxy>,
}

/// An interval on the sweep axis.
#[derive(Debug, Clone, Copy)]
struct Interval {
    key: FixtureKey,
    min: f64,
    max: f64,
}

impl BroadPhaseDetector {
    /// Create a detector with the given configuration.
    #[must_use]
    pub fn new(config: BroadPhaseConfig) -> Self {
        Self {
            config,
            proxies: HashMap::new(),
        }
    }

    /// Get the current configuration.
    #[must_use]
    pub fn config(&self) -> &BroadPhaseConfig {
        &self.config
    }

    /// Get a stored proxy.
    #[must_use]
    pub fn proxy(&self, key: &FixtureKey) -> Option<&Proxy> {
        self.proxies.get(key)
    }

    /// Whether a candidate pair survives the cheap rejection tests.
    fn pair_allowed(a: (&FixtureKey, &Proxy), b: (&FixtureKey, &Proxy)) -> bool {
        if a.0.body == b.0.body {
            return false;
        }
        if a.1.is_static && b.1.is_static {
            return false;
        }
        a.1.filter.can_collide(&b.1.filter)
    }

    /// Order a pair canonically so the output never contains both (a, b)
    /// and (b, a).
    fn ordered(a: FixtureKey, b: FixtureKey) -> (FixtureKey, FixtureKey) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Choose the sweep axis with the largest spread of proxy centers.
    fn choose_sweep_axis(&self) -> usize {
        let mut min = [f64::INFINITY; 2];
        let mut max = [f64::NEG_INFINITY; 2];
        for proxy in self.proxies.values() {
            let center = proxy.aabb.center();
            for axis in 0..2 {
                min[axis] = min[axis].min(center[axis]);
                max[axis] = max[axis].max(center[axis]);
            }
        }
        if max[0] - min[0] >= max[1] - min[1] {
            0
        } else {
            1
        }
    }

    fn detect_brute(&self) -> Vec<(FixtureKey, FixtureKey)> {
        let mut pairs = Vec::new();
        let entries: Vec<_> = self.proxies.iter().collect();

        for (i, a) in entries.iter().enumerate() {
            for b in entries.iter().skip(i + 1) {
                if !Self::pair_allowed(*a, *b) {
                    continue;
                }
                if a.1.aabb.overlaps(&b.1.aabb) {
                    pairs.push(Self::ordered(*a.0, *b.0));
                }
            }
        }
        pairs.sort();
        pairs
    }

    fn detect_sap(&self) -> Vec<(FixtureKey, FixtureKey)> {
        let axis = self.choose_sweep_axis();

        let mut intervals: Vec<Interval> = self
            .proxies
            .iter()
            .map(|(key, proxy)| Interval {
                key: *key,
                min: proxy.aabb.min[axis],
                max: proxy.aabb.max[axis],
            })
            .collect();

        // Rust's sort is adaptive; nearly-sorted intervals from temporal
        // coherence cost close to O(n).
        intervals.sort_by(|a, b| a.min.partial_cmp(&b.min).unwrap_or(std::cmp::Ordering::Equal));

        let mut pairs = Vec::new();
        for (i, interval_i) in intervals.iter().enumerate() {
            let Some(proxy_i) = self.proxies.get(&interval_i.key) else {
                continue;
            };
            for interval_j in intervals.iter().skip(i + 1) {
                if interval_j.min > interval_i.max {
                    break;
                }
                let Some(proxy_j) = self.proxies.get(&interval_j.key) else {
                    continue;
                };
                if !Self::pair_allowed((&interval_i.key, proxy_i), (&interval_j.key, proxy_j)) {
                    continue;
                }
                if proxy_i.aabb.overlaps(&proxy_j.aabb) {
                    pairs.push(Self::ordered(interval_i.key, interval_j.key));
                }
            }
        }
        pairs.sort();
        pairs
    }
}

impl BroadPhase for BroadPhaseDetector {
    fn update(&mut self, key: FixtureKey, mut proxy: Proxy) {
        if self.config.margin > 0.0 {
            proxy.aabb = proxy.aabb.expanded(self.config.margin);
        }
        self.proxies.insert(key, proxy);
    }

    fn remove(&mut self, key: &FixtureKey) -> bool {
        self.proxies.remove(key).is_some()
    }

    fn query(&self, aabb: &Aabb) -> Vec<FixtureKey> {
        let mut hits: Vec<FixtureKey> = self
            .proxies
            .iter()
            .filter(|(_, proxy)| proxy.aabb.overlaps(aabb))
            .map(|(key, _)| *key)
            .collect();
        hits.sort();
        hits
    }

    fn detect(&mut self) -> Vec<(FixtureKey, FixtureKey)> {
        let use_brute = match self.config.algorithm {
            BroadPhaseAlgorithm::Auto => self.proxies.len() < self.config.brute_force_threshold,
            BroadPhaseAlgorithm::BruteForce => true,
            BroadPhaseAlgorithm::SweepAndPrune => false,
        };
        if use_brute {
            self.detect_brute()
        } else {
            self.detect_sap()
        }
    }

    fn len(&self) -> usize {
        self.proxies.len()
    }
}
