//! Persistent contacts and the contact manager.
//!
//! The manager keeps one [`Contact`] per ordered fixture pair, keyed by a
//! hash map. Each step the world feeds it the fresh manifolds; points
//! whose [`ManifoldPointId`] matches a point from the previous step
//! inherit its accumulated impulses (warm-starting), new points start
//! cold, and pairs that stopped producing a manifold are removed with an
//! `end` event.

use std::collections::HashMap;

use nalgebra::{Point2, Vector2};
use planar_collision::{Manifold, ManifoldPointId};
use planar_types::{FixtureKey, Transform};

use crate::events::ContactPair;

/// How long a warning for a given pair is suppressed after firing (s).
const WARNING_INTERVAL: f64 = 1.0;

/// What happened to a contact during a manager update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactLife {
    /// The pair started touching this step.
    Begin,
    /// The pair was already touching last step.
    Persist,
}

/// Per-point solver state.
#[derive(Debug, Clone, Copy)]
pub struct ContactPoint {
    /// Stable identity for warm-starting.
    pub id: ManifoldPointId,
    /// World-space contact point at detection time.
    pub point: Point2<f64>,
    /// Contact point in body 1's local frame.
    pub local1: Point2<f64>,
    /// Contact point in body 2's local frame.
    pub local2: Point2<f64>,
    /// Penetration depth at detection time.
    pub depth: f64,

    /// Arm from body 1's center of mass (set at solver init).
    pub r1: Vector2<f64>,
    /// Arm from body 2's center of mass (set at solver init).
    pub r2: Vector2<f64>,
    /// Effective mass along the normal.
    pub normal_mass: f64,
    /// Effective mass along the tangent.
    pub tangent_mass: f64,
    /// Restitution bias velocity.
    pub velocity_bias: f64,
    /// Accumulated normal impulse (≥ 0 after solving).
    pub normal_impulse: f64,
    /// Accumulated tangent impulse.
    pub tangent_impulse: f64,
}

impl ContactPoint {
    fn new(
        id: ManifoldPointId,
        point: Point2<f64>,
        depth: f64,
        transform1: &Transform,
        transform2: &Transform,
    ) -> Self {
        Self {
            id,
            point,
            local1: transform1.inverse_transform_point(&point),
            local2: transform2.inverse_transform_point(&point),
            depth,
            r1: Vector2::zeros(),
            r2: Vector2::zeros(),
            normal_mass: 0.0,
            tangent_mass: 0.0,
            velocity_bias: 0.0,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
        }
    }
}

/// A persistent contact between two fixtures.
#[derive(Debug, Clone)]
pub struct Contact {
    /// The fixture pair (ordered: `fixture1 <= fixture2`).
    pub pair: ContactPair,
    /// Contact normal, pointing from body 2 toward body 1.
    pub normal: Vector2<f64>,
    /// The contact points (one or two).
    pub points: Vec<ContactPoint>,
    /// Mixed coefficient of friction (geometric mean).
    pub friction: f64,
    /// Mixed coefficient of restitution (maximum).
    pub restitution: f64,
    /// Whether either fixture is a sensor.
    pub sensor: bool,
    /// Whether resolution is enabled this step (pre-solve veto).
    pub enabled: bool,
    pub(crate) on_island: bool,
    pub(crate) island1: usize,
    pub(crate) island2: usize,
}

impl Contact {
    /// Whether this contact takes part in the solver.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        !self.sensor && self.enabled && !self.points.is_empty()
    }
}

/// The persistent contact table.
#[derive(Debug, Default)]
pub struct ContactManager {
    contacts: HashMap<(FixtureKey, FixtureKey), Contact>,
    /// Last warning time per pair, for rate limiting.
    warned: HashMap<(FixtureKey, FixtureKey), f64>,
    /// Pairs seen in the current detection pass.
    seen: Vec<(FixtureKey, FixtureKey)>,
}

impl ContactManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a detection pass.
    pub(crate) fn begin_update(&mut self) {
        self.seen.clear();
    }

    /// Record the fresh manifold for a pair, inheriting accumulated
    /// impulses from points whose ids match the previous step.
    ///
    /// Returns whether the contact began or persisted.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn update_pair(
        &mut self,
        pair: ContactPair,
        manifold: &Manifold,
        transform1: &Transform,
        transform2: &Transform,
        friction: f64,
        restitution: f64,
        sensor: bool,
    ) -> ContactLife {
        let key = (pair.fixture1, pair.fixture2);
        self.seen.push(key);

        let mut points: Vec<ContactPoint> = manifold
            .points
            .iter()
            .map(|p| ContactPoint::new(p.id, p.point, p.depth, transform1, transform2))
            .collect();

        match self.contacts.get_mut(&key) {
            Some(existing) => {
                // Warm start: carry impulses across steps by point id.
                for point in &mut points {
                    if let Some(old) = existing.points.iter().find(|old| old.id == point.id) {
                        point.normal_impulse = old.normal_impulse;
                        point.tangent_impulse = old.tangent_impulse;
                    }
                }
                existing.normal = manifold.normal;
                existing.points = points;
                existing.friction = friction;
                existing.restitution = restitution;
                existing.sensor = sensor;
                existing.enabled = true;
                ContactLife::Persist
            }
            None => {
                self.contacts.insert(
                    key,
                    Contact {
                        pair,
                        normal: manifold.normal,
                        points,
                        friction,
                        restitution,
                        sensor,
                        enabled: true,
                        on_island: false,
                        island1: 0,
                        island2: 0,
                    },
                );
                ContactLife::Begin
            }
        }
    }

    /// End a detection pass: remove and return every contact that was not
    /// refreshed (these fire `end` events).
    pub(crate) fn finish_update(&mut self) -> Vec<Contact> {
        let seen: std::collections::HashSet<_> = self.seen.iter().copied().collect();
        let stale: Vec<_> = self
            .contacts
            .keys()
            .filter(|key| !seen.contains(*key))
            .copied()
            .collect();
        stale
            .into_iter()
            .filter_map(|key| self.contacts.remove(&key))
            .collect()
    }

    /// Remove every contact touching the given body, returning them.
    pub(crate) fn remove_body(&mut self, body: planar_types::BodyId) -> Vec<Contact> {
        let keys: Vec<_> = self
            .contacts
            .keys()
            .filter(|(a, b)| a.body == body || b.body == body)
            .copied()
            .collect();
        keys.into_iter()
            .filter_map(|key| self.contacts.remove(&key))
            .collect()
    }

    /// Whether a warning for this pair is currently allowed; if so,
    /// records the time and suppresses further warnings for a second.
    pub(crate) fn allow_warning(&mut self, pair: ContactPair, now: f64) -> bool {
        let key = (pair.fixture1, pair.fixture2);
        match self.warned.get(&key) {
            Some(&last) if now - last < WARNING_INTERVAL => false,
            _ => {
                self.warned.insert(key, now);
                true
            }
        }
    }

    /// Look up a contact.
    #[must_use]
    pub fn get(&self, key: &(FixtureKey, FixtureKey)) -> Option<&Contact> {
        self.contacts.get(key)
    }

    /// Mutable lookup.
    pub(crate) fn get_mut(&mut self, key: &(FixtureKey, FixtureKey)) -> Option<&mut Contact> {
        self.contacts.get_mut(key)
    }

    /// Iterate over all contacts.
    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.values()
    }

    /// Mutable iteration.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Contact> {
        self.contacts.values_mut()
    }

    /// Number of live contacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Whether there are no live contacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Whether two bodies share at least one contact.
    #[must_use]
    pub fn bodies_in_contact(
        &self,
        body1: planar_types::BodyId,
        body2: planar_types::BodyId,
    ) -> bool {
        self.contacts.keys().any(|(a, b)| {
            (a.body == body1 && b.body == body2) || (a.body == body2 && b.body == body1)
        })
    }
}

/// Mix two friction coefficients (geometric mean).
#[must_use]
pub fn mix_friction(friction1: f64, friction2: f64) -> f64 {
    (friction1 * friction2).sqrt()
}

/// Mix two restitution coefficients (maximum).
#[must_use]
pub fn mix_restitution(restitution1: f64, restitution2: f64) -> f64 {
    restitution1.max(restitution2)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use planar_collision::ManifoldPoint;
    use planar_types::{BodyId, FixtureId};

    fn pair() -> ContactPair {
        ContactPair::new(
            FixtureKey::new(BodyId::new(1), FixtureId::new(0)),
            FixtureKey::new(BodyId::new(2), FixtureId::new(0)),
        )
    }

    fn manifold_with_ids(ids: &[ManifoldPointId]) -> Manifold {
        Manifold {
            normal: Vector2::y(),
            points: ids
                .iter()
                .map(|&id| ManifoldPoint {
                    id,
                    point: Point2::origin(),
                    depth: 0.01,
                })
                .collect(),
        }
    }

    fn indexed(vertex: usize) -> ManifoldPointId {
        ManifoldPointId::Indexed {
            reference: 0,
            incident: 2,
            vertex,
            flipped: false,
        }
    }

    #[test]
    fn test_begin_then_persist_then_end() {
        let mut manager = ContactManager::new();
        let identity = Transform::identity();

        manager.begin_update();
        let life = manager.update_pair(
            pair(),
            &manifold_with_ids(&[indexed(0)]),
            &identity,
            &identity,
            0.2,
            0.0,
            false,
        );
        assert_eq!(life, ContactLife::Begin);
        assert!(manager.finish_update().is_empty());

        manager.begin_update();
        let life = manager.update_pair(
            pair(),
            &manifold_with_ids(&[indexed(0)]),
            &identity,
            &identity,
            0.2,
            0.0,
            false,
        );
        assert_eq!(life, ContactLife::Persist);
        assert!(manager.finish_update().is_empty());

        manager.begin_update();
        let ended = manager.finish_update();
        assert_eq!(ended.len(), 1);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_warm_start_carries_matching_ids_only() {
        let mut manager = ContactManager::new();
        let identity = Transform::identity();

        manager.begin_update();
        manager.update_pair(
            pair(),
            &manifold_with_ids(&[indexed(0), indexed(1)]),
            &identity,
            &identity,
            0.2,
            0.0,
            false,
        );
        manager.finish_update();

        // Accumulate some impulse on point 0.
        {
            let contact = manager
                .get_mut(&(pair().fixture1, pair().fixture2))
                .unwrap();
            contact.points[0].normal_impulse = 3.0;
            contact.points[1].normal_impulse = 5.0;
        }

        // Next step: point 0 survives, point 1 is replaced by point 2.
        manager.begin_update();
        manager.update_pair(
            pair(),
            &manifold_with_ids(&[indexed(0), indexed(2)]),
            &identity,
            &identity,
            0.2,
            0.0,
            false,
        );
        manager.finish_update();

        let contact = manager.get(&(pair().fixture1, pair().fixture2)).unwrap();
        assert_relative_eq!(contact.points[0].normal_impulse, 3.0, epsilon = 1e-12);
        assert_relative_eq!(contact.points[1].normal_impulse, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_remove_body_severs_contacts() {
        let mut manager = ContactManager::new();
        let identity = Transform::identity();

        manager.begin_update();
        manager.update_pair(
            pair(),
            &manifold_with_ids(&[indexed(0)]),
            &identity,
            &identity,
            0.2,
            0.0,
            false,
        );
        manager.finish_update();

        let severed = manager.remove_body(BodyId::new(2));
        assert_eq!(severed.len(), 1);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_warning_rate_limit() {
        let mut manager = ContactManager::new();
        assert!(manager.allow_warning(pair(), 0.0));
        assert!(!manager.allow_warning(pair(), 0.5));
        assert!(manager.allow_warning(pair(), 1.1));
    }

    #[test]
    fn test_mixing() {
        assert_relative_eq!(mix_friction(0.5, 0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(mix_friction(0.0, 1.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(mix_restitution(0.2, 0.8), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_bodies_in_contact() {
        let mut manager = ContactManager::new();
        let identity = Transform::identity();

        manager.begin_update();
        manager.update_pair(
            pair(),
            &manifold_with_ids(&[indexed(0)]),
            &identity,
            &identity,
            0.2,
            0.0,
            false,
        );
        manager.finish_update();

        assert!(manager.bodies_in_contact(BodyId::new(1), BodyId::new(2)));
        assert!(manager.bodies_in_contact(BodyId::new(2), BodyId::new(1)));
        assert!(!manager.bodies_in_contact(BodyId::new(1), BodyId::new(3)));
    }
}
