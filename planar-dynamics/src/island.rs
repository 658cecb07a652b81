//! Island construction.
//!
//! Each step, awake dynamic bodies are partitioned into islands: connected
//! components of the body graph whose edges are solvable contacts and
//! joints. Islands are solved independently, and sleeping is decided per
//! island: a stack only goes to sleep when every body in it has rested
//! long enough.
//!
//! Static bodies join islands as members (the solver needs their poses)
//! but never act as bridges: walking through a static floor would merge
//! every stack standing on it into one island. A static body can appear
//! in any number of islands; its visited flag is reset after each island
//! closes.

use std::collections::{BTreeMap, HashMap};

use planar_types::{BodyId, FixtureKey, JointId};

use crate::{Body, ContactManager, Joint};

/// One island: bodies plus the constraints among them.
#[derive(Debug, Clone, Default)]
pub struct Island {
    /// Member bodies, in discovery order; the seed comes first.
    pub bodies: Vec<BodyId>,
    /// Keys of solvable contacts among the members.
    pub contacts: Vec<(FixtureKey, FixtureKey)>,
    /// Joints among the members.
    pub joints: Vec<JointId>,
}

impl Island {
    /// Number of bodies in this island.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the island has no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

/// Partition the world into islands via a stack-based DFS seeded at every
/// awake, active, dynamic body.
///
/// Bodies reached through an edge are woken: an island is solved as a
/// whole, so a sleeping body touched by a moving one must participate.
pub(crate) fn build_islands(
    bodies: &mut BTreeMap<BodyId, Body>,
    contacts: &mut ContactManager,
    joints: &BTreeMap<JointId, Box<dyn Joint>>,
) -> Vec<Island> {
    // Clear all visited flags.
    for body in bodies.values_mut() {
        body.on_island = false;
    }
    for contact in contacts.iter_mut() {
        contact.on_island = false;
    }
    let mut joint_visited: HashMap<JointId, bool> =
        joints.keys().map(|id| (*id, false)).collect();

    // Adjacency from solvable contacts and from joints.
    let mut contact_edges: HashMap<BodyId, Vec<((FixtureKey, FixtureKey), BodyId)>> =
        HashMap::new();
    for contact in contacts.iter() {
        if !contact.is_solved() {
            continue;
        }
        let key = (contact.pair.fixture1, contact.pair.fixture2);
        let (b1, b2) = contact.pair.bodies();
        contact_edges.entry(b1).or_default().push((key, b2));
        contact_edges.entry(b2).or_default().push((key, b1));
    }

    let mut joint_edges: HashMap<BodyId, Vec<(JointId, BodyId)>> = HashMap::new();
    for (id, joint) in joints {
        let (b1, b2) = (joint.body1(), joint.body2());
        joint_edges.entry(b1).or_default().push((*id, b2));
        if b2 != b1 {
            joint_edges.entry(b2).or_default().push((*id, b1));
        }
    }

    let seeds: Vec<BodyId> = bodies.keys().copied().collect();
    let mut islands = Vec::new();
    let mut stack: Vec<BodyId> = Vec::new();

    for seed in seeds {
        {
            let body = &bodies[&seed];
            if body.on_island || body.asleep || !body.active || !body.is_dynamic() {
                continue;
            }
        }

        let mut island = Island::default();
        stack.clear();
        stack.push(seed);
        if let Some(body) = bodies.get_mut(&seed) {
            body.on_island = true;
        }

        while let Some(current) = stack.pop() {
            island.bodies.push(current);

            // Static bodies terminate traversal: they belong to the
            // island but their other contacts stay unexplored.
            if !bodies[&current].is_dynamic() {
                continue;
            }

            if let Some(edges) = contact_edges.get(&current) {
                for (key, other) in edges {
                    let Some(contact) = contacts.get_mut(key) else {
                        continue;
                    };
                    if contact.on_island {
                        continue;
                    }
                    contact.on_island = true;

                    // A constraint is recorded only once its far endpoint
                    // is an island member; the solver maps constraint
                    // bodies to island slots and relies on this. An
                    // inactive neighbor drops the edge for this step.
                    if !visit_neighbor(bodies, &mut stack, *other) {
                        continue;
                    }
                    island.contacts.push(*key);
                }
            }

            if let Some(edges) = joint_edges.get(&current) {
                for (id, other) in edges {
                    let visited = joint_visited.get_mut(id).map_or(true, |flag| {
                        let was = *flag;
                        *flag = true;
                        was
                    });
                    if visited {
                        continue;
                    }
                    if *other != current && !visit_neighbor(bodies, &mut stack, *other) {
                        continue;
                    }
                    island.joints.push(*id);
                }
            }
        }

        // Release static members for the next island.
        for id in &island.bodies {
            if let Some(body) = bodies.get_mut(id) {
                if !body.is_dynamic() {
                    body.on_island = false;
                }
            }
        }

        islands.push(island);
    }

    islands
}

/// Mark a neighbor as a member and queue it for traversal, waking it.
///
/// Returns whether the neighbor is a member of the current island: newly
/// added, or already visited. An already-visited dynamic body can only
/// belong to the current island (a shared edge would have pulled it in
/// here, not into an earlier one), and static flags are reset per island.
fn visit_neighbor(bodies: &mut BTreeMap<BodyId, Body>, stack: &mut Vec<BodyId>, id: BodyId) -> bool {
    let Some(body) = bodies.get_mut(&id) else {
        return false;
    };
    if !body.active {
        return false;
    }
    if body.on_island {
        return true;
    }
    body.on_island = true;
    if body.is_dynamic() && body.asleep {
        body.wake();
    }
    stack.push(id);
    true
}
