//! Simulation World
//!
//! [`World`] owns the body arena (with free-list id recycling), the
//! hierarchical [`QuadGrid`], and the per-step pair/result buffers. It
//! implements everything the step pipeline needs outside the parallel
//! phases: integration, grid rebuild, candidate-pair gathering, contact
//! resolution, and positional-correction flushing.
//!
//! Bodies and grid cells reference each other by index only; both sides
//! validate through the owning container, so a stale id can never
//! dereference freed memory.
//!
//! World space is the positive quadrant `[0, 2^k) x [0, 2^k)` covering the
//! configured extents; a body whose AABB leaves it is deleted at the next
//! grid rebuild (documented policy — clamping is the alternative).

use std::sync::Arc;

use crate::body::{Body, BodyState};
use crate::collision::CollisionResult;
use crate::error::PhysicsError;
use crate::math::Vec2;
use crate::mesh::{MeshRegistry, Shape};
use crate::quadgrid::{QuadGrid, MIN_CELL_SIZE};
use crate::resolver::{resolve, CORRECTION_FACTOR, PENETRATION_SLOP};

// ============================================================================
// WorldConfig
// ============================================================================

/// Tunables fixed at world construction.
#[derive(Clone, Copy, Debug)]
pub struct WorldConfig {
    /// World width in world units.
    pub width: f32,
    /// World height in world units.
    pub height: f32,
    /// Minimum broadphase cell side; subdivision stops below it.
    pub cell_limit: u32,
    /// Positional-correction feedback factor.
    pub corr_factor: f32,
    /// Penetration tolerance below which no correction is applied.
    pub slop: f32,
    /// Gravity acceleration, the value drivers pass to `reset_forces`.
    pub gravity: Vec2,
}

impl WorldConfig {
    /// Config for a `width x height` world with default solver tunables.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1024.0,
            height: 1024.0,
            cell_limit: MIN_CELL_SIZE,
            corr_factor: CORRECTION_FACTOR,
            slop: PENETRATION_SLOP,
            gravity: Vec2::new(0.0, 20.0),
        }
    }
}

// ============================================================================
// World
// ============================================================================

/// Body storage plus the broadphase grid and per-step collision buffers.
pub struct World {
    config: WorldConfig,
    registry: Arc<MeshRegistry>,
    pub(crate) bodies: Vec<Body>,
    free_list: Vec<usize>,
    active_count: usize,
    collision_count: usize,
    pub(crate) quad: QuadGrid,
    pub(crate) collision_pairs: Vec<(usize, usize)>,
    pub(crate) collision_data: Vec<CollisionResult>,
}

impl World {
    /// Create a world over `[0, width) x [0, height)`.
    #[must_use]
    pub fn new(config: WorldConfig, registry: Arc<MeshRegistry>) -> Self {
        let extent = config.width.max(config.height).max(1.0).ceil() as u32;
        Self {
            quad: QuadGrid::new(extent, config.cell_limit),
            config,
            registry,
            bodies: Vec::new(),
            free_list: Vec::new(),
            active_count: 0,
            collision_count: 0,
            collision_pairs: Vec::new(),
            collision_data: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Body management
    // ------------------------------------------------------------------

    /// Add a dynamic body. Returns its id, recycling freed ids first.
    ///
    /// `mesh_id` must be registered or the circle sentinel; `mass` and
    /// `moi` must be positive and finite. `restitution` is clamped to
    /// `[0, 1]`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_body(
        &mut self,
        position: Vec2,
        velocity: Vec2,
        mesh_id: usize,
        mass: f32,
        moi: f32,
        scale: f32,
        angle: f32,
        restitution: f32,
    ) -> Result<usize, PhysicsError> {
        let shape = Shape::from_mesh_id(mesh_id, &self.registry)?;
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(PhysicsError::InvalidBodyParameter {
                reason: "mass must be positive and finite",
            });
        }
        if !(moi > 0.0 && moi.is_finite()) {
            return Err(PhysicsError::InvalidBodyParameter {
                reason: "moment of inertia must be positive and finite",
            });
        }

        let mut body = Body::new_dynamic(
            position,
            velocity,
            shape,
            1.0 / mass,
            1.0 / moi,
            scale,
            angle,
            restitution.clamp(0.0, 1.0),
        );
        body.calculate_aabb(&self.registry);
        Ok(self.insert(body))
    }

    /// Add a static (immovable) body. Returns its id.
    pub fn add_static_body(
        &mut self,
        position: Vec2,
        mesh_id: usize,
        scale: f32,
        angle: f32,
        restitution: f32,
    ) -> Result<usize, PhysicsError> {
        let shape = Shape::from_mesh_id(mesh_id, &self.registry)?;
        let mut body =
            Body::new_static(position, shape, scale, angle, restitution.clamp(0.0, 1.0));
        body.calculate_aabb(&self.registry);
        Ok(self.insert(body))
    }

    fn insert(&mut self, body: Body) -> usize {
        if let Some(id) = self.free_list.pop() {
            self.bodies[id] = body;
            id
        } else {
            self.bodies.push(body);
            self.bodies.len() - 1
        }
    }

    /// Mark a body slot free and recycle its id. Safe to call with an id
    /// that is already free or out of range (no-op). Its grid entry is
    /// flushed by the next `reset_grid`.
    pub fn delete_body(&mut self, id: usize) {
        let Some(body) = self.bodies.get_mut(id) else {
            return;
        };
        if body.is_free() {
            return;
        }
        body.state = BodyState::Free;
        self.free_list.push(id);
    }

    // ------------------------------------------------------------------
    // Broadphase grid
    // ------------------------------------------------------------------

    /// Recompute a body's AABB and broadphase slot. A body whose AABB has
    /// escaped the grid is deleted.
    fn update_cell(&mut self, id: usize) {
        let registry = &self.registry;
        self.bodies[id].calculate_aabb(registry);

        let aabb = self.bodies[id].aabb;
        let level = self.quad.level_for(aabb.longest_side());
        let (gx, gy) = self.quad.grid_coord(level, aabb.min.x, aabb.min.y);

        match self.quad.cell_index(level, gx, gy) {
            Some(index) => self.bodies[id].grid_slot = Some((index, level)),
            None => {
                self.bodies[id].grid_slot = None;
                self.delete_body(id);
            }
        }
    }

    /// Place every non-free body into the grid and refresh `active_count`.
    pub fn init_grid(&mut self) {
        self.active_count = 0;
        for id in 0..self.bodies.len() {
            if self.bodies[id].is_free() {
                continue;
            }
            self.update_cell(id);
            let Some((index, level)) = self.bodies[id].grid_slot else {
                continue; // escaped the grid and was deleted
            };
            self.quad.insert(index, level, id);
            self.active_count += 1;
        }
    }

    /// Empty every grid cell referenced by a body and drop all occupancy
    /// flags. Cell allocations are retained for the next step.
    pub fn reset_grid(&mut self) {
        for id in 0..self.bodies.len() {
            if let Some((index, _)) = self.bodies[id].grid_slot {
                self.quad.clear_cell(index);
                if self.bodies[id].is_free() {
                    self.bodies[id].grid_slot = None;
                }
            }
        }
        self.quad.clear_occupancy();
    }

    /// Append this body's candidate pairs to `out`.
    ///
    /// Scans the 3x3 neighborhood at the body's own level and every
    /// coarser level up to the root, skipping unoccupied levels. At the
    /// body's own level only `id < other` pairs are emitted; cross-level
    /// pairs need no such tie-break because bodies scan only coarser
    /// levels, so each pair is produced exactly once (by the deeper body).
    pub fn gather_neighbors_into(&self, id: usize, out: &mut Vec<(usize, usize)>) {
        let body = &self.bodies[id];
        let Some((_, body_level)) = body.grid_slot else {
            return;
        };
        let aabb = body.aabb;
        let body_is_static = body.is_static();

        for level in (0..=body_level).rev() {
            if !self.quad.is_level_occupied(level) {
                continue;
            }
            let (gx, gy) = self.quad.grid_coord(level, aabb.min.x, aabb.min.y);

            for dy in -1..=1i64 {
                for dx in -1..=1i64 {
                    let Some(index) = self.quad.cell_index(level, gx + dx, gy + dy) else {
                        continue;
                    };
                    for &other in self.quad.cell(index) {
                        if body_is_static && self.bodies[other].is_static() {
                            continue;
                        }
                        if level == body_level && id >= other {
                            continue;
                        }
                        if aabb.overlaps(&self.bodies[other].aabb) {
                            out.push((id, other));
                        }
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Forces and integration
    // ------------------------------------------------------------------

    /// Reset every body's acceleration to `g`.
    pub fn reset_forces(&mut self, g: Vec2) {
        for body in &mut self.bodies {
            body.acceleration = g;
        }
    }

    /// Accumulate a force on a dynamic body for the next velocity update.
    pub fn apply_force(&mut self, id: usize, force: Vec2) {
        if let Some(body) = self.bodies.get_mut(id) {
            if body.is_dynamic() {
                let inv_mass = body.inv_mass;
                body.acceleration += force * inv_mass;
            }
        }
    }

    /// Integrate accelerations into velocities for dynamic bodies.
    pub fn update_velocities(&mut self, dt: f32) {
        for body in &mut self.bodies {
            if body.is_dynamic() {
                body.velocity += body.acceleration * dt;
                body.omega += body.alpha * dt;
            }
        }
    }

    /// Integrate velocities into positions and angles for dynamic bodies,
    /// refreshing the cached rotation terms.
    pub fn update_positions(&mut self, dt: f32) {
        for body in &mut self.bodies {
            if body.is_dynamic() {
                body.position += body.velocity * dt;
                let theta = body.theta + body.omega * dt;
                body.set_angle(theta);
            }
        }
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Run the impulse resolver over every colliding pair in the current
    /// buffers and count the collisions.
    pub fn resolve_collisions(&mut self) {
        self.collision_count = 0;
        for i in 0..self.collision_pairs.len() {
            let res = self.collision_data[i];
            if res.count == 0 {
                continue;
            }
            let (ia, ib) = self.collision_pairs[i];
            let (a, b) = pair_mut(&mut self.bodies, ia, ib);
            resolve(a, b, &res, self.config.corr_factor, self.config.slop);
            self.collision_count += 1;
        }
    }

    /// Flush accumulated positional corrections into dynamic bodies.
    pub fn apply_corrections(&mut self) {
        for body in &mut self.bodies {
            if body.is_dynamic() {
                body.position += body.correction;
            }
            body.correction = Vec2::ZERO;
        }
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Look up a body slot (any state) by id.
    #[inline]
    #[must_use]
    pub fn body(&self, id: usize) -> Option<&Body> {
        self.bodies.get(id)
    }

    /// Iterate non-free bodies with their ids.
    pub fn iter_active(&self) -> impl Iterator<Item = (usize, &Body)> {
        self.bodies
            .iter()
            .enumerate()
            .filter(|(_, body)| !body.is_free())
    }

    /// High-water mark of body slots ever allocated.
    #[inline]
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.bodies.len()
    }

    /// Bodies placed in the grid by the last `init_grid`.
    #[inline]
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Colliding pairs counted by the last `resolve_collisions`.
    #[inline]
    #[must_use]
    pub fn collision_count(&self) -> usize {
        self.collision_count
    }

    /// Candidate pairs from the last broadphase.
    #[inline]
    #[must_use]
    pub fn collision_pairs(&self) -> &[(usize, usize)] {
        &self.collision_pairs
    }

    /// Narrowphase results, parallel to `collision_pairs`.
    #[inline]
    #[must_use]
    pub fn collision_results(&self) -> &[CollisionResult] {
        &self.collision_data
    }

    /// The shared mesh registry.
    #[inline]
    #[must_use]
    pub fn mesh_registry(&self) -> &MeshRegistry {
        &self.registry
    }

    /// The construction-time configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The broadphase grid (diagnostics, debug rendering).
    #[inline]
    #[must_use]
    pub fn quad(&self) -> &QuadGrid {
        &self.quad
    }
}

/// Disjoint mutable borrows of two distinct body slots, in argument order.
fn pair_mut(bodies: &mut [Body], a: usize, b: usize) -> (&mut Body, &mut Body) {
    debug_assert_ne!(a, b);
    if a < b {
        let (lo, hi) = bodies.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = bodies.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::perform_sat;
    use crate::mesh::CIRCLE_MESH_ID;

    fn registry() -> Arc<MeshRegistry> {
        let mut reg = MeshRegistry::new();
        // mesh 0: side-20 square
        reg.register(&[
            Vec2::new(-10.0, -10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(-10.0, 10.0),
        ])
        .unwrap();
        // mesh 1: side-200 square
        reg.register(&[
            Vec2::new(-100.0, -100.0),
            Vec2::new(100.0, -100.0),
            Vec2::new(100.0, 100.0),
            Vec2::new(-100.0, 100.0),
        ])
        .unwrap();
        Arc::new(reg)
    }

    fn world() -> World {
        World::new(WorldConfig::new(1024.0, 1024.0), registry())
    }

    fn add_circle(world: &mut World, pos: Vec2, vel: Vec2) -> usize {
        world
            .add_body(pos, vel, CIRCLE_MESH_ID, 1.0, 1.0, 1.0, 0.0, 0.5)
            .unwrap()
    }

    /// Drive one full step without the parallel engine.
    fn step_serial(world: &mut World, dt: f32) {
        world.update_velocities(dt);
        world.update_positions(dt);
        world.init_grid();

        world.collision_pairs.clear();
        let ids: Vec<usize> = world.iter_active().map(|(id, _)| id).collect();
        let mut pairs = Vec::new();
        for id in ids {
            world.gather_neighbors_into(id, &mut pairs);
        }
        world.collision_pairs = pairs;

        world.collision_data.clear();
        for i in 0..world.collision_pairs.len() {
            let (a, b) = world.collision_pairs[i];
            let res = perform_sat(&world.bodies[a], &world.bodies[b], world.mesh_registry());
            world.collision_data.push(res);
        }

        world.resolve_collisions();
        world.apply_corrections();
        world.reset_grid();
    }

    #[test]
    fn test_add_body_validation() {
        let mut w = world();
        assert!(w
            .add_body(Vec2::new(100.0, 100.0), Vec2::ZERO, 99, 1.0, 1.0, 1.0, 0.0, 0.5)
            .is_err());
        assert!(w
            .add_body(Vec2::new(100.0, 100.0), Vec2::ZERO, 0, 0.0, 1.0, 1.0, 0.0, 0.5)
            .is_err());
        assert!(w
            .add_body(Vec2::new(100.0, 100.0), Vec2::ZERO, 0, 1.0, -2.0, 1.0, 0.0, 0.5)
            .is_err());
        assert!(w
            .add_body(Vec2::new(100.0, 100.0), Vec2::ZERO, 0, 1.0, 1.0, 1.0, 0.0, 0.5)
            .is_ok());
    }

    #[test]
    fn test_free_list_reuse() {
        let mut w = world();
        let a = add_circle(&mut w, Vec2::new(100.0, 100.0), Vec2::ZERO);
        let b = add_circle(&mut w, Vec2::new(200.0, 100.0), Vec2::ZERO);
        let c = add_circle(&mut w, Vec2::new(300.0, 100.0), Vec2::ZERO);
        assert_eq!((a, b, c), (0, 1, 2));

        w.delete_body(1);
        assert!(w.body(1).unwrap().is_free());

        let d = add_circle(&mut w, Vec2::new(400.0, 100.0), Vec2::ZERO);
        assert_eq!(d, 1);
        assert_eq!(w.allocated(), 3);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut w = world();
        let id = add_circle(&mut w, Vec2::new(100.0, 100.0), Vec2::ZERO);
        w.delete_body(id);
        w.delete_body(id);
        w.delete_body(999);

        // Only one free-list entry: the next two adds get ids 0 then 1
        assert_eq!(add_circle(&mut w, Vec2::new(100.0, 100.0), Vec2::ZERO), 0);
        assert_eq!(add_circle(&mut w, Vec2::new(200.0, 100.0), Vec2::ZERO), 1);
    }

    #[test]
    fn test_init_grid_places_each_body_once() {
        let mut w = world();
        let a = add_circle(&mut w, Vec2::new(100.0, 100.0), Vec2::ZERO);
        let b = add_circle(&mut w, Vec2::new(500.0, 500.0), Vec2::ZERO);
        w.init_grid();

        assert_eq!(w.active_count(), 2);
        for id in [a, b] {
            let (index, level) = w.body(id).unwrap().grid_slot.unwrap();
            let occupants: Vec<_> = w.quad.cell(index).iter().filter(|&&x| x == id).collect();
            assert_eq!(occupants.len(), 1, "body {id} not in its cell exactly once");
            assert!(w.quad.is_level_occupied(level));
        }
    }

    #[test]
    fn test_reset_grid_clears_cells_and_occupancy() {
        let mut w = world();
        let a = add_circle(&mut w, Vec2::new(100.0, 100.0), Vec2::ZERO);
        w.init_grid();
        let (index, level) = w.body(a).unwrap().grid_slot.unwrap();

        w.reset_grid();
        assert!(w.quad.cell(index).is_empty());
        assert!(!w.quad.is_level_occupied(level));
    }

    #[test]
    fn test_out_of_bounds_body_is_deleted() {
        let mut w = world();
        // AABB minimum goes negative: escaped the grid
        let id = add_circle(&mut w, Vec2::new(5.0, 5.0), Vec2::ZERO);
        w.init_grid();

        assert!(w.body(id).unwrap().is_free());
        assert_eq!(w.active_count(), 0);
        // The id is recyclable again
        assert_eq!(add_circle(&mut w, Vec2::new(100.0, 100.0), Vec2::ZERO), id);
    }

    #[test]
    fn test_gather_same_level_pair_once() {
        let mut w = world();
        let a = add_circle(&mut w, Vec2::new(100.0, 100.0), Vec2::ZERO);
        let b = add_circle(&mut w, Vec2::new(115.0, 100.0), Vec2::ZERO);
        w.init_grid();

        let mut pairs = Vec::new();
        w.gather_neighbors_into(a, &mut pairs);
        w.gather_neighbors_into(b, &mut pairs);

        assert_eq!(pairs, vec![(a, b)]);
    }

    #[test]
    fn test_gather_cross_level_pair_once() {
        let mut w = world();
        // Small body (deep level) overlapping a large body (shallow level)
        let small = add_circle(&mut w, Vec2::new(260.0, 260.0), Vec2::ZERO);
        let large = w
            .add_body(Vec2::new(300.0, 300.0), Vec2::ZERO, 1, 100.0, 100.0, 1.0, 0.0, 0.5)
            .unwrap();
        w.init_grid();

        let small_level = w.body(small).unwrap().grid_slot.unwrap().1;
        let large_level = w.body(large).unwrap().grid_slot.unwrap().1;
        assert!(small_level > large_level, "sizes must map to distinct levels");

        let mut pairs = Vec::new();
        w.gather_neighbors_into(small, &mut pairs);
        w.gather_neighbors_into(large, &mut pairs);

        assert_eq!(pairs.len(), 1, "cross-level pair must appear exactly once");
        assert_eq!(pairs[0], (small, large));
    }

    #[test]
    fn test_gather_suppresses_static_static() {
        let mut w = world();
        let a = w
            .add_static_body(Vec2::new(100.0, 100.0), 0, 1.0, 0.0, 0.2)
            .unwrap();
        let b = w
            .add_static_body(Vec2::new(110.0, 100.0), 0, 1.0, 0.0, 0.2)
            .unwrap();
        w.init_grid();

        let mut pairs = Vec::new();
        w.gather_neighbors_into(a, &mut pairs);
        w.gather_neighbors_into(b, &mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_gather_requires_aabb_overlap() {
        let mut w = world();
        // Same deepest-level cell neighborhood, but AABBs apart
        let a = add_circle(&mut w, Vec2::new(100.0, 100.0), Vec2::ZERO);
        let b = add_circle(&mut w, Vec2::new(130.0, 100.0), Vec2::ZERO);
        w.init_grid();

        let mut pairs = Vec::new();
        w.gather_neighbors_into(a, &mut pairs);
        w.gather_neighbors_into(b, &mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_integration_skips_static() {
        let mut w = world();
        let s = w
            .add_static_body(Vec2::new(100.0, 100.0), 0, 1.0, 0.0, 0.2)
            .unwrap();
        let d = add_circle(&mut w, Vec2::new(300.0, 100.0), Vec2::new(10.0, 0.0));

        w.reset_forces(Vec2::new(0.0, 20.0));
        w.update_velocities(0.5);
        w.update_positions(0.5);

        let stat = w.body(s).unwrap();
        assert_eq!(stat.position, Vec2::new(100.0, 100.0));
        assert_eq!(stat.velocity, Vec2::ZERO);

        let dynamic = w.body(d).unwrap();
        assert_eq!(dynamic.velocity, Vec2::new(10.0, 10.0));
        assert_eq!(dynamic.position, Vec2::new(305.0, 105.0));
    }

    #[test]
    fn test_apply_force_scales_by_inverse_mass() {
        let mut w = world();
        let id = w
            .add_body(
                Vec2::new(100.0, 100.0),
                Vec2::ZERO,
                CIRCLE_MESH_ID,
                4.0,
                1.0,
                1.0,
                0.0,
                0.5,
            )
            .unwrap();
        w.reset_forces(Vec2::ZERO);
        w.apply_force(id, Vec2::new(8.0, 0.0));
        assert_eq!(w.body(id).unwrap().acceleration, Vec2::new(2.0, 0.0));

        // Forces on static bodies are ignored
        let s = w
            .add_static_body(Vec2::new(300.0, 100.0), 0, 1.0, 0.0, 0.2)
            .unwrap();
        w.apply_force(s, Vec2::new(100.0, 0.0));
        assert_eq!(w.body(s).unwrap().acceleration, Vec2::ZERO);
    }

    #[test]
    fn test_step_resolves_and_applies_corrections() {
        let mut w = world();
        let a = add_circle(&mut w, Vec2::new(500.0, 500.0), Vec2::new(1.0, 0.0));
        let b = add_circle(&mut w, Vec2::new(515.0, 500.0), Vec2::new(-1.0, 0.0));

        step_serial(&mut w, 0.0);

        assert_eq!(w.collision_count(), 1);
        // Positional correction pushed the bodies apart along x
        assert!(w.body(a).unwrap().position.x < 500.0);
        assert!(w.body(b).unwrap().position.x > 515.0);
        // Corrections were consumed
        assert_eq!(w.body(a).unwrap().correction, Vec2::ZERO);
    }

    #[test]
    fn test_spread_bodies_produce_no_pairs() {
        let mut w = world();
        for i in 0..10 {
            for j in 0..10 {
                add_circle(
                    &mut w,
                    Vec2::new(60.0 + i as f32 * 90.0, 60.0 + j as f32 * 90.0),
                    Vec2::ZERO,
                );
            }
        }
        step_serial(&mut w, 0.016);
        assert_eq!(w.collision_pairs().len(), 0);
    }
}
