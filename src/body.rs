//! Rigid Body State
//!
//! [`Body`] carries the full per-body simulation state: kinematics, inverse
//! inertia, shape + scale, contact material, the cached world-space vertex
//! list and AABB, and the broadphase slot it currently occupies. Bodies live
//! in the world's arena and are addressed by index; a freed slot is recycled
//! by the next insertion.
//!
//! Mesh data is looked up through a [`MeshRegistry`] handle passed into the
//! methods that need it, so bodies stay plain data.

use crate::math::{Aabb, Vec2};
use crate::mesh::{MeshRegistry, Shape, CIRCLE_RADIUS};

/// Default static friction coefficient.
pub const DEFAULT_STATIC_FRICTION: f32 = 0.3;

/// Default kinetic friction coefficient.
pub const DEFAULT_KINETIC_FRICTION: f32 = 0.2;

// ============================================================================
// BodyState
// ============================================================================

/// Lifecycle / simulation role of a body slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BodyState {
    /// Recyclable slot; ignored by every pipeline stage.
    Free = 0,
    /// Fully simulated body.
    Dynamic = 1,
    /// Immovable body; collides with dynamic bodies but is never integrated,
    /// and static/static pairs are suppressed in the broadphase.
    Static = 2,
}

// ============================================================================
// Body
// ============================================================================

/// Rigid-body state plus cached collision geometry.
#[derive(Clone, Debug)]
pub struct Body {
    /// World-space position of the center of mass.
    pub position: Vec2,
    /// Linear velocity.
    pub velocity: Vec2,
    /// Linear acceleration, reset to gravity each step.
    pub acceleration: Vec2,
    /// Orientation angle in radians (counter-clockwise from +X).
    pub theta: f32,
    /// Angular velocity.
    pub omega: f32,
    /// Angular acceleration.
    pub alpha: f32,
    /// Cached `cos(theta)`; refreshed whenever `theta` changes.
    pub cos_theta: f32,
    /// Cached `sin(theta)`.
    pub sin_theta: f32,
    /// Inverse mass (0 for static bodies).
    pub inv_mass: f32,
    /// Inverse moment of inertia (0 for static bodies).
    pub inv_moi: f32,
    /// Collision shape.
    pub shape: Shape,
    /// Uniform scale applied to the shape.
    pub scale: f32,
    /// Coefficient of restitution in `[0, 1]`.
    pub restitution: f32,
    /// Static friction coefficient.
    pub s_friction: f32,
    /// Kinetic friction coefficient.
    pub k_friction: f32,
    /// World-space vertices after scale/rotation/translation; empty for
    /// circles.
    pub transformed: Vec<Vec2>,
    /// Current bounding box.
    pub aabb: Aabb,
    /// Broadphase placement as `(flat cell index, level)`; `None` while
    /// unplaced.
    pub grid_slot: Option<(usize, usize)>,
    /// Slot lifecycle state.
    pub state: BodyState,
    /// Positional-correction accumulator, flushed once per step.
    pub correction: Vec2,
}

impl Body {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_dynamic(
        position: Vec2,
        velocity: Vec2,
        shape: Shape,
        inv_mass: f32,
        inv_moi: f32,
        scale: f32,
        angle: f32,
        restitution: f32,
    ) -> Self {
        Self {
            position,
            velocity,
            acceleration: Vec2::ZERO,
            theta: angle,
            omega: 0.0,
            alpha: 0.0,
            cos_theta: angle.cos(),
            sin_theta: angle.sin(),
            inv_mass,
            inv_moi,
            shape,
            scale,
            restitution,
            s_friction: DEFAULT_STATIC_FRICTION,
            k_friction: DEFAULT_KINETIC_FRICTION,
            transformed: Vec::new(),
            aabb: Aabb::default(),
            grid_slot: None,
            state: BodyState::Dynamic,
            correction: Vec2::ZERO,
        }
    }

    pub(crate) fn new_static(
        position: Vec2,
        shape: Shape,
        scale: f32,
        angle: f32,
        restitution: f32,
    ) -> Self {
        let mut body = Self::new_dynamic(
            position,
            Vec2::ZERO,
            shape,
            0.0,
            0.0,
            scale,
            angle,
            restitution,
        );
        body.state = BodyState::Static;
        body
    }

    /// Whether this body is integrated and responds to impulses.
    #[inline]
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.state == BodyState::Dynamic
    }

    /// Whether this body is an immovable collider.
    #[inline]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.state == BodyState::Static
    }

    /// Whether this slot is free for reuse.
    #[inline]
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.state == BodyState::Free
    }

    /// Public mesh id of this body's shape.
    #[inline]
    #[must_use]
    pub fn mesh_id(&self) -> usize {
        self.shape.mesh_id()
    }

    /// Set the orientation and refresh the cached cos/sin.
    #[inline]
    pub fn set_angle(&mut self, theta: f32) {
        self.theta = theta;
        self.cos_theta = theta.cos();
        self.sin_theta = theta.sin();
    }

    /// Fill `transformed` with the mesh vertices scaled, rotated by the
    /// cached cos/sin, and translated to the body position. No-op for
    /// circles.
    pub fn transform(&mut self, registry: &MeshRegistry) {
        self.transformed.clear();
        let Shape::Polygon(mesh_id) = self.shape else {
            return;
        };
        let Some(mesh) = registry.get(mesh_id) else {
            return;
        };
        for point in &mesh.points {
            self.transformed.push(
                (*point * self.scale).rotate(self.cos_theta, self.sin_theta) + self.position,
            );
        }
    }

    /// Recompute the bounding box. Polygons are transformed first; circles
    /// use `position +/- radius`.
    pub fn calculate_aabb(&mut self, registry: &MeshRegistry) {
        if self.shape.is_circle() {
            let radius = CIRCLE_RADIUS * self.scale;
            let r = Vec2::new(radius, radius);
            self.aabb = Aabb::new(self.position - r, self.position + r);
            return;
        }

        self.transform(registry);
        let mut min = self.position;
        let mut max = self.position;
        for tp in &self.transformed {
            min = min.min(*tp);
            max = max.max(*tp);
        }
        self.aabb = Aabb::new(min, max);
    }

    /// Point-in-shape test against the current transform.
    ///
    /// The polygon test requires `transformed` to be current and relies on
    /// CCW winding producing outward normals: the point is inside iff it
    /// sits behind every rotated edge normal.
    #[must_use]
    pub fn contains(&self, point: Vec2, registry: &MeshRegistry) -> bool {
        let Shape::Polygon(mesh_id) = self.shape else {
            let dist = point - self.position;
            let r = CIRCLE_RADIUS * self.scale;
            return dist.dot(dist) <= r * r;
        };
        let Some(mesh) = registry.get(mesh_id) else {
            return false;
        };

        for (i, tp) in self.transformed.iter().enumerate() {
            let norm = mesh.normals[i].rotate(self.cos_theta, self.sin_theta);
            if point.dot(norm) > tp.dot(norm) {
                return false;
            }
        }
        true
    }

    /// Min/max scalar projection of the transformed vertices onto an axis.
    #[must_use]
    pub fn project_onto_axis(&self, axis: Vec2) -> (f32, f32) {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for tp in &self.transformed {
            let p = tp.dot(axis);
            min = min.min(p);
            max = max.max(p);
        }
        (min, max)
    }
}

// ============================================================================
// Tests
// ============================================================================
