//! SAT Narrowphase and Contact Manifold Generation
//!
//! Separating-Axis tests for every shape pairing, plus incident-edge
//! clipping for polygon/polygon manifolds:
//!
//! - **circle/circle**: analytic distance test, one contact.
//! - **circle/polygon**: two axis groups (rotated edge normals, then
//!   vertex-to-center axes), one contact. The overlap measure is one-sided
//!   by design — `max_poly - min_circle` for the edge group and
//!   `max_circle - min_poly` for the vertex group — so the chosen axis
//!   carries the penetration direction in its sign convention.
//! - **polygon/polygon**: SAT over both bodies' rotated normals tracking
//!   the reference edge, then Sutherland-Hodgman clipping of the most
//!   opposed incident edge against the reference edge's side planes,
//!   keeping up to two positive-depth points.
//!
//! [`perform_sat`] dispatches on the shape tags and orients the returned
//! normal from the first body toward the second.

use crate::body::Body;
use crate::math::Vec2;
use crate::mesh::{MeshRegistry, Shape, CIRCLE_RADIUS};

// ============================================================================
// CollisionResult
// ============================================================================

/// Outcome of one narrowphase test.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CollisionResult {
    /// Number of contact points (0 means no collision).
    pub count: usize,
    /// Unit collision normal pointing from body A toward body B.
    pub normal: Vec2,
    /// Penetration depth along the normal (the SAT minimum overlap).
    pub depth: f32,
    /// Up to two world-space contact points.
    pub contacts: [Vec2; 2],
}

impl CollisionResult {
    /// Whether any contact was produced.
    #[inline]
    #[must_use]
    pub fn is_colliding(&self) -> bool {
        self.count > 0
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Run the narrowphase for a body pair.
///
/// Dispatches on the shape tags and guarantees the result's normal
/// satisfies `(b.position - a.position) . normal >= 0`, so impulses push
/// `a` backward and `b` forward.
#[must_use]
pub fn perform_sat(a: &Body, b: &Body, registry: &MeshRegistry) -> CollisionResult {
    let mut res = match (a.shape, b.shape) {
        (Shape::Circle, Shape::Circle) => circle_circle(a, b),
        (Shape::Circle, Shape::Polygon(_)) => circle_polygon(b, a, registry),
        (Shape::Polygon(_), Shape::Circle) => circle_polygon(a, b, registry),
        (Shape::Polygon(_), Shape::Polygon(_)) => polygon_polygon(a, b, registry),
    };

    if res.count == 0 {
        return res;
    }

    if (b.position - a.position).dot(res.normal) < 0.0 {
        res.normal = -res.normal;
    }
    res
}

// ============================================================================
// Circle / Circle
// ============================================================================

fn circle_circle(a: &Body, b: &Body) -> CollisionResult {
    let dist_vec = b.position - a.position;
    let dist_sq = dist_vec.dot(dist_vec);
    let rsum = CIRCLE_RADIUS * (a.scale + b.scale);

    if dist_sq > rsum * rsum {
        return CollisionResult::default();
    }

    let dist = dist_sq.sqrt();
    let normal = dist_vec.normalized();

    CollisionResult {
        count: 1,
        normal,
        depth: rsum - dist,
        contacts: [a.position + normal * (CIRCLE_RADIUS * a.scale), Vec2::ZERO],
    }
}

// ============================================================================
// Circle / Polygon
// ============================================================================

/// SAT between a polygon and a circle (`poly` first, regardless of the
/// caller's argument order; the dispatcher re-orients the normal).
fn circle_polygon(poly: &Body, circle: &Body, registry: &MeshRegistry) -> CollisionResult {
    let Shape::Polygon(mesh_id) = poly.shape else {
        return CollisionResult::default();
    };
    let Some(mesh) = registry.get(mesh_id) else {
        return CollisionResult::default();
    };

    let radius = CIRCLE_RADIUS * circle.scale;
    let mut min_overlap = f32::INFINITY;
    let mut normal = Vec2::ZERO;
    let mut from_edge_group = true;

    // Group 1: the polygon's rotated edge normals.
    for norm in &mesh.normals {
        let rnorm = norm.rotate(poly.cos_theta, poly.sin_theta);
        let (_, max_poly) = poly.project_onto_axis(rnorm);
        let center = circle.position.dot(rnorm);
        let min_circle = center - radius;

        let overlap = max_poly - min_circle;
        if overlap <= 0.0 {
            return CollisionResult::default();
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            normal = rnorm;
            from_edge_group = true;
        }
    }

    // Group 2: axes from each vertex toward the circle center, which catch
    // corner contacts the edge normals miss.
    for tp in &poly.transformed {
        let axis = (*tp - circle.position).normalized();
        let (min_poly, _) = poly.project_onto_axis(axis);
        let center = circle.position.dot(axis);
        let max_circle = center + radius;

        let overlap = max_circle - min_poly;
        if overlap <= 0.0 {
            return CollisionResult::default();
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            normal = axis;
            from_edge_group = false;
        }
    }

    // Edge-group axes point out of the polygon, vertex-group axes toward
    // it; the contact sits on the circle rim either way.
    let contact = if from_edge_group {
        circle.position - normal * radius
    } else {
        circle.position + normal * radius
    };

    CollisionResult {
        count: 1,
        normal,
        depth: min_overlap,
        contacts: [contact, Vec2::ZERO],
    }
}

// ============================================================================
// Polygon / Polygon
// ============================================================================

/// Clip a segment (or what remains of one) against the half-space
/// `n . x >= c`, Sutherland-Hodgman style: keep inside endpoints, emit the
/// crossing point at `t = dA / (dA - dB)` when the signs differ.
fn clip_halfspace(points: &mut Vec<Vec2>, n: Vec2, c: f32) {
    if points.len() < 2 {
        points.retain(|p| p.dot(n) - c >= 0.0);
        return;
    }

    let a = points[0];
    let b = points[1];
    let da = a.dot(n) - c;
    let db = b.dot(n) - c;

    points.clear();
    if da >= 0.0 {
        points.push(a);
    }
    if da * db < 0.0 {
        let t = da / (da - db);
        points.push(a + (b - a) * t);
    }
    if db >= 0.0 {
        points.push(b);
    }
}

fn polygon_polygon(a: &Body, b: &Body, registry: &MeshRegistry) -> CollisionResult {
    let (Shape::Polygon(mesh_a), Shape::Polygon(mesh_b)) = (a.shape, b.shape) else {
        return CollisionResult::default();
    };
    let (Some(mesh_a), Some(mesh_b)) = (registry.get(mesh_a), registry.get(mesh_b)) else {
        return CollisionResult::default();
    };

    let n_a = a.transformed.len();
    let n_b = b.transformed.len();

    let mut min_overlap = f32::INFINITY;
    let mut normal = Vec2::ZERO;
    let mut reference_is_a = true;
    let mut rid = 0;

    // Pass 1: A's rotated edge normals, overlap measured as max(A) - min(B).
    for (id, norm) in mesh_a.normals.iter().enumerate() {
        let rnorm = norm.rotate(a.cos_theta, a.sin_theta);
        let (_, max1) = a.project_onto_axis(rnorm);
        let (min2, _) = b.project_onto_axis(rnorm);

        let overlap = max1 - min2;
        if overlap <= 0.0 {
            return CollisionResult::default();
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            normal = rnorm;
            rid = id;
            reference_is_a = true;
        }
    }

    // Pass 2: B's rotated edge normals, overlap measured as max(B) - min(A).
    for (id, norm) in mesh_b.normals.iter().enumerate() {
        let rnorm = norm.rotate(b.cos_theta, b.sin_theta);
        let (min1, _) = a.project_onto_axis(rnorm);
        let (_, max2) = b.project_onto_axis(rnorm);

        let overlap = max2 - min1;
        if overlap <= 0.0 {
            return CollisionResult::default();
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            normal = rnorm;
            rid = id;
            reference_is_a = false;
        }
    }

    // Reference edge on the axis owner; incident edge is the other body's
    // edge whose rotated normal most opposes the chosen axis.
    let (r1, r2, i1, i2) = if reference_is_a {
        let r1 = a.transformed[rid];
        let r2 = a.transformed[(rid + 1) % n_a];

        let mut most_opposed = f32::INFINITY;
        let mut iid = 0;
        for (i, norm) in mesh_b.normals.iter().enumerate() {
            let rnorm = norm.rotate(b.cos_theta, b.sin_theta);
            let dot = normal.dot(rnorm);
            if dot < most_opposed {
                most_opposed = dot;
                iid = i;
            }
        }
        (r1, r2, b.transformed[iid], b.transformed[(iid + 1) % n_b])
    } else {
        let r1 = b.transformed[rid];
        let r2 = b.transformed[(rid + 1) % n_b];

        let mut most_opposed = f32::INFINITY;
        let mut iid = 0;
        for (i, norm) in mesh_a.normals.iter().enumerate() {
            let rnorm = norm.rotate(a.cos_theta, a.sin_theta);
            let dot = normal.dot(rnorm);
            if dot < most_opposed {
                most_opposed = dot;
                iid = i;
            }
        }
        (r1, r2, a.transformed[iid], a.transformed[(iid + 1) % n_a])
    };

    // Clip the incident segment between the side planes through the
    // reference edge endpoints.
    let tangent = Vec2::new(-normal.y, normal.x);
    let mut points = vec![i1, i2];
    clip_halfspace(&mut points, tangent, tangent.dot(r1));
    clip_halfspace(&mut points, -tangent, -tangent.dot(r2));

    // Keep only points actually behind the reference face.
    let reference_dot = r1.dot(normal);
    let mut res = CollisionResult {
        count: 0,
        normal,
        depth: min_overlap,
        contacts: [Vec2::ZERO; 2],
    };
    for p in points {
        if reference_dot - p.dot(normal) > 0.0 {
            res.contacts[res.count] = p;
            res.count += 1;
        }
    }
    res
}

// ============================================================================
// Tests
// ============================================================================
