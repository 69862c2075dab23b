//! Impulse-Based Contact Resolution
//!
//! One collision is resolved as: a single positional-correction
//! contribution (Baumgarte-style, accumulated per body and flushed once per
//! step so multiple contacts compose without order-dependent overshoot),
//! then a normal + Coulomb-friction impulse per contact point. Contacts are
//! processed in array order; the second contact of a manifold sees the
//! velocities already updated by the first (sequential impulses).
//!
//! The friction clamp is deliberately two-coefficient: a tangent impulse
//! within the static cone is kept as computed, while one that exceeds it is
//! replaced by the kinetic magnitude (`j * muk`), not clamped to the static
//! bound.

use crate::body::Body;
use crate::collision::CollisionResult;

/// Default positional-correction feedback factor.
pub const CORRECTION_FACTOR: f32 = 0.40;

/// Default penetration tolerance below which no correction is applied.
pub const PENETRATION_SLOP: f32 = 0.05;

/// Apply positional correction and per-contact impulses for one collision.
///
/// `res.normal` must point from `a` toward `b`. At least one body must be
/// dynamic (the broadphase suppresses static/static pairs), so the inverse
/// mass sum is nonzero.
pub fn resolve(a: &mut Body, b: &mut Body, res: &CollisionResult, corr_factor: f32, slop: f32) {
    let corr =
        res.normal * (corr_factor * (res.depth - slop).max(0.0) / (a.inv_mass + b.inv_mass));
    a.correction -= corr * a.inv_mass;
    b.correction += corr * b.inv_mass;

    for contact in res.contacts.iter().take(res.count) {
        let r1 = *contact - a.position;
        let r2 = *contact - b.position;

        // Contact-point velocities include the rotational term.
        let v1 = a.velocity + r1.perp() * a.omega;
        let v2 = b.velocity + r2.perp() * b.omega;

        let rel_vel = v2 - v1;
        let vel_normal = rel_vel.dot(res.normal);
        if vel_normal >= 0.0 {
            // Already separating at this contact.
            continue;
        }

        let e = a.restitution.min(b.restitution);
        let c1 = r1.cross(res.normal);
        let c2 = r2.cross(res.normal);
        let j = -(1.0 + e) * vel_normal
            / (a.inv_mass + b.inv_mass + a.inv_moi * c1 * c1 + b.inv_moi * c2 * c2);
        let mut impulse = res.normal * j;

        let mus = (a.s_friction * b.s_friction).sqrt();
        let muk = (a.k_friction * b.k_friction).sqrt();
        let f_static = j * mus;
        let f_kinetic = j * muk;

        let tangent = res.normal.perp();
        let vel_tangent = rel_vel.dot(tangent);
        let t1 = r1.cross(tangent);
        let t2 = r2.cross(tangent);
        let mut jt = -vel_tangent
            / (a.inv_mass + b.inv_mass + a.inv_moi * t1 * t1 + b.inv_moi * t2 * t2);

        if jt > f_static {
            jt = f_kinetic;
        } else if jt < -f_static {
            jt = -f_kinetic;
        }

        impulse += tangent * jt;

        a.velocity -= impulse * a.inv_mass;
        b.velocity += impulse * b.inv_mass;
        a.omega -= a.inv_moi * r1.cross(impulse);
        b.omega += b.inv_moi * r2.cross(impulse);
    }
}

// ============================================================================
// Tests
// ============================================================================
