//! Convex Polygon Meshes and the Mesh Registry
//!
//! A [`Mesh`] is an immutable convex polygon: vertices in counter-clockwise
//! order, recentred so their mean is the origin, with a parallel table of
//! outward unit edge normals. Meshes are registered once in a
//! [`MeshRegistry`] and referenced by id for the lifetime of the process;
//! the registry is shared immutably (`Arc`) between worlds and the
//! narrowphase.
//!
//! The reserved id [`CIRCLE_MESH_ID`] denotes a circle of radius
//! [`CIRCLE_RADIUS`] (scaled per body); internally shapes are carried as the
//! explicit [`Shape`] variant so dispatch never touches the sentinel value.

use crate::error::PhysicsError;
use crate::math::Vec2;

/// Reserved mesh id denoting a circle.
pub const CIRCLE_MESH_ID: usize = 1000;

/// Base circle radius in world units, scaled by each body's `scale`.
pub const CIRCLE_RADIUS: f32 = 10.0;

// ============================================================================
// Shape
// ============================================================================

/// Collision shape of a body.
///
/// Replaces the raw "mesh id 1000 means circle" convention with an explicit
/// tagged union; [`Shape::from_mesh_id`] accepts the sentinel at the API
/// boundary and [`Shape::mesh_id`] maps back for introspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// Circle of radius `CIRCLE_RADIUS * scale`.
    Circle,
    /// Convex polygon, referencing a registered mesh by id.
    Polygon(usize),
}

impl Shape {
    /// Resolve a public mesh id against the registry.
    pub fn from_mesh_id(id: usize, registry: &MeshRegistry) -> Result<Self, PhysicsError> {
        if id == CIRCLE_MESH_ID {
            Ok(Shape::Circle)
        } else if registry.get(id).is_some() {
            Ok(Shape::Polygon(id))
        } else {
            Err(PhysicsError::MeshNotFound { id })
        }
    }

    /// The public mesh id of this shape.
    #[inline]
    #[must_use]
    pub fn mesh_id(&self) -> usize {
        match self {
            Shape::Circle => CIRCLE_MESH_ID,
            Shape::Polygon(id) => *id,
        }
    }

    /// Whether this shape is the circle variant.
    #[inline]
    #[must_use]
    pub fn is_circle(&self) -> bool {
        matches!(self, Shape::Circle)
    }
}

// ============================================================================
// Mesh
// ============================================================================

/// Immutable convex polygon: CCW vertices centred on their mean, plus
/// outward unit edge normals (`normals[i]` belongs to the edge from
/// `points[i]` to `points[(i + 1) % n]`).
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertices in counter-clockwise order, mean at the origin.
    pub points: Vec<Vec2>,
    /// Outward unit normal per edge.
    pub normals: Vec<Vec2>,
}

impl Mesh {
    fn from_validated_points(points: Vec<Vec2>) -> Self {
        let n = points.len();
        let mut normals = Vec::with_capacity(n);
        for i in 0..n {
            let edge = points[(i + 1) % n] - points[i];
            normals.push(Vec2::new(edge.y, -edge.x).normalized());
        }
        Self { points, normals }
    }

    /// Number of vertices (== number of edges).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a registered mesh; kept for API symmetry.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ============================================================================
// MeshRegistry
// ============================================================================

/// Table of registered meshes, indexed by small integer id.
///
/// Build the registry up front, then share it immutably
/// (`Arc<MeshRegistry>`) with every world. Ids are dense and stable; the
/// table refuses to grow into the reserved circle id.
#[derive(Debug, Default)]
pub struct MeshRegistry {
    meshes: Vec<Mesh>,
}

impl MeshRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { meshes: Vec::new() }
    }

    /// Register a convex CCW polygon. Returns its mesh id.
    ///
    /// The vertices are recentred so their mean sits at the origin before
    /// normals are computed. Rejected inputs: fewer than three vertices,
    /// clockwise winding, non-convex or degenerate chains (repeated or
    /// collinear vertices), and a full table (the next id would collide
    /// with [`CIRCLE_MESH_ID`]).
    pub fn register(&mut self, points: &[Vec2]) -> Result<usize, PhysicsError> {
        if points.len() < 3 {
            return Err(PhysicsError::InvalidMesh {
                reason: "polygon needs at least 3 vertices",
            });
        }
        if self.meshes.len() >= CIRCLE_MESH_ID {
            return Err(PhysicsError::CapacityExceeded {
                resource: "mesh table",
                limit: CIRCLE_MESH_ID,
            });
        }

        let mut sum = Vec2::ZERO;
        for p in points {
            sum += *p;
        }
        let centroid = sum / points.len() as f32;
        let centred: Vec<Vec2> = points.iter().map(|p| *p - centroid).collect();

        // Strict convexity in CCW order: every consecutive edge pair turns
        // left. This also rejects clockwise winding and zero-length edges.
        let n = centred.len();
        for i in 0..n {
            let e0 = centred[(i + 1) % n] - centred[i];
            let e1 = centred[(i + 2) % n] - centred[(i + 1) % n];
            if e0.cross(e1) <= 0.0 {
                return Err(PhysicsError::InvalidMesh {
                    reason: "vertices must form a strictly convex counter-clockwise polygon",
                });
            }
        }

        let id = self.meshes.len();
        self.meshes.push(Mesh::from_validated_points(centred));
        Ok(id)
    }

    /// Look up a mesh by id. The circle sentinel has no mesh entry.
    #[inline]
    #[must_use]
    pub fn get(&self, id: usize) -> Option<&Mesh> {
        self.meshes.get(id)
    }

    /// Number of registered meshes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether no meshes are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn square(half: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(-half, -half),
            Vec2::new(half, -half),
            Vec2::new(half, half),
            Vec2::new(-half, half),
        ]
    }

    #[test]
    fn test_register_recentres_vertices() {
        let mut reg = MeshRegistry::new();
        // Same square, but offset away from the origin
        let offset: Vec<Vec2> = square(10.0)
            .iter()
            .map(|p| *p + Vec2::new(30.0, -7.0))
            .collect();
        let id = reg.register(&offset).unwrap();

        let mesh = reg.get(id).unwrap();
        let mut sum = Vec2::ZERO;
        for p in &mesh.points {
            sum += *p;
        }
        assert!(sum.length() < 1e-4, "vertex mean should be the origin");
    }

    #[test]
    fn test_normals_are_unit_and_outward() {
        let mut reg = MeshRegistry::new();
        let id = reg.register(&square(10.0)).unwrap();
        let mesh = reg.get(id).unwrap();

        assert_eq!(mesh.normals.len(), 4);
        for (i, n) in mesh.normals.iter().enumerate() {
            assert!((n.length() - 1.0).abs() < 1e-5, "normal {i} not unit");
            // Outward: the normal points away from the centre, so its dot
            // with the edge midpoint is positive.
            let mid = (mesh.points[i] + mesh.points[(i + 1) % 4]) * 0.5;
            assert!(n.dot(mid) > 0.0, "normal {i} points inward");
        }
    }

    #[test]
    fn test_register_rejects_too_few_vertices() {
        let mut reg = MeshRegistry::new();
        let err = reg
            .register(&[Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)])
            .unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidMesh { .. }));
    }

    #[test]
    fn test_register_rejects_clockwise_winding() {
        let mut reg = MeshRegistry::new();
        let mut cw = square(10.0);
        cw.reverse();
        assert!(reg.register(&cw).is_err());
    }

    #[test]
    fn test_register_rejects_non_convex() {
        let mut reg = MeshRegistry::new();
        // Arrow head: the notch vertex makes a right turn
        let concave = vec![
            Vec2::new(-10.0, -10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(-10.0, 10.0),
        ];
        assert!(reg.register(&concave).is_err());
    }

    #[test]
    fn test_register_rejects_repeated_vertex() {
        let mut reg = MeshRegistry::new();
        let degenerate = vec![
            Vec2::new(-10.0, -10.0),
            Vec2::new(-10.0, -10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(0.0, 10.0),
        ];
        assert!(reg.register(&degenerate).is_err());
    }

    #[test]
    fn test_shape_from_mesh_id() {
        let mut reg = MeshRegistry::new();
        let id = reg.register(&square(10.0)).unwrap();

        assert_eq!(
            Shape::from_mesh_id(CIRCLE_MESH_ID, &reg).unwrap(),
            Shape::Circle
        );
        assert_eq!(
            Shape::from_mesh_id(id, &reg).unwrap(),
            Shape::Polygon(id)
        );
        assert!(matches!(
            Shape::from_mesh_id(99, &reg),
            Err(PhysicsError::MeshNotFound { id: 99 })
        ));
    }

    #[test]
    fn test_shape_mesh_id_roundtrip() {
        assert_eq!(Shape::Circle.mesh_id(), CIRCLE_MESH_ID);
        assert_eq!(Shape::Polygon(3).mesh_id(), 3);
        assert!(Shape::Circle.is_circle());
        assert!(!Shape::Polygon(0).is_circle());
    }

    #[test]
    fn test_registry_ids_are_dense() {
        let mut reg = MeshRegistry::new();
        let a = reg.register(&square(5.0)).unwrap();
        let b = reg.register(&square(20.0)).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(reg.len(), 2);
        assert!(!reg.is_empty());
    }
}
