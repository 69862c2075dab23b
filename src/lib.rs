//! impulse2d: Parallel Impulse-Based 2D Rigid-Body Physics Engine
//!
//! A real-time 2D physics core for many hundreds to thousands of convex
//! polygons and circles: a hierarchical quad-grid broadphase, a SAT
//! narrowphase with incident-edge clipping, a single-pass impulse resolver
//! with Coulomb friction and Baumgarte-style positional correction, and a
//! barrier-synchronized worker pool driving the two parallel phases of each
//! step.
//!
//! # Features
//!
//! - **Hierarchical broadphase**: multi-resolution uniform grids that pick a
//!   level per body from its AABB, so neighbor queries stay O(k) however
//!   disparate body sizes are
//! - **Contact manifolds**: Sutherland-Hodgman incident-edge clipping
//!   producing up to two contact points per polygon pair
//! - **Impulse resolution**: normal + friction impulses with a
//!   static/kinetic switch, plus a separate positional-correction
//!   accumulator flushed once per step
//! - **Fixed worker pool**: two barriers per phase, private per-worker
//!   buffers, index-partitioned outputs — no locks inside a phase
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use impulse2d::{Engine, MeshRegistry, Vec2, World, WorldConfig, CIRCLE_MESH_ID};
//!
//! // Register meshes up front; the registry is immutable afterwards.
//! let mut registry = MeshRegistry::new();
//! let square = registry
//!     .register(&[
//!         Vec2::new(-10.0, -10.0),
//!         Vec2::new(10.0, -10.0),
//!         Vec2::new(10.0, 10.0),
//!         Vec2::new(-10.0, 10.0),
//!     ])
//!     .unwrap();
//!
//! let config = WorldConfig::new(1200.0, 800.0);
//! let gravity = config.gravity;
//! let mut world = World::new(config, Arc::new(registry));
//!
//! // A static floor and a falling circle.
//! world
//!     .add_static_body(Vec2::new(600.0, 700.0), square, 1.0, 0.0, 0.2)
//!     .unwrap();
//! world
//!     .add_body(Vec2::new(600.0, 100.0), Vec2::ZERO, CIRCLE_MESH_ID, 100.0, 10_000.0, 1.0, 0.0, 0.7)
//!     .unwrap();
//!
//! // The engine owns the world and the worker pool.
//! let mut engine = Engine::new(4, world);
//! for _ in 0..60 {
//!     engine.world_mut().reset_forces(gravity);
//!     let timings = engine.step(0.016);
//!     let _ = timings.total_us();
//! }
//! ```
//!
//! # Modules
//!
//! - [`math`]: `Vec2` and `Aabb` primitives
//! - [`mesh`]: convex mesh validation and the process-wide registry
//! - [`quadgrid`]: the multi-level broadphase grid
//! - [`body`]: rigid-body state and per-body geometry
//! - [`collision`]: SAT narrowphase and manifold generation
//! - [`resolver`]: impulse + positional-correction resolution
//! - [`world`]: body arena, grid rebuild, integration, neighbor gathering
//! - [`engine`]: the barrier-synchronized parallel step pipeline
//! - [`profiling`]: per-phase timing statistics
//! - [`error`]: the unified error type
//!
//! # Threading
//!
//! Pair ordering (and therefore sequential-impulse order) depends on how
//! gather results interleave across workers, so multi-threaded runs are not
//! reproducible run-to-run. Construct the engine with one worker when
//! bit-identical replays matter; the pipeline is identical, just serial.

#![warn(missing_docs)]

pub mod body;
pub mod collision;
pub mod engine;
pub mod error;
pub mod math;
pub mod mesh;
pub mod profiling;
pub mod quadgrid;
pub mod resolver;
pub mod world;

// Re-export commonly used types
pub use body::{Body, BodyState, DEFAULT_KINETIC_FRICTION, DEFAULT_STATIC_FRICTION};
pub use collision::{perform_sat, CollisionResult};
pub use engine::Engine;
pub use error::PhysicsError;
pub use math::{Aabb, Vec2};
pub use mesh::{Mesh, MeshRegistry, Shape, CIRCLE_MESH_ID, CIRCLE_RADIUS};
pub use profiling::{
    ProfileEntry, StepProfiler, StepTimings, PHASE_BROADPHASE, PHASE_INTEGRATION,
    PHASE_NARROWPHASE, PHASE_TOTAL,
};
pub use quadgrid::{QuadGrid, MAX_CELLS, MIN_CELL_SIZE};
pub use resolver::{resolve, CORRECTION_FACTOR, PENETRATION_SLOP};
pub use world::{World, WorldConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::body::{Body, BodyState};
    pub use crate::collision::{perform_sat, CollisionResult};
    pub use crate::engine::Engine;
    pub use crate::error::PhysicsError;
    pub use crate::math::{Aabb, Vec2};
    pub use crate::mesh::{Mesh, MeshRegistry, Shape, CIRCLE_MESH_ID, CIRCLE_RADIUS};
    pub use crate::profiling::{StepProfiler, StepTimings};
    pub use crate::quadgrid::QuadGrid;
    pub use crate::resolver::{CORRECTION_FACTOR, PENETRATION_SLOP};
    pub use crate::world::{World, WorldConfig};
}
