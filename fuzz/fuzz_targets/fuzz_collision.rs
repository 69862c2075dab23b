#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

use impulse2d::{Engine, MeshRegistry, Vec2, World, WorldConfig, CIRCLE_MESH_ID};

#[derive(Debug, Arbitrary)]
struct CollisionInput {
    /// Two bodies' positions (i8 offsets from a shared center, so overlap
    /// and containment are common)
    x1: i8,
    y1: i8,
    x2: i8,
    y2: i8,
    /// Rotation angles in 1/16 radian increments
    a1: i8,
    a2: i8,
    /// Shape selectors
    square1: bool,
    square2: bool,
    /// Steps to run
    steps: u8,
}

// Fuzz collision detection and resolution by placing two bodies close
// together, including fully overlapping and coincident configurations.
// Must never panic.
fuzz_target!(|input: CollisionInput| {
    let mut registry = MeshRegistry::new();
    let square = registry
        .register(&[
            Vec2::new(-10.0, -10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(-10.0, 10.0),
        ])
        .unwrap();
    let mut world = World::new(WorldConfig::new(1024.0, 1024.0), Arc::new(registry));

    let mesh = |is_square: bool| if is_square { square } else { CIRCLE_MESH_ID };
    world
        .add_body(
            Vec2::new(512.0 + input.x1 as f32 * 0.25, 512.0 + input.y1 as f32 * 0.25),
            Vec2::ZERO,
            mesh(input.square1),
            1.0,
            50.0,
            1.0,
            input.a1 as f32 / 16.0,
            0.5,
        )
        .unwrap();
    world
        .add_body(
            Vec2::new(512.0 + input.x2 as f32 * 0.25, 512.0 + input.y2 as f32 * 0.25),
            Vec2::ZERO,
            mesh(input.square2),
            1.0,
            50.0,
            1.0,
            input.a2 as f32 / 16.0,
            0.5,
        )
        .unwrap();

    let mut engine = Engine::new(1, world);
    let steps = (input.steps as usize).min(64);
    for _ in 0..steps {
        engine.world_mut().reset_forces(Vec2::ZERO);
        engine.step(1.0 / 60.0);
    }

    // Invariants that must hold for every reported collision
    let world = engine.world();
    for (i, res) in world.collision_results().iter().enumerate() {
        if !res.is_colliding() {
            continue;
        }
        let (ia, ib) = world.collision_pairs()[i];
        let a = world.body(ia).unwrap();
        let b = world.body(ib).unwrap();
        assert!((b.position - a.position).dot(res.normal) >= 0.0);
        assert!(res.depth >= 0.0);
    }
});
