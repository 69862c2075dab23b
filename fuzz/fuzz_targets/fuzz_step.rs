#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

use impulse2d::{Engine, MeshRegistry, Vec2, World, WorldConfig, CIRCLE_MESH_ID};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    /// Number of bodies to add (capped)
    body_count: u8,
    /// Position components (u16 keeps most bodies inside the grid; escapes
    /// exercise the out-of-bounds deletion path)
    positions: Vec<(u16, u16)>,
    /// Velocity components
    velocities: Vec<(i8, i8)>,
    /// Mass numerator (> 0 enforced below)
    masses: Vec<u8>,
    /// Use the square mesh instead of a circle, per body
    square: Vec<bool>,
    /// Number of simulation steps (capped)
    step_count: u8,
}

// Fuzz the full pipeline: add random bodies and step on one worker.
// Must never panic regardless of input.
fuzz_target!(|input: FuzzInput| {
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

    let body_count = (input.body_count as usize).min(16);
    for i in 0..body_count {
        let (px, py) = input.positions.get(i).copied().unwrap_or((512, 512));
        let (vx, vy) = input.velocities.get(i).copied().unwrap_or((0, 0));
        let mass = input.masses.get(i).copied().unwrap_or(1).max(1) as f32;
        let mesh_id = if input.square.get(i).copied().unwrap_or(false) {
            square
        } else {
            CIRCLE_MESH_ID
        };

        let _ = world.add_body(
            Vec2::new(px as f32 % 1100.0, py as f32 % 1100.0),
            Vec2::new(vx as f32, vy as f32),
            mesh_id,
            mass,
            mass * 50.0,
            1.0,
            0.0,
            0.5,
        );
    }

    let mut engine = Engine::new(1, world);
    let steps = (input.step_count as usize).min(32);
    for _ in 0..steps {
        engine.world_mut().reset_forces(Vec2::new(0.0, 20.0));
        engine.step(1.0 / 60.0);
    }
});
