//! Headless driver: a box of walls, a pile of falling shapes, and per-phase
//! timing output every 60 frames.
//!
//! Run with: `cargo run --release --example falling_bodies`

use std::sync::Arc;

use impulse2d::{
    Engine, MeshRegistry, StepProfiler, Vec2, World, WorldConfig, CIRCLE_MESH_ID, PHASE_BROADPHASE,
    PHASE_INTEGRATION, PHASE_NARROWPHASE, PHASE_TOTAL,
};

const WIDTH: f32 = 1200.0;
const HEIGHT: f32 = 800.0;
const DT: f32 = 0.016;

fn main() {
    let mut registry = MeshRegistry::new();
    let square = registry
        .register(&[
            Vec2::new(-10.0, -10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(-10.0, 10.0),
        ])
        .unwrap();
    let triangle = registry
        .register(&[Vec2::new(0.0, -10.0), Vec2::new(10.0, 10.0), Vec2::new(-10.0, 10.0)])
        .unwrap();
    let floor = registry
        .register(&[
            Vec2::new(-(WIDTH - 100.0) / 2.0, -20.0),
            Vec2::new((WIDTH - 100.0) / 2.0, -20.0),
            Vec2::new((WIDTH - 100.0) / 2.0, 20.0),
            Vec2::new(-(WIDTH - 100.0) / 2.0, 20.0),
        ])
        .unwrap();
    let wall = registry
        .register(&[
            Vec2::new(-20.0, -(HEIGHT - 100.0) / 2.0),
            Vec2::new(20.0, -(HEIGHT - 100.0) / 2.0),
            Vec2::new(20.0, (HEIGHT - 100.0) / 2.0),
            Vec2::new(-20.0, (HEIGHT - 100.0) / 2.0),
        ])
        .unwrap();

    let config = WorldConfig::new(WIDTH, HEIGHT);
    let gravity = config.gravity;
    let mut world = World::new(config, Arc::new(registry));

    // Static box: floor and two walls.
    world
        .add_static_body(Vec2::new(WIDTH / 2.0, HEIGHT - 105.0), floor, 1.0, 0.0, 0.2)
        .unwrap();
    world
        .add_static_body(Vec2::new(105.0, HEIGHT / 2.0), wall, 1.0, 0.0, 0.2)
        .unwrap();
    world
        .add_static_body(Vec2::new(WIDTH - 105.0, HEIGHT / 2.0), wall, 1.0, 0.0, 0.2)
        .unwrap();

    // A mixed rain of shapes, mass scaled by area.
    for i in 0..300 {
        let x = 180.0 + (i % 20) as f32 * 44.0;
        let y = 120.0 + (i / 20) as f32 * 30.0;
        let mesh_id = match i % 3 {
            0 => CIRCLE_MESH_ID,
            1 => square,
            _ => triangle,
        };
        let r = 10.0f32;
        let mass = r * r;
        let moi = mass * r * r;
        world
            .add_body(Vec2::new(x, y), Vec2::ZERO, mesh_id, mass, moi, 1.0, 0.0, 0.4)
            .unwrap();
    }

    let mut engine = Engine::new(8, world);
    let mut profiler = StepProfiler::new();

    for frame in 1..=600u32 {
        engine.world_mut().reset_forces(gravity);
        let timings = engine.step(DT);
        profiler.record_step(&timings);

        if frame % 60 == 0 {
            let world = engine.world();
            println!(
                "frame {frame:4}  active {:4}  pairs {:5}  collisions {:4}  \
                 update {:8.2} us  collision {:8.2} us  resolve {:8.2} us  total {:8.2} us",
                world.active_count(),
                world.collision_pairs().len(),
                world.collision_count(),
                profiler.average_us(PHASE_INTEGRATION),
                profiler.average_us(PHASE_BROADPHASE),
                profiler.average_us(PHASE_NARROWPHASE),
                profiler.average_us(PHASE_TOTAL),
            );
            profiler.reset();
        }
    }
}
