//! Parallel Step Pipeline
//!
//! [`Engine`] owns the [`World`] and a fixed pool of worker threads. Each
//! simulation step runs two parallel phases — broadphase neighbor gathering
//! and narrowphase SAT — fenced by a pair of reusable barriers with arrival
//! count `workers + 1`:
//!
//! 1. serial: integrate velocities/positions, rebuild the grid
//! 2. parallel: per-body neighbor gathering into private per-worker buffers
//! 3. serial: concatenate the buffers into the candidate-pair list
//! 4. parallel: SAT per pair, each task writing its own result slot
//! 5. serial: resolve impulses, flush corrections, reset the grid
//!
//! There is no work stealing and no locking inside a phase: task queues and
//! gather buffers are private to one worker, and narrowphase outputs are
//! partitioned by index (task i writes `collision_data[i]`), so writes never
//! alias. Everything shared crosses the pool behind [`UnsafeCell`]; the
//! invariant backing every access is the barrier window — workers touch
//! shared state only between `start` and `finish`, the driver only outside
//! it.
//!
//! A step is atomic from the outside: the only suspension points are the two
//! barriers per phase, and partial progress is never observable. With one
//! worker the pair order is deterministic, which single-threaded
//! reproducibility tests rely on.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::{Arc, Barrier};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::collision::{perform_sat, CollisionResult};
use crate::profiling::StepTimings;
use crate::world::World;

// ============================================================================
// Tasks and shared pool state
// ============================================================================

#[derive(Clone, Copy, Debug)]
enum Task {
    /// Gather candidate pairs for one body into the worker's buffer.
    Gather { body: usize },
    /// Run SAT for pair `slot` and write `collision_data[slot]`.
    Sat { slot: usize, a: usize, b: usize },
}

/// One worker's private queue and output buffer.
struct WorkerSlot {
    tasks: UnsafeCell<Vec<Task>>,
    results: UnsafeCell<Vec<(usize, usize)>>,
}

// SAFETY: a slot is written by the driver only while its worker is parked at
// the start barrier, and by its worker only inside the barrier window. No
// two threads ever access it at the same time.
unsafe impl Sync for WorkerSlot {}

struct Shared {
    world: UnsafeCell<World>,
    slots: Vec<WorkerSlot>,
    start: Barrier,
    finish: Barrier,
    stop: AtomicBool,
    /// Base of `collision_data` for the current narrowphase, republished by
    /// the driver before each SAT phase.
    sat_out: AtomicPtr<CollisionResult>,
}

// SAFETY: the world is read-shared inside the barrier window and exclusively
// owned by the driver outside it; the barriers order every access.
unsafe impl Sync for Shared {}

fn worker_loop(shared: &Shared, index: usize) {
    loop {
        shared.start.wait();
        if shared.stop.load(Ordering::Acquire) {
            shared.finish.wait();
            break;
        }

        // SAFETY: between the barriers the driver does not touch the world
        // or this worker's slot; the world is only read here.
        let world = unsafe { &*shared.world.get() };
        let slot = &shared.slots[index];
        let tasks = unsafe { &*slot.tasks.get() };
        let results = unsafe { &mut *slot.results.get() };
        results.clear();

        for task in tasks {
            match *task {
                Task::Gather { body } => world.gather_neighbors_into(body, results),
                Task::Sat { slot: out, a, b } => {
                    let res =
                        perform_sat(&world.bodies[a], &world.bodies[b], world.mesh_registry());
                    let base = shared.sat_out.load(Ordering::Relaxed);
                    // SAFETY: `base` was sized for every pair before this
                    // phase opened, and slots are assigned round-robin so no
                    // two tasks share an index.
                    unsafe { base.add(out).write(res) };
                }
            }
        }

        shared.finish.wait();
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Parallel simulation driver: owns the world and the worker pool.
///
/// Drivers reset forces (gravity) and apply any external forces through
/// [`Engine::world_mut`] between steps, then call [`Engine::step`].
pub struct Engine {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    thread_count: usize,
}

impl Engine {
    /// Take ownership of `world` and spawn `thread_count` workers
    /// (at least one).
    #[must_use]
    pub fn new(thread_count: usize, world: World) -> Self {
        let n = thread_count.max(1);
        let shared = Arc::new(Shared {
            world: UnsafeCell::new(world),
            slots: (0..n)
                .map(|_| WorkerSlot {
                    tasks: UnsafeCell::new(Vec::new()),
                    results: UnsafeCell::new(Vec::new()),
                })
                .collect(),
            start: Barrier::new(n + 1),
            finish: Barrier::new(n + 1),
            stop: AtomicBool::new(false),
            sat_out: AtomicPtr::new(std::ptr::null_mut()),
        });

        let workers = (0..n)
            .map(|i| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || worker_loop(&shared, i))
            })
            .collect();

        Self {
            shared,
            workers,
            thread_count: n,
        }
    }

    /// Number of pool workers.
    #[inline]
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Shared view of the world. Workers are parked outside [`Engine::step`],
    /// so the driver thread has it to itself.
    #[inline]
    #[must_use]
    pub fn world(&self) -> &World {
        // SAFETY: workers only access the world inside the step barrier
        // window; outside step() this thread is the only accessor.
        unsafe { &*self.shared.world.get() }
    }

    /// Exclusive view of the world for body management and force input.
    #[inline]
    #[must_use]
    pub fn world_mut(&mut self) -> &mut World {
        // SAFETY: as in `world`, plus `&mut self` excludes step().
        unsafe { &mut *self.shared.world.get() }
    }

    /// Advance the simulation by `dt`, returning per-phase wall times.
    ///
    /// # Safety discipline
    ///
    /// Every dereference of the world pointer below happens while the pool
    /// is parked at the start barrier; during the two `run_phase` windows
    /// the driver holds no reference at all, and workers treat the world as
    /// read-only (narrowphase output goes through `sat_out`, which was
    /// sized and published before the phase opened).
    pub fn step(&mut self, dt: f32) -> StepTimings {
        let world_ptr = self.shared.world.get();

        let t0 = Instant::now();
        unsafe {
            let world = &mut *world_ptr;
            world.update_velocities(dt);
            world.update_positions(dt);
            world.init_grid();
        }
        let t1 = Instant::now();

        // Broadphase: one gather task per live body, round-robin.
        self.clear_slots();
        unsafe {
            let world = &*world_ptr;
            let mut cursor = 0usize;
            for id in 0..world.allocated() {
                if !world.bodies[id].is_free() {
                    (*self.shared.slots[cursor % self.thread_count].tasks.get())
                        .push(Task::Gather { body: id });
                    cursor += 1;
                }
            }
        }
        self.run_phase();
        unsafe {
            let world = &mut *world_ptr;
            world.collision_pairs.clear();
            for slot in &self.shared.slots {
                world.collision_pairs.extend_from_slice(&*slot.results.get());
            }
        }
        let t2 = Instant::now();

        // Narrowphase: one SAT task per pair; the task index doubles as the
        // output slot, so worker writes are disjoint by construction.
        self.clear_slots();
        unsafe {
            let world = &mut *world_ptr;
            let pair_count = world.collision_pairs.len();
            world.collision_data.clear();
            world
                .collision_data
                .resize(pair_count, CollisionResult::default());
            self.shared
                .sat_out
                .store(world.collision_data.as_mut_ptr(), Ordering::Release);

            for i in 0..pair_count {
                let (a, b) = world.collision_pairs[i];
                (*self.shared.slots[i % self.thread_count].tasks.get())
                    .push(Task::Sat { slot: i, a, b });
            }
        }
        self.run_phase();
        unsafe {
            let world = &mut *world_ptr;
            world.resolve_collisions();
            world.apply_corrections();
            world.reset_grid();
        }
        let t3 = Instant::now();

        StepTimings {
            integration_us: micros(t1 - t0),
            broadphase_us: micros(t2 - t1),
            narrowphase_us: micros(t3 - t2),
        }
    }

    /// Release the pool for one phase and wait for completion.
    fn run_phase(&self) {
        self.shared.start.wait();
        self.shared.finish.wait();
    }

    fn clear_slots(&self) {
        for slot in &self.shared.slots {
            // SAFETY: workers are parked at the start barrier.
            unsafe {
                (*slot.tasks.get()).clear();
                (*slot.results.get()).clear();
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Wake the pool one last time so every worker observes the flag,
        // pair its finish arrival, then join.
        self.shared.stop.store(true, Ordering::Release);
        self.shared.start.wait();
        self.shared.finish.wait();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

#[inline]
fn micros(d: Duration) -> f32 {
    d.as_secs_f32() * 1_000_000.0
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;
    use crate::mesh::{MeshRegistry, CIRCLE_MESH_ID};
    use crate::world::WorldConfig;

    fn circle_world(positions: &[(Vec2, Vec2)]) -> World {
        let registry = Arc::new(MeshRegistry::new());
        let mut world = World::new(WorldConfig::new(1024.0, 1024.0), registry);
        for (pos, vel) in positions {
            world
                .add_body(*pos, *vel, CIRCLE_MESH_ID, 1.0, 1.0, 1.0, 0.0, 1.0)
                .unwrap();
        }
        world
    }

    #[test]
    fn test_step_integrates_free_body() {
        let world = circle_world(&[(Vec2::new(100.0, 100.0), Vec2::new(10.0, 0.0))]);
        let mut engine = Engine::new(2, world);

        engine.world_mut().reset_forces(Vec2::ZERO);
        let timings = engine.step(0.5);

        let body = engine.world().body(0).unwrap();
        assert_eq!(body.position, Vec2::new(105.0, 100.0));
        assert!(timings.total_us() >= 0.0);
    }

    #[test]
    fn test_step_resolves_head_on_collision() {
        let world = circle_world(&[
            (Vec2::new(500.0, 500.0), Vec2::new(1.0, 0.0)),
            (Vec2::new(515.0, 500.0), Vec2::new(-1.0, 0.0)),
        ]);
        let mut engine = Engine::new(4, world);

        engine.world_mut().reset_forces(Vec2::ZERO);
        engine.step(0.0);

        let world = engine.world();
        assert_eq!(world.collision_count(), 1);
        // Equal masses with e = 1: the velocities swap
        assert!((world.body(0).unwrap().velocity.x + 1.0).abs() < 1e-5);
        assert!((world.body(1).unwrap().velocity.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_single_thread_is_deterministic() {
        fn run() -> Vec<(Vec2, Vec2)> {
            let world = circle_world(&[
                (Vec2::new(480.0, 500.0), Vec2::new(8.0, 3.0)),
                (Vec2::new(515.0, 505.0), Vec2::new(-6.0, 0.0)),
                (Vec2::new(500.0, 530.0), Vec2::new(0.0, -5.0)),
            ]);
            let mut engine = Engine::new(1, world);
            for _ in 0..120 {
                engine.world_mut().reset_forces(Vec2::new(0.0, 2.0));
                engine.step(0.016);
            }
            engine
                .world()
                .iter_active()
                .map(|(_, b)| (b.position, b.velocity))
                .collect()
        }

        let a = run();
        let b = run();
        // Bit-identical, not merely close
        assert_eq!(a, b);
    }

    #[test]
    fn test_many_workers_with_few_tasks() {
        // More workers than bodies: idle workers must still pair barriers
        let world = circle_world(&[(Vec2::new(100.0, 100.0), Vec2::ZERO)]);
        let mut engine = Engine::new(8, world);
        engine.world_mut().reset_forces(Vec2::ZERO);
        for _ in 0..4 {
            engine.step(0.016);
        }
        assert_eq!(engine.world().active_count(), 1);
    }

    #[test]
    fn test_pair_buffers_match_after_step() {
        let world = circle_world(&[
            (Vec2::new(500.0, 500.0), Vec2::ZERO),
            (Vec2::new(512.0, 500.0), Vec2::ZERO),
            (Vec2::new(700.0, 700.0), Vec2::ZERO),
        ]);
        let mut engine = Engine::new(3, world);
        engine.world_mut().reset_forces(Vec2::ZERO);
        engine.step(0.0);

        let world = engine.world();
        assert_eq!(world.collision_pairs().len(), world.collision_results().len());
        assert_eq!(world.collision_pairs().len(), 1);
        assert!(world.collision_results()[0].is_colliding());
    }
}
