//! Headless broad-phase simulation
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>      BSP config JSON (default: built-in)
//!   --ticks <N>          Simulation ticks to run (default: 120)
//!   --characters <N>     Characters to spawn (default: 64)
//!   --particles <N>      Particles fired per tick (default: 8)
//!   --seed <SEED>        Random seed (default: 12345)

use std::path::PathBuf;
use std::time::Instant;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rkbsp::bsp::BspConfig;
use rkbsp::core::logging;
use rkbsp::math::Bumper;
use rkbsp::object::{Character, CharacterId, DeferredQueue, ObjectBsp, ObjectRef, ObjectSet, Particle};

const TICK_SECONDS: f32 = 1.0 / 30.0;

fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = parse_str_arg(&args, "--config").map(PathBuf::from);
    let ticks = parse_usize_arg(&args, "--ticks").unwrap_or(120);
    let characters = parse_usize_arg(&args, "--characters").unwrap_or(64);
    let particles_per_tick = parse_usize_arg(&args, "--particles").unwrap_or(8);
    let seed = parse_u64_arg(&args, "--seed").unwrap_or(12345);

    let config = match config_path {
        Some(path) => match BspConfig::load_sync(&path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("Failed to load {}: {}", path.display(), err);
                std::process::exit(1);
            }
        },
        None => BspConfig::default(),
    };
    if config.dimensions != 3 {
        log::error!("The simulation needs a 3-dimensional tree, got {}", config.dimensions);
        std::process::exit(1);
    }

    let mut bsp = match ObjectBsp::new(&config) {
        Ok(bsp) => bsp,
        Err(err) => {
            log::error!("Failed to build BSP: {}", err);
            std::process::exit(1);
        }
    };

    println!("=== Rkbsp Broad Phase Demo ===");
    println!("Ticks:      {}", ticks);
    println!("Characters: {}", characters);
    println!("Particles:  {} per tick", particles_per_tick);
    println!("Seed:       {}", seed);
    println!("Depth:      {}", config.max_depth);
    println!();

    let mut rng = StdRng::seed_from_u64(seed);
    let (lo, hi) = world_extent(&config);

    let mut objects = ObjectSet::new();
    let mut shooters = Vec::with_capacity(characters);
    for _ in 0..characters {
        let position = random_point(&mut rng, lo, hi);
        let velocity = Vec3::new(rng.random_range(-4.0..4.0), rng.random_range(-4.0..4.0), 0.0);
        let bumper = Bumper::new(rng.random_range(0.5..1.5), rng.random_range(0.0..2.0), 2.0);
        shooters.push(objects.spawn_character(Character::new(position, bumper).with_velocity(velocity)));
    }

    let mut queue = DeferredQueue::new();
    let mut total_hits = 0usize;
    let start = Instant::now();

    for tick in 0..ticks {
        fire_particles(&mut rng, &objects, &shooters, particles_per_tick, &mut queue);
        queue.drain_into(&mut objects);

        let stats = bsp.fill(&objects, 0.0, TICK_SECONDS);
        let pairs = bsp.overlapping_pairs(&objects);

        // particles that touch anything other than their owner are spent
        let mut hits = 0;
        for pair in &pairs {
            for object in [pair.first, pair.second] {
                if matches!(object, ObjectRef::Particle(_)) {
                    queue.terminate(object);
                    hits += 1;
                }
            }
        }
        total_hits += hits;

        for expired in objects.integrate(TICK_SECONDS) {
            queue.terminate(expired);
        }
        let report = queue.drain_into(&mut objects);

        log::info!(
            "tick {:>4}: {} objects, {} in tree ({} infinite), {} dropped, {} pairs, {} particles removed",
            tick,
            objects.len(),
            stats.inserted,
            stats.infinite,
            stats.dropped,
            pairs.len(),
            report.terminated
        );
    }

    let elapsed = start.elapsed();
    let tree = bsp.stats();
    println!();
    println!("=== Done ===");
    println!("Time:       {:.2?} ({:.2?} per tick)", elapsed, elapsed / ticks.max(1) as u32);
    println!("Hits:       {}", total_hits);
    println!("Branches:   {} used / {} total", tree.branches_used, tree.branch_capacity);
    println!("Leaves:     {}", tree.leaves);
}

fn world_extent(config: &BspConfig) -> (Vec3, Vec3) {
    let lo = Vec3::new(config.bounds_min[0], config.bounds_min[1], config.bounds_min[2]);
    let hi = Vec3::new(config.bounds_max[0], config.bounds_max[1], config.bounds_max[2]);
    // keep spawns away from the edges so most objects stay inside the tree
    let margin = (hi - lo) * 0.05;
    (lo + margin, hi - margin)
}

fn random_point(rng: &mut StdRng, lo: Vec3, hi: Vec3) -> Vec3 {
    Vec3::new(
        rng.random_range(lo.x..=hi.x),
        rng.random_range(lo.y..=hi.y),
        lo.z,
    )
}

fn fire_particles(
    rng: &mut StdRng,
    objects: &ObjectSet,
    shooters: &[CharacterId],
    count: usize,
    queue: &mut DeferredQueue,
) {
    if shooters.is_empty() {
        return;
    }

    for _ in 0..count {
        let owner = shooters[rng.random_range(0..shooters.len())];
        let Some(character) = objects.character(owner) else {
            continue;
        };
        let angle: f32 = rng.random_range(0.0..std::f32::consts::TAU);
        let velocity = Vec3::new(angle.cos(), angle.sin(), 0.0) * 60.0;
        let particle = Particle::new(character.position + Vec3::Z, velocity, Bumper::square(0.25, 0.5))
            .with_owner(owner)
            .with_lifetime(1.5);
        queue.spawn_particle(particle);
    }
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u64_arg(args: &[String], flag: &str) -> Option<u64> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
