//! One episode of a few tasks against the mock collaborators.
//!
//! Demonstrates: build registry → engine per task → reset → read the
//! instruction, subtask signals and task config → drive the mock state to
//! success.
//!
//! Run with `RUST_LOG=tabletop_tasks=debug cargo run --example walkthrough`.

use tabletop_bench::{standard_registry, JitterSampler};
use tabletop_core::{Arm, SimControl, Vec3};
use tabletop_test_utils::{kitchen_catalog, MockAssetFactory, MockFixtures, MockSim};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .without_time()
        .init();

    let catalog = kitchen_catalog();
    let registry = standard_registry(&catalog)?;
    println!("{} tasks registered\n", registry.len());

    let fixtures = MockFixtures::kitchen();
    let mut factory = MockAssetFactory::kitchen(catalog.clone());
    let mut sampler = JitterSampler;

    // --- Pick and place ---
    let mut engine = registry.engine("PnPOnionToBowl", &catalog)?;
    let mut sim = MockSim::new();
    engine.reset(42, &fixtures, &mut factory, &mut sampler, &mut sim)?;
    println!("PnPOnionToBowl: {}", engine.get_episode_language_description()?);
    if let Some(plan) = engine.plan() {
        for (slot, category) in plan.categories() {
            println!("  {slot:<32} {category}");
        }
    }

    sim.set_grasp(Arm::Right, "obj", true);
    println!("  signals while grasping: {:?}", engine.get_subtask_signals(&sim)?);

    let at = Vec3::new(0.9, -0.3, 0.9);
    sim.set_grasp(Arm::Right, "obj", false)
        .place("container", at)
        .place("obj", Vec3::new(at.x, at.y, at.z + 0.05))
        .set_contact("obj", "container", true)
        .set_gripper(Arm::Right, Vec3::new(0.0, 0.0, 2.0))
        .set_gripper(Arm::Left, Vec3::new(0.0, 0.0, 2.0));
    println!("  success after placing: {}", engine.check_success(&sim)?);
    println!("  task config:\n{}\n", engine.get_task_config().to_json()?);

    // --- Articulated ---
    let mut engine = registry.engine("TabletopCloseCabinetDoor", &catalog)?;
    let mut sim = MockSim::new();
    engine.reset(7, &fixtures, &mut factory, &mut sampler, &mut sim)?;
    println!(
        "TabletopCloseCabinetDoor: {} (open: {})",
        engine.get_episode_language_description()?,
        engine.is_door_open(&sim)?
    );
    sim.set_door_state("hinge_cabinet", 0.0);
    println!("  success after closing: {}\n", engine.check_success(&sim)?);

    // --- Matrix ---
    for id in registry.ids().filter(|id| id.starts_with("PnP5From")) {
        let mut engine = registry.engine(id, &catalog)?;
        let mut sim = MockSim::new();
        match engine.reset(3, &fixtures, &mut factory, &mut sampler, &mut sim) {
            Ok(()) => println!("{id}: {}", engine.get_episode_language_description()?),
            Err(e) if e.is_retryable() => println!("{id}: rejected ({e}), reset with a new seed"),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
