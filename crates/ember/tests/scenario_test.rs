//! # Scenario Runner Tests
//!
//! Runs the shipped meadow scenario and small inline scenarios end to end.

use std::path::PathBuf;

use ember::{ParticleVariant, Scenario};
use ember_core::EngineError;

fn meadow_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/scenarios/meadow.toml")
}

/// Test: the shipped scenario loads with its effect library and runs.
#[test]
fn test_meadow_runs() {
    let scenario = Scenario::load(meadow_path()).unwrap();
    assert_eq!(scenario.emitter_count(), 3);
    assert_eq!(scenario.foliage_channels().len(), 2);

    let summary = scenario.run(Some(300)).unwrap();
    assert_eq!(summary.frames, 300);
    assert!((summary.simulated_seconds - 5.0).abs() < 1e-3);

    let campfire = &summary.emitters[0];
    assert!(campfire.cpu.unwrap().live > 0);
    assert!(campfire.stream_out.unwrap().live > 0);

    let smoke = &summary.emitters[1];
    assert_eq!(smoke.effect, "wisp");
    assert!(smoke.cpu.is_some());
    assert!(smoke.stream_out.is_none());

    let torch = &summary.emitters[2];
    assert!(torch.cpu.is_none());
    assert!(torch.stream_out.unwrap().emitted > 0);

    assert!(summary.planted() > 0);
    assert!(summary.live_particles() > 0);
}

/// Test: a run is fully determined by the scenario seed.
#[test]
fn test_runs_are_reproducible() {
    let scenario = Scenario::load(meadow_path()).unwrap();
    let first = scenario.run(Some(120)).unwrap();
    let second = scenario.run(Some(120)).unwrap();
    assert_eq!(first, second);
}

/// Test: the flower channel only grows where its map channel is non-zero.
#[test]
fn test_density_map_channels() {
    let scenario = Scenario::load(meadow_path()).unwrap();
    let patches = scenario.plant_foliage();
    let half = scenario.node_bounds().center().x;

    let flowers = &patches[1];
    assert!(!flowers.is_empty());
    assert!(flowers.vertices().iter().all(|v| v.position.x <= half + 1e-3));

    // Grass grows on both halves, denser in the west
    let grass = &patches[0];
    let west = grass.vertices().iter().filter(|v| v.position.x < half).count();
    let east = grass.len() - west;
    assert!(east > 0);
    assert!(west > east);
}

/// Test: a finite emitter drains both variants back to nothing.
#[test]
fn test_emitter_lifetime_drains() {
    let source = r#"
        frames = 600

        [terrain]
        kind = "flat"
        min = { x = -8.0, y = 0.0, z = -8.0 }
        max = { x = 8.0, y = 8.0, z = 8.0 }

        [[emitters]]
        name = "burst"
        effect = "fire"
        rate = 100.0
        lifetime = 1.0
        path = [{ x = 0.0, y = 1.0, z = 0.0 }]
    "#;
    let scenario = Scenario::from_toml_str(source).unwrap();

    let early = scenario.run(Some(30)).unwrap();
    assert!(early.live_particles() > 0);

    let summary = scenario.run(None).unwrap();
    let burst = &summary.emitters[0];
    let cpu = burst.cpu.unwrap();
    assert_eq!(cpu.live, 0);
    assert!(cpu.added_total > 0);
    assert_eq!(burst.stream_out.unwrap().live, 0);
}

/// Test: invalid scenarios are rejected with the matching error.
#[test]
fn test_invalid_scenarios() {
    let base = r#"
        [terrain]
        kind = "flat"
        min = { x = 0.0, y = 0.0, z = 0.0 }
        max = { x = 8.0, y = 8.0, z = 8.0 }
    "#;

    let no_path = format!("{base}\n[[emitters]]\nname = \"e\"\neffect = \"fire\"\nrate = 1.0\npath = []\n");
    assert!(matches!(
        Scenario::from_toml_str(&no_path),
        Err(EngineError::InvalidParams(_))
    ));

    let bad_density = format!(
        "{base}\n[[foliage]]\nname = \"g\"\ndensity = 1.5\nmin_size = {{ x = 1.0, y = 1.0 }}\nmax_size = {{ x = 1.0, y = 1.0 }}\n"
    );
    assert!(matches!(
        Scenario::from_toml_str(&bad_density),
        Err(EngineError::InvalidParams(_))
    ));

    assert!(matches!(
        Scenario::from_toml_str("frames = \"many\""),
        Err(EngineError::Config(_))
    ));

    let zero_step = format!("frame_time = 0.0\n{base}");
    assert!(Scenario::from_toml_str(&zero_step).is_err());
}

/// Test: the variant names parse as written in scenario files.
#[test]
fn test_variant_names() {
    let source = r#"
        [terrain]
        kind = "ramp"
        min = { x = 0.0, y = 0.0, z = 0.0 }
        max = { x = 8.0, y = 8.0, z = 8.0 }
        slope = 0.5

        [[emitters]]
        name = "a"
        effect = "dust"
        rate = 5.0
        path = [{ x = 1.0, y = 1.0, z = 1.0 }]
        variant = "stream_out"
    "#;
    let config: ember::ScenarioConfig = ember_core::config::parse_toml(source).unwrap();
    assert_eq!(config.emitters[0].variant, ParticleVariant::StreamOut);
    assert!(Scenario::from_config(config, None).is_ok());
}
