use hashbrown::HashSet;
use petri_geom::Vec3;
use petri_io::{load_snapshot, restore_or_default, save_snapshot};
use petri_sim::{SimParams, SimulationState};
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("petri_{}_{}", std::process::id(), name))
}

#[test]
fn snapshot_round_trips() {
    let params = SimParams {
        rest_length: 0.4,
        birth_rate: 25,
        ..SimParams::default()
    };
    let mut links = HashSet::new();
    links.insert((0, 2));
    links.insert((1, 2));
    let state = SimulationState::from_parts(
        params,
        vec![
            Vec3::new(0.125, -0.25, 0.5),
            Vec3::new(1.5, 0.0, 0.0),
            Vec3::new(-0.75, 2.0, 0.25),
        ],
        links,
    );

    let path = temp_path("round_trip");
    save_snapshot(&state, &path).unwrap();
    let restored = load_snapshot(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(restored.particles.len(), 3);
    for (a, b) in restored.particles.iter().zip(&state.particles) {
        assert!(a.distance(*b) < 1e-6);
    }
    assert_eq!(restored.links, state.links);
    assert!((restored.params.rest_length - 0.4).abs() < 1e-6);
    assert_eq!(restored.params.birth_rate, 25);
    // Extent is re-derived on restore
    assert!((restored.system_size - state.system_size).abs() < 1e-5);
}

#[test]
fn missing_file_falls_back_to_default_scene() {
    let state = restore_or_default(&temp_path("does_not_exist"));
    assert_eq!(state.particles.len(), 2);
    assert!(state.links.contains(&(0, 1)));
}

#[test]
fn malformed_snapshot_is_an_error() {
    let path = temp_path("malformed");
    std::fs::write(&path, "not a number\n").unwrap();
    assert!(load_snapshot(&path).is_err());
    // restore_or_default swallows it into the default scene
    let state = restore_or_default(&path);
    assert_eq!(state.particles.len(), 2);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn unnormalized_link_is_rejected() {
    let state = SimulationState::new();
    let path = temp_path("bad_link");
    save_snapshot(&state, &path).unwrap();
    // Flip the single (0, 1) link into (1, 0)
    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<&str> = text.lines().collect();
    let n = lines.len();
    lines[n - 2] = "1";
    lines[n - 1] = "0";
    std::fs::write(&path, lines.join("\n")).unwrap();
    assert!(load_snapshot(&path).is_err());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn truncated_snapshot_is_an_error() {
    let state = SimulationState::new();
    let path = temp_path("truncated");
    save_snapshot(&state, &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let cut: String = text.lines().take(5).collect::<Vec<_>>().join("\n");
    std::fs::write(&path, cut).unwrap();
    assert!(load_snapshot(&path).is_err());
    let _ = std::fs::remove_file(&path);
}
