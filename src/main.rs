use clap::Parser;
use petri_bits::BitStream;
use petri_geom::Vec3;
use petri_grid::UniformGrid;
use petri_io::{restore_or_default, save_snapshot};
use petri_octree::{Octree, OctreeItem};
use petri_sim::{SimulationState, load_params_from_path};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

/// Headless driver for the spring-mass growth simulation: runs a fixed
/// number of ticks, then builds the packed grid, boundary bitplane, and
/// codec statistics a renderer would consume.
#[derive(Parser, Debug)]
#[command(name = "petri")]
struct Args {
    /// Number of simulation ticks to run
    #[arg(long, default_value_t = 600)]
    steps: u32,
    /// Fixed timestep per tick
    #[arg(long, default_value_t = 0.01)]
    dt: f32,
    /// RNG seed driving division and jitter
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// TOML file with simulation parameters; starts a fresh scene
    #[arg(long)]
    params: Option<PathBuf>,
    /// Snapshot file to restore from and dump to
    #[arg(long, default_value = "simulation_state_dump")]
    snapshot: PathBuf,
    /// Cells per axis of the packed display grid
    #[arg(long, default_value_t = 32)]
    grid_dim: u32,
    /// Insertion radius when flooding particles into the display grid
    #[arg(long, default_value_t = 0.325)]
    flood_radius: f32,
    /// Report debug outline line counts for the grid and octree
    #[arg(long)]
    lines: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut state = match &args.params {
        Some(path) => match load_params_from_path(path) {
            Ok(params) => {
                log::info!("fresh scene from {}", path.display());
                SimulationState::with_params(params)
            }
            Err(e) => {
                log::warn!("params load from {} failed ({}); using defaults", path.display(), e);
                SimulationState::new()
            }
        },
        None => restore_or_default(&args.snapshot),
    };

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    for tick in 0..args.steps {
        state.step(args.dt, &mut rng);
        if tick % 100 == 0 {
            log::info!(
                "[tick {}] particles={} links={} extent={:.3}",
                tick,
                state.particles.len(),
                state.links.len(),
                state.system_size
            );
        }
    }
    log::info!(
        "done: {} particle(s), {} link(s), extent {:.3}",
        state.particles.len(),
        state.links.len(),
        state.system_size
    );

    // The consumer pass: flood the particles into a display grid at a
    // fixed resolution, then pack and classify it
    let mut grid =
        UniformGrid::with_half_extent(state.system_size + args.flood_radius, args.grid_dim);
    for (i, pnt) in state.particles.iter().enumerate() {
        grid.put_radius(*pnt, args.flood_radius, i as u32);
    }
    let packed = grid.pack();
    log::info!(
        "packed grid: {} cell(s), {} occupied, {} id slot(s)",
        packed.arena_table.len() / 2,
        grid.occupied_cell_count(),
        packed.ids.len()
    );

    let mut bitplane = BitStream::new();
    grid.to_bit_table(&mut bitplane);
    let mut rle4 = BitStream::new();
    let mut rle8 = BitStream::new();
    let mut rle16 = BitStream::new();
    let mut zero_chunk = BitStream::new();
    bitplane.run_length_encode4(&mut rle4);
    bitplane.run_length_encode8(&mut rle8);
    bitplane.run_length_encode16(&mut rle16);
    bitplane.run_length_encode_zero_chunk8(&mut zero_chunk);
    log::info!(
        "bitplane {} byte(s) at {:.3} bits/byte; rle4={} rle8={} rle16={} zero_chunk={}",
        bitplane.byte_len(),
        bitplane.shannon_entropy(),
        rle4.byte_len(),
        rle8.byte_len(),
        rle16.byte_len(),
        zero_chunk.byte_len()
    );

    if args.lines {
        let mut grid_lines = Vec::new();
        grid.append_outline_lines(&mut grid_lines);

        let mut tree = Octree::new(grid.min, grid.max);
        let r = Vec3::splat(state.params.cell_radius);
        for (i, pnt) in state.particles.iter().enumerate() {
            tree.insert(OctreeItem {
                min: *pnt - r,
                max: *pnt + r,
                id: i as u32,
            });
        }
        let mut tree_lines = Vec::new();
        tree.append_outline_lines(&mut tree_lines);
        log::info!(
            "debug lines: grid {} segment(s); octree {} segment(s) over {} node(s)",
            grid_lines.len() / 2,
            tree_lines.len() / 2,
            tree.node_count()
        );
    }

    if let Err(e) = save_snapshot(&state, &args.snapshot) {
        log::warn!("snapshot dump to {} failed: {}", args.snapshot.display(), e);
    } else {
        log::info!("snapshot dumped to {}", args.snapshot.display());
    }
}
