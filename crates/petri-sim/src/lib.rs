//! Spring-mass particle dynamics with dynamic link topology and
//! stochastic division.
#![forbid(unsafe_code)]

use hashbrown::HashSet;
use petri_geom::Vec3;
use petri_grid::UniformGrid;
use rand::Rng;
use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

// Particles under accumulated force beyond this never divide in a tick.
const DIVISION_STRESS_LIMIT: f32 = 120.0;
// Pairs closer than this fraction of the rest length become linked.
const LINK_CAPTURE_RATIO: f32 = 0.9;
// Magnitude of the positional jitter applied to a newborn particle.
const DIVISION_JITTER: f32 = 1.0e-3;

/// Scalar configuration for a simulated scene. Loadable from TOML with
/// per-field defaults.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct SimParams {
    pub rest_length: f32,
    pub spring_factor: f32,
    pub repell_factor: f32,
    pub planar_factor: f32,
    pub bulge_factor: f32,
    pub cell_radius: f32,
    pub cell_mass: f32,
    pub domain_radius: f32,
    pub birth_rate: u32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            rest_length: 0.35,
            spring_factor: 100.0,
            repell_factor: 0.3,
            planar_factor: 10.0,
            bulge_factor: 10.0,
            cell_radius: 0.025,
            cell_mass: 10.0,
            domain_radius: 10.0,
            birth_rate: 100,
        }
    }
}

pub fn load_params_from_path(path: &Path) -> Result<SimParams, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    let params: SimParams = toml::from_str(&s)?;
    Ok(params)
}

/// One simulated scene: a growable particle array, the active spring
/// links (normalized `i < j`), and the tracked bounding extent.
///
/// Particles are only ever appended; links are only ever inserted.
pub struct SimulationState {
    pub params: SimParams,
    pub particles: Vec<Vec3>,
    pub links: HashSet<(u32, u32)>,
    pub system_size: f32,
}

impl SimulationState {
    /// Two seed particles straddling the adhesion plane, linked together.
    pub fn new() -> Self {
        Self::with_params(SimParams::default())
    }

    pub fn with_params(params: SimParams) -> Self {
        let mut links = HashSet::new();
        links.insert((0, 1));
        SimulationState {
            particles: vec![
                Vec3::new(0.0, 0.0, -params.cell_radius),
                Vec3::new(0.0, 0.0, params.cell_radius),
            ],
            links,
            system_size: params.cell_radius,
            params,
        }
    }

    /// Reassembles a scene from raw parts (snapshot restore); the
    /// bounding extent is re-derived, never trusted from the source.
    pub fn from_parts(
        params: SimParams,
        particles: Vec<Vec3>,
        links: HashSet<(u32, u32)>,
    ) -> Self {
        let mut state = SimulationState {
            params,
            particles,
            links,
            system_size: 0.0,
        };
        state.update_size();
        state
    }

    /// Largest absolute particle coordinate plus one rest length.
    pub fn update_size(&mut self) {
        let mut size = 0.0f32;
        for p in &self.particles {
            size = size.max(p.max_abs_component());
        }
        self.system_size = size + self.params.rest_length;
    }

    /// Advances the scene by one tick.
    ///
    /// All force passes read the committed tick-start positions and
    /// accumulate displacements into a working copy, so no pass observes
    /// another's partial updates; the copy is committed at the end.
    pub fn step<R: Rng>(&mut self, dt: f32, rng: &mut R) {
        let p = self.params;

        // Fresh grid over the current extent, every particle at zero size
        let mut grid = UniformGrid::with_half_extent(
            self.system_size,
            (self.system_size / p.rest_length) as u32,
        );
        for (i, pnt) in self.particles.iter().enumerate() {
            grid.put_radius(*pnt, 0.0, i as u32);
        }

        let mut force_table = vec![0.0f32; self.particles.len()];
        let mut new_particles = self.particles.clone();

        // Repulsion: short-range inverse-square-like push between grid
        // neighbors; close pairs become linked on the spot.
        for i in 0..self.particles.len() {
            let old_pos_0 = self.particles[i];
            // Sorted neighbor order keeps float accumulation reproducible
            let mut close_points = grid.traverse(old_pos_0, p.rest_length);
            close_points.sort_unstable();
            let mut new_pos_0 = new_particles[i];
            let mut acc_force = 0.0f32;
            for j in close_points {
                let j = j as usize;
                // Each pair is handled once, from its lower index
                if j <= i {
                    continue;
                }
                let old_pos_1 = self.particles[j];
                let dist = old_pos_0.distance(old_pos_1);
                if dist < p.rest_length * LINK_CAPTURE_RATIO {
                    self.links.insert((i as u32, j as u32));
                }
                let force = p.repell_factor * p.cell_mass / (dist * dist + 1.0);
                acc_force += force.abs();
                let vforce = (old_pos_0 - old_pos_1) / (dist + 1.0) * (force * dt);
                new_pos_0 += vforce;
                new_particles[j] -= vforce;
                force_table[j] += force.abs();
            }
            new_particles[i] = new_pos_0;
            force_table[i] += acc_force;
        }

        // Attraction: Hookean springs over the link set, in sorted order
        // so accumulation stays reproducible across runs
        let mut active_links: Vec<(u32, u32)> = self.links.iter().copied().collect();
        active_links.sort_unstable();
        for &(i, j) in &active_links {
            assert!(i < j, "malformed link ({}, {})", i, j);
            let (i, j) = (i as usize, j as usize);
            let old_pos_0 = self.particles[i];
            let old_pos_1 = self.particles[j];
            let dist = old_pos_0.distance(old_pos_1);
            let force = p.spring_factor * (p.rest_length - dist) / dist;
            let vforce = (old_pos_0 - old_pos_1) * (force * dt);
            new_particles[i] += vforce;
            new_particles[j] -= vforce;
            force_table[i] += force.abs();
            force_table[j] += force.abs();
        }

        // Planarization: pull each particle toward the centroid of its
        // linked neighbors
        let mut centroid_sum = vec![Vec3::ZERO; self.particles.len()];
        let mut centroid_count = vec![0u32; self.particles.len()];
        for &(i, j) in &active_links {
            let (i, j) = (i as usize, j as usize);
            centroid_sum[i] += self.particles[j];
            centroid_count[i] += 1;
            centroid_sum[j] += self.particles[i];
            centroid_count[j] += 1;
        }
        for i in 0..self.particles.len() {
            if centroid_count[i] == 0 {
                continue;
            }
            let target = centroid_sum[i] / centroid_count[i] as f32;
            let old_pos_0 = self.particles[i];
            let force = p.spring_factor * old_pos_0.distance(target);
            new_particles[i] += (target - old_pos_0) * (force * dt);
            force_table[i] += force.abs();
        }

        // Division: unstressed particles spawn a jittered copy at random
        for i in 0..self.particles.len() {
            if rng.gen_range(0..p.birth_rate) == 0 && force_table[i] < DIVISION_STRESS_LIMIT {
                let jitter = Vec3::new(
                    rng.gen_range(-1.0f32..1.0),
                    rng.gen_range(-1.0f32..1.0),
                    rng.gen_range(-1.0f32..1.0),
                ) * DIVISION_JITTER;
                new_particles.push(self.particles[i] + jitter);
            }
        }

        // Confinement: decay toward the z=0 plane and never pass below it
        for pos in &mut new_particles {
            pos.z -= pos.z * dt;
            if pos.z < 0.0 {
                pos.z = 0.0;
            }
        }

        self.particles = new_particles;
        self.update_size();
    }
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::new()
    }
}
