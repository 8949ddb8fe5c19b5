//! Textual snapshot persistence for simulation scenes.
#![forbid(unsafe_code)]

use hashbrown::HashSet;
use petri_geom::Vec3;
use petri_sim::{SimParams, SimulationState};
use std::error::Error;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

// Snapshot layout, one value per line: the nine scalar parameters,
// particle count, per-particle x/y/z, link count, link index pairs.

pub fn save_snapshot(state: &SimulationState, path: &Path) -> Result<(), Box<dyn Error>> {
    let p = state.params;
    let mut out = String::new();
    writeln!(out, "{}", p.rest_length)?;
    writeln!(out, "{}", p.spring_factor)?;
    writeln!(out, "{}", p.repell_factor)?;
    writeln!(out, "{}", p.planar_factor)?;
    writeln!(out, "{}", p.bulge_factor)?;
    writeln!(out, "{}", p.cell_radius)?;
    writeln!(out, "{}", p.cell_mass)?;
    writeln!(out, "{}", p.domain_radius)?;
    writeln!(out, "{}", p.birth_rate)?;
    writeln!(out, "{}", state.particles.len())?;
    for pnt in &state.particles {
        writeln!(out, "{}", pnt.x)?;
        writeln!(out, "{}", pnt.y)?;
        writeln!(out, "{}", pnt.z)?;
    }
    writeln!(out, "{}", state.links.len())?;
    for &(i, j) in &state.links {
        writeln!(out, "{}", i)?;
        writeln!(out, "{}", j)?;
    }
    fs::write(path, out)?;
    Ok(())
}

fn next_f32<'a>(it: &mut impl Iterator<Item = &'a str>) -> Result<f32, Box<dyn Error>> {
    Ok(it.next().ok_or("truncated snapshot")?.parse::<f32>()?)
}

fn next_u32<'a>(it: &mut impl Iterator<Item = &'a str>) -> Result<u32, Box<dyn Error>> {
    Ok(it.next().ok_or("truncated snapshot")?.parse::<u32>()?)
}

pub fn load_snapshot(path: &Path) -> Result<SimulationState, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let mut it = text.split_whitespace();
    let params = SimParams {
        rest_length: next_f32(&mut it)?,
        spring_factor: next_f32(&mut it)?,
        repell_factor: next_f32(&mut it)?,
        planar_factor: next_f32(&mut it)?,
        bulge_factor: next_f32(&mut it)?,
        cell_radius: next_f32(&mut it)?,
        cell_mass: next_f32(&mut it)?,
        domain_radius: next_f32(&mut it)?,
        birth_rate: next_u32(&mut it)?,
    };
    let particle_count = next_u32(&mut it)? as usize;
    let mut particles = Vec::with_capacity(particle_count);
    for _ in 0..particle_count {
        let x = next_f32(&mut it)?;
        let y = next_f32(&mut it)?;
        let z = next_f32(&mut it)?;
        particles.push(Vec3::new(x, y, z));
    }
    let link_count = next_u32(&mut it)? as usize;
    let mut links = HashSet::with_capacity(link_count);
    for _ in 0..link_count {
        let i = next_u32(&mut it)?;
        let j = next_u32(&mut it)?;
        if i >= j || j as usize >= particle_count {
            return Err(format!("malformed link ({}, {})", i, j).into());
        }
        links.insert((i, j));
    }
    // System extent is re-derived from the particles, never trusted
    Ok(SimulationState::from_parts(params, particles, links))
}

/// Loads a snapshot, or falls back to the default seed scene when the
/// file is missing or unreadable.
pub fn restore_or_default(path: &Path) -> SimulationState {
    match load_snapshot(path) {
        Ok(state) => {
            log::info!(
                "restored {} particle(s), {} link(s) from {}",
                state.particles.len(),
                state.links.len(),
                path.display()
            );
            state
        }
        Err(e) => {
            log::warn!(
                "snapshot restore from {} failed ({}); starting from defaults",
                path.display(),
                e
            );
            SimulationState::new()
        }
    }
}
