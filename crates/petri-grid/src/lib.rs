//! Bucketed uniform grid: insertion, neighbor query, voxel ray walk,
//! solid/void classification, and flat packing.
#![forbid(unsafe_code)]

use hashbrown::HashSet;
use petri_bits::BitStream;
use petri_geom::{Vec3, append_cube_outline};

// Absolute slop applied to box/cell overlap during insertion and queries.
const CELL_EPS: f32 = 1.0e-1;

/// Flattened read-only snapshot of a grid, suitable for direct upload.
///
/// `arena_table` holds one `(offset, count)` pair per cell in linear index
/// order; offsets reference `ids`, whose slot 0 is the reserved "absent"
/// sentinel and never denotes a real item.
#[derive(Clone, Debug, Default)]
pub struct PackedGrid {
    pub arena_table: Vec<u32>,
    pub ids: Vec<u32>,
    pub min: Vec3,
    pub max: Vec3,
    pub bin_count: [u32; 3],
    pub cell_size: f32,
}

/// Regular 3D bucket grid over an axis-aligned domain.
///
/// Cells are addressed `x + y*nx + z*nx*ny`. Bucket storage is indirect:
/// `bin_indices` maps each cell to an entry of `bins`, with index 0
/// permanently reserved to mean "empty cell".
pub struct UniformGrid {
    pub min: Vec3,
    pub max: Vec3,
    pub bin_count: [u32; 3],
    pub total_bin_count: u32,
    pub cell_size: f32,
    bins: Vec<Vec<u32>>,
    bin_indices: Vec<u32>,
}

impl UniformGrid {
    /// Builds a grid over `[min, max]`; `max` is snapped outward so the
    /// domain is an exact integer multiple of `cell_size` per axis.
    pub fn new(min: Vec3, max: Vec3, cell_size: f32) -> Self {
        let fbin = (max - min) / cell_size;
        let nx = (fbin.x + 1.0e-7).ceil();
        let ny = (fbin.y + 1.0e-7).ceil();
        let nz = (fbin.z + 1.0e-7).ceil();
        let bin_count = [nx as u32, ny as u32, nz as u32];
        let total_bin_count = bin_count[0] * bin_count[1] * bin_count[2];
        UniformGrid {
            min,
            max: min + Vec3::new(nx, ny, nz) * cell_size,
            bin_count,
            total_bin_count,
            cell_size,
            bins: vec![Vec::new()],
            bin_indices: vec![0; total_bin_count as usize],
        }
    }

    /// Cube domain `[-half_extent, half_extent]^3` with roughly
    /// `bins_per_axis` cells along each axis. A zero `bins_per_axis`
    /// degenerates to a single-cell grid.
    pub fn with_half_extent(half_extent: f32, bins_per_axis: u32) -> Self {
        Self::new(
            Vec3::splat(-half_extent),
            Vec3::splat(half_extent),
            2.0 * half_extent / bins_per_axis as f32,
        )
    }

    #[inline]
    fn flat_index(&self, ix: u32, iy: u32, iz: u32) -> usize {
        (ix + iy * self.bin_count[0] + iz * self.bin_count[0] * self.bin_count[1]) as usize
    }

    #[inline]
    fn in_bounds(&self, ix: i32, iy: i32, iz: i32) -> bool {
        ix >= 0
            && iy >= 0
            && iz >= 0
            && ix < self.bin_count[0] as i32
            && iy < self.bin_count[1] as i32
            && iz < self.bin_count[2] as i32
    }

    // Integer cell range covering the box [pos-extent, pos+extent] plus
    // the absolute tolerance. Truncation (not floor): negative fringes end
    // up clipped by the bounds check anyway.
    fn cell_range(&self, pos: Vec3, extent: Vec3) -> ([i32; 3], [i32; 3]) {
        let lo = (pos - self.min - Vec3::splat(CELL_EPS) - extent) / self.cell_size;
        let hi = (pos - self.min + Vec3::splat(CELL_EPS) + extent) / self.cell_size;
        (
            [lo.x as i32, lo.y as i32, lo.z as i32],
            [hi.x as i32, hi.y as i32, hi.z as i32],
        )
    }

    /// Appends `id` into every cell overlapping the box
    /// `[pos-extent, pos+extent]`, including partial overlaps. Cells
    /// outside the domain are silently skipped; duplicates are not
    /// collapsed.
    pub fn put(&mut self, pos: Vec3, extent: Vec3, id: u32) {
        let (min_ids, max_ids) = self.cell_range(pos, extent);
        for ix in min_ids[0]..=max_ids[0] {
            for iy in min_ids[1]..=max_ids[1] {
                for iz in min_ids[2]..=max_ids[2] {
                    if !self.in_bounds(ix, iy, iz) {
                        continue;
                    }
                    let flat = self.flat_index(ix as u32, iy as u32, iz as u32);
                    let mut bin_id = self.bin_indices[flat];
                    if bin_id == 0 {
                        self.bins.push(Vec::new());
                        bin_id = (self.bins.len() - 1) as u32;
                        self.bin_indices[flat] = bin_id;
                    }
                    self.bins[bin_id as usize].push(id);
                }
            }
        }
    }

    #[inline]
    pub fn put_radius(&mut self, pos: Vec3, radius: f32, id: u32) {
        self.put(pos, Vec3::splat(radius), id);
    }

    /// Deduplicated ids from every cell overlapping the query box, in
    /// unspecified order.
    ///
    /// Panics if the box lies entirely outside the grid domain.
    pub fn traverse(&self, pos: Vec3, radius: f32) -> Vec<u32> {
        assert!(
            pos.x <= self.max.x + radius
                && pos.y <= self.max.y + radius
                && pos.z <= self.max.z + radius
                && pos.x >= self.min.x - radius
                && pos.y >= self.min.y - radius
                && pos.z >= self.min.z - radius,
            "grid query outside the domain: {:?} r={}",
            pos,
            radius
        );
        let (min_ids, max_ids) = self.cell_range(pos, Vec3::splat(radius));
        let mut set: HashSet<u32> = HashSet::new();
        for ix in min_ids[0]..=max_ids[0] {
            for iy in min_ids[1]..=max_ids[1] {
                for iz in min_ids[2]..=max_ids[2] {
                    if !self.in_bounds(ix, iy, iz) {
                        continue;
                    }
                    let flat = self.flat_index(ix as u32, iy as u32, iz as u32);
                    let bin_id = self.bin_indices[flat];
                    if bin_id != 0 {
                        for &item in &self.bins[bin_id as usize] {
                            set.insert(item);
                        }
                    }
                }
            }
        }
        set.into_iter().collect()
    }

    // Slab test; returns (entry, exit) parametric distances when the ray
    // crosses the domain box.
    fn intersect_box(&self, ray_invdir: Vec3, ray_origin: Vec3) -> Option<(f32, f32)> {
        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        for i in 0..3 {
            let tbot = ray_invdir.axis(i) * (self.min.axis(i) - ray_origin.axis(i));
            let ttop = ray_invdir.axis(i) * (self.max.axis(i) - ray_origin.axis(i));
            t_enter = t_enter.max(tbot.min(ttop));
            t_exit = t_exit.min(tbot.max(ttop));
        }
        if t_exit > t_enter.max(0.0) {
            Some((t_enter, t_exit))
        } else {
            None
        }
    }

    /// Walks the ray through the grid cell by cell in non-decreasing
    /// distance order. Non-empty cells invoke `on_hit` with the cell's id
    /// list and the distance to the cell's far boundary (scaled by a small
    /// forward bias); returning `false` stops the walk. Consumers rely on
    /// the visit order for first-hit queries.
    pub fn iterate<F>(&self, ray_dir: Vec3, ray_origin: Vec3, mut on_hit: F)
    where
        F: FnMut(&[u32], f32) -> bool,
    {
        let mut dir = ray_dir;
        for i in 0..3 {
            let d = dir.axis(i);
            if d.abs() < 1.0e-7 {
                // Signed epsilon instead of a separate degenerate-axis path
                dir.set_axis(i, if d.is_sign_negative() { -1.0e-7 } else { 1.0e-7 });
            }
        }
        let ray_invdir = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
        let Some((hit_min, _)) = self.intersect_box(ray_invdir, ray_origin) else {
            return;
        };
        let hit_min = hit_min.max(0.0);
        let hit_pos = ray_origin + dir * hit_min;

        let mut cell_id = [0i32; 3];
        let mut step = [0i32; 3];
        let mut axis_delta = [0f32; 3];
        let mut axis_distance = [0f32; 3];
        for i in 0..3 {
            let ray_offset = hit_pos.axis(i) - self.min.axis(i);
            cell_id[i] = (ray_offset / self.cell_size)
                .floor()
                .clamp(0.0, self.bin_count[i] as f32 - 1.0) as i32;
            let d = dir.axis(i);
            if d.abs() < 1.0e-5 {
                axis_delta[i] = 0.0;
                axis_distance[i] = 1.0e10;
                step[i] = 0;
            } else if d < 0.0 {
                axis_delta[i] = -self.cell_size * ray_invdir.axis(i);
                axis_distance[i] =
                    (cell_id[i] as f32 * self.cell_size - ray_offset) * ray_invdir.axis(i);
                step[i] = -1;
            } else {
                axis_delta[i] = self.cell_size * ray_invdir.axis(i);
                axis_distance[i] =
                    ((cell_id[i] + 1) as f32 * self.cell_size - ray_offset) * ray_invdir.axis(i);
                step[i] = 1;
            }
        }

        // Smallest next-boundary axis by comparison mask; ties resolve by
        // the fixed table order.
        const AXIS_MAP: [usize; 8] = [2, 1, 2, 1, 2, 2, 0, 0];
        loop {
            let k = (((axis_distance[0] < axis_distance[1]) as usize) << 2)
                + (((axis_distance[0] < axis_distance[2]) as usize) << 1)
                + ((axis_distance[1] < axis_distance[2]) as usize);
            let axis = AXIS_MAP[k];
            let t_max = axis_distance[axis];
            let flat = self.flat_index(cell_id[0] as u32, cell_id[1] as u32, cell_id[2] as u32);
            let bin_id = self.bin_indices[flat];
            if bin_id != 0
                && !on_hit(
                    &self.bins[bin_id as usize],
                    (t_max + hit_min) * (1.0 + 1.0e-5),
                )
            {
                return;
            }
            axis_distance[axis] += axis_delta[axis];
            cell_id[axis] += step[axis];
            if cell_id[axis] < 0 || cell_id[axis] >= self.bin_count[axis] as i32 {
                break;
            }
        }
    }

    /// Emits one bit per cell in linear index order: `1` for occupied or
    /// enclosed-void cells, `0` for void cells connected to open space
    /// outside the shape.
    ///
    /// Precondition (unchecked): the occupied cells form a closed,
    /// bubble-free shell. Interior/exterior classification is undefined
    /// when the shell is violated.
    pub fn to_bit_table(&self, out: &mut BitStream) {
        let total = self.total_bin_count as usize;
        let nx = self.bin_count[0] as i32;
        let ny = self.bin_count[1] as i32;
        let nz = self.bin_count[2] as i32;
        let flat_of = |x: i32, y: i32, z: i32| (x + y * nx + z * nx * ny) as usize;

        // Label 1 is reserved for occupied cells and never reclassified.
        let mut flags = vec![0u32; total];
        for flat in 0..total {
            if self.bin_indices[flat] != 0 {
                flags[flat] = 1;
            }
        }

        // Label connected components of empty cells, 6-connected, starting
        // at 2. Seeds are picked in fixed z,y,x scan order.
        let mut label = 1u32;
        loop {
            let mut seed = None;
            'scan: for dz in 0..nz {
                for dy in 0..ny {
                    for dx in 0..nx {
                        if flags[flat_of(dx, dy, dz)] == 0 {
                            seed = Some((dx, dy, dz));
                            break 'scan;
                        }
                    }
                }
            }
            let Some(start) = seed else { break };
            label += 1;
            let mut queue = std::collections::VecDeque::new();
            queue.push_back(start);
            while let Some((x, y, z)) = queue.pop_front() {
                if x < 0 || y < 0 || z < 0 || x >= nx || y >= ny || z >= nz {
                    continue;
                }
                let flat = flat_of(x, y, z);
                if flags[flat] != 0 {
                    continue;
                }
                flags[flat] = label;
                queue.push_back((x + 1, y, z));
                queue.push_back((x - 1, y, z));
                queue.push_back((x, y + 1, z));
                queue.push_back((x, y - 1, z));
                queue.push_back((x, y, z + 1));
                queue.push_back((x, y, z - 1));
            }
        }

        // Components touching the outer shell connect to open space.
        let mut exterior: HashSet<u32> = HashSet::new();
        for dz in 0..nz {
            for dy in 0..ny {
                for dx in 0..nx {
                    if dx == 0 || dx == nx - 1 || dy == 0 || dy == ny - 1 || dz == 0 || dz == nz - 1
                    {
                        let flag = flags[flat_of(dx, dy, dz)];
                        if flag != 1 {
                            exterior.insert(flag);
                        }
                    }
                }
            }
        }

        for dz in 0..nz {
            for dy in 0..ny {
                for dx in 0..nx {
                    let flag = flags[flat_of(dx, dy, dz)];
                    if flag != 0 && !exterior.contains(&flag) {
                        out.push_low_bit(1);
                    } else {
                        out.push_low_bit(0);
                    }
                }
            }
        }
        out.flush();
    }

    /// Flattens the grid into a [`PackedGrid`] arena.
    pub fn pack(&self) -> PackedGrid {
        let mut out = PackedGrid {
            arena_table: Vec::with_capacity(self.bin_indices.len() * 2),
            ids: vec![0],
            min: self.min,
            max: self.max,
            bin_count: self.bin_count,
            cell_size: self.cell_size,
        };
        for &bin_index in &self.bin_indices {
            if bin_index > 0 {
                let bin = &self.bins[bin_index as usize];
                out.arena_table.push(out.ids.len() as u32);
                out.arena_table.push(bin.len() as u32);
                out.ids.extend_from_slice(bin);
            } else {
                out.arena_table.push(0);
                out.arena_table.push(0);
            }
        }
        out
    }

    /// Appends outline segments for the domain box and every occupied
    /// cell; consecutive entries are segment endpoints.
    pub fn append_outline_lines(&self, lines: &mut Vec<Vec3>) {
        append_cube_outline(lines, self.min, self.max - self.min);
        let cell = Vec3::splat(self.cell_size);
        for dz in 0..self.bin_count[2] {
            for dy in 0..self.bin_count[1] {
                for dx in 0..self.bin_count[0] {
                    let flat = self.flat_index(dx, dy, dz);
                    if self.bin_indices[flat] != 0 {
                        let origin = self.min
                            + Vec3::new(
                                self.cell_size * dx as f32,
                                self.cell_size * dy as f32,
                                self.cell_size * dz as f32,
                            );
                        append_cube_outline(lines, origin, cell);
                    }
                }
            }
        }
    }

    /// Number of cells holding at least one id.
    pub fn occupied_cell_count(&self) -> usize {
        self.bin_indices.iter().filter(|&&b| b != 0).count()
    }
}
