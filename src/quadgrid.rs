//! Hierarchical Quad-Grid
//!
//! A tower of uniform grids over the world extents. Level 0 is the whole
//! world as a single cell; each deeper level halves the cell side and
//! quadruples the cell count, stopping at [`MIN_CELL_SIZE`] (or the
//! [`MAX_CELLS`] storage cap). Every body is placed in exactly one cell of
//! the level whose cell side best matches its bounding box, so a 3x3
//! neighborhood per level bounds the broadphase query cost regardless of
//! how disparate body sizes are.
//!
//! # How It Works
//!
//! All levels live in one flat `cells` array; `level_base[i]` is the start
//! of level i, and cell `(x, y)` of level i sits at
//! `level_base[i] + y * 2^i + x`. A per-level occupancy flag lets queries
//! skip levels with no bodies at all.
//!
//! Author: Moroya Sakamoto

/// Maximum number of cells across all levels.
pub const MAX_CELLS: usize = 1 << 18;

/// Default minimum cell side in world units; subdivision stops below it.
pub const MIN_CELL_SIZE: u32 = 16;

/// Multi-level uniform grid for the broadphase.
pub struct QuadGrid {
    /// Smallest power of two covering the world extents.
    length: u32,
    /// Start index of each level in the flat `cells` array.
    level_base: Vec<usize>,
    /// Whether any body is placed at this level.
    occupied: Vec<bool>,
    /// Flat per-cell occupant lists; capacity is retained across clears.
    cells: Vec<Vec<usize>>,
}

impl QuadGrid {
    /// Create a grid covering `world_size` world units.
    ///
    /// Levels are appended while the cell side stays at or above
    /// `cell_limit` and the running cell total fits in [`MAX_CELLS`].
    /// At least one level (the whole world) always exists.
    #[must_use]
    pub fn new(world_size: u32, cell_limit: u32) -> Self {
        let limit = cell_limit.max(1);
        let mut length = 1u32;
        while length < world_size {
            length <<= 1;
        }

        let mut level_base = Vec::new();
        let mut base = 0usize;
        let mut count = 1usize;
        let mut side = length;
        while side >= limit && base + count <= MAX_CELLS {
            level_base.push(base);
            base += count;
            count *= 4;
            side >>= 1;
        }
        if level_base.is_empty() {
            level_base.push(0);
            base = 1;
        }

        Self {
            length,
            occupied: vec![false; level_base.len()],
            cells: vec![Vec::new(); base],
            level_base,
        }
    }

    /// Power-of-two side length of the whole grid.
    #[inline]
    #[must_use]
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Number of levels in the tower.
    #[inline]
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.level_base.len()
    }

    /// Total number of cells across all levels.
    #[inline]
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Cell side length at a level.
    #[inline]
    #[must_use]
    pub fn cell_side(&self, level: usize) -> u32 {
        self.length >> level
    }

    /// Deepest level whose cell side still covers an object of `size`.
    ///
    /// Iterative descent: halve the side while the next level would still
    /// fit the object, capped at the deepest level.
    #[must_use]
    pub fn level_for(&self, size: f32) -> usize {
        let mut level = 0;
        let mut curr = self.length;
        while level + 1 < self.level_base.len() && (curr >> 1) as f32 >= size {
            curr >>= 1;
            level += 1;
        }
        level
    }

    /// World position to cell coordinates at a level.
    ///
    /// Floors toward negative infinity, so positions left of or below the
    /// grid produce negative coordinates (rejected by [`cell_index`]),
    /// not coordinates truncated onto cell 0.
    ///
    /// [`cell_index`]: QuadGrid::cell_index
    #[inline]
    #[must_use]
    pub fn grid_coord(&self, level: usize, x: f32, y: f32) -> (i64, i64) {
        let side = self.cell_side(level) as f32;
        ((x / side).floor() as i64, (y / side).floor() as i64)
    }

    /// Flat index of cell `(gx, gy)` at a level, or `None` when the
    /// coordinates fall outside the level bounds.
    #[inline]
    #[must_use]
    pub fn cell_index(&self, level: usize, gx: i64, gy: i64) -> Option<usize> {
        let count = 1i64 << level;
        if gx < 0 || gx >= count || gy < 0 || gy >= count {
            return None;
        }
        Some(self.level_base[level] + gy as usize * count as usize + gx as usize)
    }

    /// Occupant ids of a cell.
    #[inline]
    #[must_use]
    pub fn cell(&self, index: usize) -> &[usize] {
        &self.cells[index]
    }

    /// Whether any body is placed at a level.
    #[inline]
    #[must_use]
    pub fn is_level_occupied(&self, level: usize) -> bool {
        self.occupied[level]
    }

    /// Insert a body id into a cell and mark its level occupied.
    pub(crate) fn insert(&mut self, index: usize, level: usize, id: usize) {
        self.cells[index].push(id);
        self.occupied[level] = true;
    }

    /// Empty a cell, retaining its allocation.
    pub(crate) fn clear_cell(&mut self, index: usize) {
        self.cells[index].clear();
    }

    /// Drop all occupancy flags.
    pub(crate) fn clear_occupancy(&mut self) {
        for flag in &mut self.occupied {
            *flag = false;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
