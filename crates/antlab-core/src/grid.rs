use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Integer cell coordinate on the toroidal grid.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    /// Construct a new position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Square toroidal grid of colour indices stored row-major.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Grid {
    size: u32,
    cells: Vec<u8>,
}

impl Grid {
    /// Construct a `size * size` grid with every cell set to colour 0.
    pub fn new(size: u32) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::InvalidConfig(
                "grid dimensions must be non-zero",
            ));
        }
        Ok(Self {
            size,
            cells: vec![0; (size as usize) * (size as usize)],
        })
    }

    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Row-major cell storage.
    #[must_use]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Centre cell, where every episode starts.
    #[must_use]
    pub const fn center(&self) -> Position {
        Position::new(self.size / 2, self.size / 2)
    }

    #[inline]
    fn offset(&self, pos: Position) -> usize {
        (pos.y as usize) * (self.size as usize) + (pos.x as usize)
    }

    /// Colour at `pos`, or `None` when the coordinate lies outside the grid.
    #[must_use]
    pub fn get(&self, pos: Position) -> Option<u8> {
        if pos.x < self.size && pos.y < self.size {
            Some(self.cells[self.offset(pos)])
        } else {
            None
        }
    }

    /// Writes `color` at `pos`. Returns `false` when `pos` is out of range.
    pub fn set(&mut self, pos: Position, color: u8) -> bool {
        if pos.x < self.size && pos.y < self.size {
            let idx = self.offset(pos);
            self.cells[idx] = color;
            true
        } else {
            false
        }
    }

    /// Moves `pos` by `(dx, dy)`, wrapping both axes.
    #[must_use]
    pub fn wrap(&self, pos: Position, dx: i32, dy: i32) -> Position {
        let size = i64::from(self.size);
        let x = (i64::from(pos.x) + i64::from(dx)).rem_euclid(size);
        let y = (i64::from(pos.y) + i64::from(dy)).rem_euclid(size);
        Position::new(x as u32, y as u32)
    }

    /// Rewrites every cell holding `from` to `to`, returning how many changed.
    pub fn replace(&mut self, from: u8, to: u8) -> usize {
        let mut changed = 0;
        for cell in self.cells.iter_mut().filter(|cell| **cell == from) {
            *cell = to;
            changed += 1;
        }
        changed
    }

    /// Number of cells currently holding `color`.
    #[must_use]
    pub fn count(&self, color: u8) -> usize {
        self.cells.iter().filter(|&&cell| cell == color).count()
    }

    pub fn fill(&mut self, color: u8) {
        self.cells.fill(color);
    }

    /// Flattened copy with every colour clipped into `{0, 1}`.
    #[must_use]
    pub fn clipped(&self) -> Vec<u8> {
        self.cells.iter().map(|&cell| cell.min(1)).collect()
    }
}
