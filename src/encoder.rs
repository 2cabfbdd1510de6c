//! Mixed-radix encoding of grid cells (states) and grid vertices.
//!
//! A state is a vector of per-variable cell indices; its id is the mixed-radix number whose
//! digit `i` is the cell index along variable `i` (radix: number of cells of that variable).
//! Vertices are encoded the same way over threshold indices (radix: number of thresholds).
//! The vertices of a cell are addressed by a bitmask: bit `i` set selects the upper
//! threshold of the cell along variable `i`.

use crate::error::{Error, Result};
use crate::model::OdeModel;

/// One step along a dimension.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct NodeEncoder {
    cells: Vec<usize>,
    thresholds: Vec<usize>,
    node_multipliers: Vec<usize>,
    vertex_multipliers: Vec<usize>,
    state_count: usize,
    vertex_count: usize,
}

impl NodeEncoder {
    pub fn new(model: &OdeModel) -> Self {
        let thresholds: Vec<usize> = model.variables().iter().map(|v| v.thresholds.len()).collect();
        Self::from_threshold_counts(&thresholds)
    }

    /// Creates an encoder for a grid with the given number of thresholds per dimension.
    ///
    /// # Panics
    ///
    /// Panics if some dimension has fewer than two thresholds.
    pub fn from_threshold_counts(thresholds: &[usize]) -> Self {
        assert!(
            thresholds.iter().all(|&t| t >= 2),
            "Every dimension needs at least two thresholds"
        );
        let cells: Vec<usize> = thresholds.iter().map(|&t| t - 1).collect();

        let mut node_multipliers = Vec::with_capacity(cells.len());
        let mut state_count = 1;
        for &c in &cells {
            node_multipliers.push(state_count);
            state_count *= c;
        }

        let mut vertex_multipliers = Vec::with_capacity(thresholds.len());
        let mut vertex_count = 1;
        for &t in thresholds {
            vertex_multipliers.push(vertex_count);
            vertex_count *= t;
        }

        Self {
            cells,
            thresholds: thresholds.to_vec(),
            node_multipliers,
            vertex_multipliers,
            state_count,
            vertex_count,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.cells.len()
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Number of cells along `dim`.
    pub fn cells(&self, dim: usize) -> usize {
        self.cells[dim]
    }

    pub fn check_state(&self, state: usize) -> Result<()> {
        if state < self.state_count {
            Ok(())
        } else {
            Err(Error::StateOutOfRange {
                state,
                count: self.state_count,
            })
        }
    }

    /// Packs cell coordinates into a state id.
    pub fn encode(&self, coordinates: &[usize]) -> Result<usize> {
        if coordinates.len() != self.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions(),
                found: coordinates.len(),
            });
        }
        let mut id = 0;
        for (dim, &c) in coordinates.iter().enumerate() {
            if c >= self.cells[dim] {
                return Err(Error::CoordinateOutOfRange {
                    dimension: dim,
                    value: c,
                    bound: self.cells[dim],
                });
            }
            id += c * self.node_multipliers[dim];
        }
        Ok(id)
    }

    /// Unpacks a state id into cell coordinates.
    pub fn decode(&self, state: usize) -> Result<Vec<usize>> {
        self.check_state(state)?;
        Ok((0..self.dimensions()).map(|dim| self.coordinate(state, dim)).collect())
    }

    /// Cell index of `state` along `dim`.
    pub fn coordinate(&self, state: usize, dim: usize) -> usize {
        (state / self.node_multipliers[dim]) % self.cells[dim]
    }

    /// Threshold index of `vertex` along `dim`.
    pub fn vertex_coordinate(&self, vertex: usize, dim: usize) -> usize {
        (vertex / self.vertex_multipliers[dim]) % self.thresholds[dim]
    }

    /// The corner of `state` selected by `mask` (bit `i` set = upper threshold along `i`).
    pub fn vertex(&self, state: usize, mask: usize) -> usize {
        debug_assert!(state < self.state_count);
        (0..self.dimensions())
            .map(|dim| {
                let c = self.coordinate(state, dim) + ((mask >> dim) & 1);
                c * self.vertex_multipliers[dim]
            })
            .sum()
    }

    pub fn higher_node(&self, state: usize, dim: usize) -> Option<usize> {
        if self.coordinate(state, dim) + 1 < self.cells[dim] {
            Some(state + self.node_multipliers[dim])
        } else {
            None
        }
    }

    pub fn lower_node(&self, state: usize, dim: usize) -> Option<usize> {
        if self.coordinate(state, dim) > 0 {
            Some(state - self.node_multipliers[dim])
        } else {
            None
        }
    }

    /// The adjacent cell one step along `dim`, or `None` at the grid boundary.
    pub fn neighbor(&self, state: usize, dim: usize, direction: Direction) -> Option<usize> {
        match direction {
            Direction::Up => self.higher_node(state, dim),
            Direction::Down => self.lower_node(state, dim),
        }
    }
}
