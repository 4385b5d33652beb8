use crate::foundation::error::{CompositeError, CompositeResult};

/// Factor `count` into `(rows, cols)` with `rows * cols == count`, `cols >= rows`, and the two
/// factors as close as possible.
///
/// Starts at `floor(sqrt(count))` and walks down to the first divisor, so primes degrade to a
/// `1 x count` strip and `1` yields `1 x 1`.
pub fn closest_factors(count: usize) -> CompositeResult<(usize, usize)> {
    if count == 0 {
        return Err(CompositeError::validation(
            "process count must be >= 1 to build a grid",
        ));
    }

    let mut rows = count.isqrt();
    while rows > 1 && count % rows != 0 {
        rows -= 1;
    }
    Ok((rows, count / rows))
}

/// Rows-by-columns decomposition of the global viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    /// Number of tile rows.
    pub rows: usize,
    /// Number of tile columns.
    pub cols: usize,
}

impl TileGrid {
    /// Grid for `count` processes, see [`closest_factors`].
    pub fn for_count(count: usize) -> CompositeResult<Self> {
        let (rows, cols) = closest_factors(count)?;
        Ok(Self { rows, cols })
    }

    /// Number of cells.
    pub fn len(self) -> usize {
        self.rows * self.cols
    }

    /// Always `false`; grids have at least one cell.
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// `(column, row)` of a rank, rows counted from the top.
    pub fn cell_of(self, rank: usize) -> (usize, usize) {
        (rank % self.cols, rank / self.cols)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/topology/grid.rs"]
mod tests;
