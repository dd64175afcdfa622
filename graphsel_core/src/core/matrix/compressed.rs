use itertools::Itertools;

use crate::core::{
    element::{Element, Values},
    error::{Result, SelectError},
};

use super::{BitmapStorage, slot_count, try_filled};

/// Compressed sparse row storage.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedStorage {
    /// `nrows + 1` offsets into `col_index`, starting at zero.
    pub row_ptr: Vec<usize>,
    pub col_index: Vec<usize>,
    /// Aligned with `col_index`, or a single value for iso matrices.
    pub values: Values,
}

impl CompressedStorage {
    #[inline]
    pub fn nnz(&self) -> usize {
        self.row_ptr.last().copied().unwrap_or(0)
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[usize] {
        &self.col_index[self.row_ptr[row]..self.row_ptr[row + 1]]
    }

    pub(crate) fn validate(&self, nrows: usize, ncols: usize, iso: bool) -> Result<()> {
        if self.row_ptr.len() != nrows + 1 {
            return Err(SelectError::MalformedMatrix(format!(
                "row_ptr has {} offsets, expected {}",
                self.row_ptr.len(),
                nrows + 1
            )));
        }

        if self.row_ptr[0] != 0 {
            return Err(SelectError::MalformedMatrix("row_ptr must start at 0".to_string()));
        }

        if let Some((row, _)) = self
            .row_ptr
            .iter()
            .tuple_windows()
            .find_position(|(start, end)| start > end)
        {
            return Err(SelectError::MalformedMatrix(format!(
                "row_ptr decreases at row {}",
                row
            )));
        }

        if self.nnz() != self.col_index.len() {
            return Err(SelectError::MalformedMatrix(format!(
                "row_ptr records {} entries but col_index holds {}",
                self.nnz(),
                self.col_index.len()
            )));
        }

        if !iso && self.values.len() != self.col_index.len() {
            return Err(SelectError::MalformedMatrix(format!(
                "{} values for {} entries",
                self.values.len(),
                self.col_index.len()
            )));
        }

        for row in 0..nrows {
            let columns = self.row(row);
            if columns.iter().tuple_windows().any(|(a, b)| a >= b) {
                return Err(SelectError::MalformedMatrix(format!(
                    "column indices of row {} are not strictly increasing",
                    row
                )));
            }
            if let Some(col) = columns.last() {
                if *col >= ncols {
                    return Err(SelectError::MalformedMatrix(format!(
                        "column {} of row {} is outside {} columns",
                        col, row, ncols
                    )));
                }
            }
        }

        Ok(())
    }

    pub(crate) fn to_bitmap_typed<T: Element>(&self, nrows: usize, ncols: usize, iso: bool) -> Result<BitmapStorage> {
        let slots = slot_count(nrows, ncols)?;
        let mut presence = try_filled(slots, false)?;

        let source = T::slice(&self.values).unwrap_or(&[]);

        let values = if iso {
            self.values.clone()
        } else {
            let mut dense = try_filled(slots, T::zero())?;
            for row in 0..nrows {
                for p in self.row_ptr[row]..self.row_ptr[row + 1] {
                    let slot = row * ncols + self.col_index[p];
                    dense[slot] = source[p];
                }
            }
            T::wrap(dense)
        };

        for row in 0..nrows {
            for col in self.row(row) {
                presence[row * ncols + col] = true;
            }
        }

        Ok(BitmapStorage {
            presence,
            values,
            valid_count: self.nnz(),
        })
    }
}
