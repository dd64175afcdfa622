use crate::core::{
    element::{Element, Values},
    error::{Result, SelectError},
};

use super::{CompressedStorage, slot_count, try_filled};

/// Dense presence flags plus a parallel value array, addressed row-major
/// (`slot = row * ncols + col`).
#[derive(Debug, Clone, PartialEq)]
pub struct BitmapStorage {
    pub presence: Vec<bool>,
    pub values: Values,
    pub valid_count: usize,
}

impl BitmapStorage {
    pub(crate) fn validate(&self, nrows: usize, ncols: usize, iso: bool) -> Result<()> {
        let slots = slot_count(nrows, ncols)?;

        if self.presence.len() != slots {
            return Err(SelectError::MalformedMatrix(format!(
                "bitmap has {} presence flags, expected {}",
                self.presence.len(),
                slots
            )));
        }

        if !iso && self.values.len() != slots {
            return Err(SelectError::MalformedMatrix(format!(
                "bitmap has {} values, expected {}",
                self.values.len(),
                slots
            )));
        }

        let present = self.presence.iter().filter(|flag| **flag).count();
        if present != self.valid_count {
            return Err(SelectError::MalformedMatrix(format!(
                "valid_count is {} but {} presence flags are set",
                self.valid_count, present
            )));
        }

        Ok(())
    }

    pub(crate) fn to_compressed_typed<T: Element>(
        &self,
        nrows: usize,
        ncols: usize,
        iso: bool,
    ) -> Result<CompressedStorage> {
        let mut row_ptr = try_filled(nrows + 1, 0usize)?;
        let mut col_index = Vec::new();
        col_index.try_reserve_exact(self.valid_count)?;

        let source = T::slice(&self.values).unwrap_or(&[]);
        let mut values = Vec::new();
        if !iso {
            values.try_reserve_exact(self.valid_count)?;
        }

        for row in 0..nrows {
            let base = row * ncols;
            for col in 0..ncols {
                if self.presence[base + col] {
                    col_index.push(col);
                    if !iso {
                        values.push(source[base + col]);
                    }
                }
            }
            row_ptr[row + 1] = col_index.len();
        }

        Ok(CompressedStorage {
            row_ptr,
            col_index,
            values: if iso { self.values.clone() } else { T::wrap(values) },
        })
    }
}
