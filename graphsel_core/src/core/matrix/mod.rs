use itertools::Either;

use super::{
    element::{Element, ElementType, Scalar, Values, with_element_type},
    error::{Result, SelectError},
};

pub mod bitmap;
pub mod compressed;

pub use bitmap::BitmapStorage;
pub use compressed::CompressedStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixFormat {
    Compressed,
    Bitmap,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    Compressed(CompressedStorage),
    Bitmap(BitmapStorage),
}

/// A 2-D sparse matrix in compressed-row or bitmap form.
///
/// When `iso` is set the value store holds exactly one scalar shared by every
/// entry, regardless of how many entries exist.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    nrows: usize,
    ncols: usize,
    element_type: ElementType,
    storage: Storage,
    iso: bool,
}

/// Allocates `len` copies of `value`, reporting exhaustion instead of aborting.
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len)?;
    buffer.resize(len, value);
    Ok(buffer)
}

pub(crate) fn try_zeroed_values(element_type: ElementType, len: usize) -> Result<Values> {
    with_element_type!(element_type, T => Ok(T::wrap(try_filled(len, T::zero())?)))
}

pub(crate) fn slot_count(nrows: usize, ncols: usize) -> Result<usize> {
    nrows.checked_mul(ncols).ok_or_else(|| {
        SelectError::AllocationFailed(format!(
            "bitmap of {} x {} slots overflows the address space",
            nrows, ncols
        ))
    })
}

impl SparseMatrix {
    pub fn empty_compressed(nrows: usize, ncols: usize, element_type: ElementType) -> Result<Self> {
        Ok(Self {
            nrows,
            ncols,
            element_type,
            storage: Storage::Compressed(CompressedStorage {
                row_ptr: try_filled(nrows + 1, 0usize)?,
                col_index: Vec::new(),
                values: Values::empty(element_type),
            }),
            iso: false,
        })
    }

    pub fn empty_bitmap(nrows: usize, ncols: usize, element_type: ElementType) -> Result<Self> {
        let slots = slot_count(nrows, ncols)?;
        Ok(Self {
            nrows,
            ncols,
            element_type,
            storage: Storage::Bitmap(BitmapStorage {
                presence: try_filled(slots, false)?,
                values: try_zeroed_values(element_type, slots)?,
                valid_count: 0,
            }),
            iso: false,
        })
    }

    /// Builds a compressed matrix from raw CSR arrays, rejecting anything that
    /// breaks the row pointer or column ordering invariants.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_index: Vec<usize>,
        values: Values,
    ) -> Result<Self> {
        let matrix = Self {
            nrows,
            ncols,
            element_type: values.element_type(),
            storage: Storage::Compressed(CompressedStorage { row_ptr, col_index, values }),
            iso: false,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Compressed matrix whose entries all share `scalar`.
    pub fn iso_compressed(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_index: Vec<usize>,
        scalar: Scalar,
    ) -> Result<Self> {
        let matrix = Self {
            nrows,
            ncols,
            element_type: scalar.element_type(),
            storage: Storage::Compressed(CompressedStorage {
                row_ptr,
                col_index,
                values: Values::iso(scalar),
            }),
            iso: true,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    pub fn from_bitmap(nrows: usize, ncols: usize, presence: Vec<bool>, values: Values) -> Result<Self> {
        let valid_count = presence.iter().filter(|present| **present).count();
        let matrix = Self {
            nrows,
            ncols,
            element_type: values.element_type(),
            storage: Storage::Bitmap(BitmapStorage { presence, values, valid_count }),
            iso: false,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Assembles a matrix from storage the caller vouches for. Invariants are
    /// only checked in debug builds.
    pub fn from_parts_unchecked(
        nrows: usize,
        ncols: usize,
        element_type: ElementType,
        storage: Storage,
        iso: bool,
    ) -> Self {
        let matrix = Self { nrows, ncols, element_type, storage, iso };

        #[cfg(debug_assertions)]
        if let Err(error) = matrix.validate() {
            debug_assert!(false, "{}", error);
        }

        matrix
    }

    /// Builds a compressed matrix from `(row, col, value)` triplets in any
    /// order. Duplicate coordinates are rejected.
    pub fn from_triplets<T: Element>(nrows: usize, ncols: usize, triplets: &[(usize, usize, T)]) -> Result<Self> {
        let mut sorted = triplets.to_vec();
        sorted.sort_by_key(|(i, j, _)| (*i, *j));

        let mut row_ptr = try_filled(nrows + 1, 0usize)?;
        let mut col_index = Vec::new();
        col_index.try_reserve_exact(sorted.len())?;
        let mut values = Vec::new();
        values.try_reserve_exact(sorted.len())?;

        let mut previous: Option<(usize, usize)> = None;
        for (i, j, value) in sorted {
            if i >= nrows || j >= ncols {
                return Err(SelectError::MalformedMatrix(format!(
                    "entry ({}, {}) outside a {} x {} matrix",
                    i, j, nrows, ncols
                )));
            }
            if previous == Some((i, j)) {
                return Err(SelectError::MalformedMatrix(format!("duplicate entry ({}, {})", i, j)));
            }
            previous = Some((i, j));
            row_ptr[i + 1] += 1;
            col_index.push(j);
            values.push(value);
        }

        for i in 0..nrows {
            row_ptr[i + 1] += row_ptr[i];
        }

        Self::from_csr(nrows, ncols, row_ptr, col_index, T::wrap(values))
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub(crate) fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    /// Collapses the value store to the single shared `scalar`.
    pub(crate) fn mark_iso(&mut self, scalar: Scalar) {
        debug_assert_eq!(scalar.element_type(), self.element_type);
        let values = Values::iso(scalar);
        match &mut self.storage {
            Storage::Compressed(compressed) => compressed.values = values,
            Storage::Bitmap(bitmap) => bitmap.values = values,
        }
        self.iso = true;
    }

    pub fn format(&self) -> MatrixFormat {
        match self.storage {
            Storage::Compressed(_) => MatrixFormat::Compressed,
            Storage::Bitmap(_) => MatrixFormat::Bitmap,
        }
    }

    pub fn is_iso(&self) -> bool {
        self.iso
    }

    pub fn iso_value(&self) -> Option<Scalar> {
        if !self.iso {
            return None;
        }
        self.values().get(0)
    }

    pub fn values(&self) -> &Values {
        match &self.storage {
            Storage::Compressed(compressed) => &compressed.values,
            Storage::Bitmap(bitmap) => &bitmap.values,
        }
    }

    pub fn nnz(&self) -> usize {
        match &self.storage {
            Storage::Compressed(compressed) => compressed.nnz(),
            Storage::Bitmap(bitmap) => bitmap.valid_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nnz() == 0
    }

    fn value_at(&self, position: usize) -> Option<Scalar> {
        self.values().get(if self.iso { 0 } else { position })
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Scalar> {
        if row >= self.nrows || col >= self.ncols {
            return None;
        }

        match &self.storage {
            Storage::Compressed(compressed) => {
                let start = compressed.row_ptr[row];
                let end = compressed.row_ptr[row + 1];
                let position = compressed.col_index[start..end].binary_search(&col).ok()?;
                self.value_at(start + position)
            }
            Storage::Bitmap(bitmap) => {
                let slot = row * self.ncols + col;
                if bitmap.presence[slot] {
                    self.value_at(slot)
                } else {
                    None
                }
            }
        }
    }

    /// Every entry as `(row, col, value)` in row-major, ascending-column order.
    pub fn iter_entries(&self) -> impl Iterator<Item = (usize, usize, Scalar)> + '_ {
        match &self.storage {
            Storage::Compressed(compressed) => Either::Left((0..self.nrows).flat_map(move |i| {
                (compressed.row_ptr[i]..compressed.row_ptr[i + 1])
                    .filter_map(move |p| self.value_at(p).map(|value| (i, compressed.col_index[p], value)))
            })),
            Storage::Bitmap(bitmap) => Either::Right(
                bitmap
                    .presence
                    .iter()
                    .enumerate()
                    .filter(|(_, present)| **present)
                    .filter_map(move |(slot, _)| {
                        self.value_at(slot)
                            .map(|value| (slot / self.ncols, slot % self.ncols, value))
                    }),
            ),
        }
    }

    pub fn to_bitmap(&self) -> Result<SparseMatrix> {
        match &self.storage {
            Storage::Bitmap(_) => Ok(self.clone()),
            Storage::Compressed(compressed) => {
                let bitmap = with_element_type!(self.element_type, T => {
                    compressed.to_bitmap_typed::<T>(self.nrows, self.ncols, self.iso)?
                });
                Ok(Self::from_parts_unchecked(
                    self.nrows,
                    self.ncols,
                    self.element_type,
                    Storage::Bitmap(bitmap),
                    self.iso,
                ))
            }
        }
    }

    pub fn to_compressed(&self) -> Result<SparseMatrix> {
        match &self.storage {
            Storage::Compressed(_) => Ok(self.clone()),
            Storage::Bitmap(bitmap) => {
                let compressed = with_element_type!(self.element_type, T => {
                    bitmap.to_compressed_typed::<T>(self.nrows, self.ncols, self.iso)?
                });
                Ok(Self::from_parts_unchecked(
                    self.nrows,
                    self.ncols,
                    self.element_type,
                    Storage::Compressed(compressed),
                    self.iso,
                ))
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.values().element_type() != self.element_type {
            return Err(SelectError::TypeMismatch {
                expected: self.element_type,
                found: self.values().element_type(),
            });
        }

        if self.iso && self.values().len() != 1 {
            return Err(SelectError::MalformedMatrix(format!(
                "iso matrix must hold exactly one value, found {}",
                self.values().len()
            )));
        }

        match &self.storage {
            Storage::Compressed(compressed) => compressed.validate(self.nrows, self.ncols, self.iso),
            Storage::Bitmap(bitmap) => bitmap.validate(self.nrows, self.ncols, self.iso),
        }
    }
}
