use rand::{Rng, SeedableRng, rngs::StdRng, seq::index};

use super::{
    element::{Element, ElementType, Scalar, with_element_type},
    error::{Result, SelectError},
    matrix::{MatrixFormat, SparseMatrix, try_filled},
    select::{SelectOp, SelectOpKind},
};

/// Converts a small signed integer into a value of `element_type`. Unsigned
/// types take the magnitude, `Bool` is `value != 0`.
pub fn small_scalar(element_type: ElementType, value: i64) -> Scalar {
    match element_type {
        ElementType::Bool => Scalar::Bool(value != 0),
        ElementType::I8 => Scalar::I8(value as i8),
        ElementType::I16 => Scalar::I16(value as i16),
        ElementType::I32 => Scalar::I32(value as i32),
        ElementType::I64 => Scalar::I64(value),
        ElementType::U8 => Scalar::U8(value.unsigned_abs() as u8),
        ElementType::U16 => Scalar::U16(value.unsigned_abs() as u16),
        ElementType::U32 => Scalar::U32(value.unsigned_abs() as u32),
        ElementType::U64 => Scalar::U64(value.unsigned_abs()),
        ElementType::F32 => Scalar::F32(value as f32),
        ElementType::F64 => Scalar::F64(value as f64),
    }
}

/// Random compressed matrix where each row holds about `density * ncols`
/// entries drawn from `-4..=4`. The same seed always yields the same matrix.
pub fn random_matrix(
    nrows: usize,
    ncols: usize,
    density: f64,
    element_type: ElementType,
    format: MatrixFormat,
    seed: u64,
) -> Result<SparseMatrix> {
    if !(0.0..=1.0).contains(&density) {
        return Err(SelectError::InvalidArgument(format!(
            "density must be within 0.0 and 1.0, got {}",
            density
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let compressed = with_element_type!(element_type, T => random_compressed::<T>(&mut rng, nrows, ncols, density)?);

    match format {
        MatrixFormat::Compressed => Ok(compressed),
        MatrixFormat::Bitmap => compressed.to_bitmap(),
    }
}

fn random_compressed<T: Element>(rng: &mut StdRng, nrows: usize, ncols: usize, density: f64) -> Result<SparseMatrix> {
    let expected = density * ncols as f64;

    let mut row_ptr = try_filled(nrows + 1, 0usize)?;
    let mut col_index = Vec::new();
    let mut values = Vec::new();

    for row in 0..nrows {
        let mut count = expected.floor() as usize;
        if rng.random_bool(expected.fract()) {
            count += 1;
        }
        let count = count.min(ncols);

        let mut columns = index::sample(rng, ncols, count).into_vec();
        columns.sort_unstable();

        for col in columns {
            let value = small_scalar(T::ELEMENT_TYPE, rng.random_range(-4..=4));
            col_index.push(col);
            values.push(T::from_scalar(&value).unwrap_or_default());
        }
        row_ptr[row + 1] = col_index.len();
    }

    SparseMatrix::from_csr(nrows, ncols, row_ptr, col_index, T::wrap(values))
}

/// One full row followed by rows holding a single entry each. Entries are
/// `row + col` so every value is distinct per row.
pub fn dense_row_matrix(nrows: usize, ncols: usize, dense_row: usize) -> Result<SparseMatrix> {
    let mut triplets = Vec::new();
    for row in 0..nrows {
        if row == dense_row {
            triplets.extend((0..ncols).map(|col| (row, col, (row + col) as i64)));
        } else if ncols > 0 {
            let col = row % ncols;
            triplets.push((row, col, (row + col) as i64));
        }
    }

    SparseMatrix::from_triplets(nrows, ncols, &triplets)
}

/// Straightforward scan of every entry, used as the ground truth the
/// parallel kernels are checked against.
pub fn reference_select(matrix: &SparseMatrix, op: &SelectOp, thunk: &Scalar) -> Vec<(usize, usize, Scalar)> {
    let zero = Scalar::zero(matrix.element_type());
    let k = match thunk {
        Scalar::I64(k) => *k,
        _ => 0,
    };

    matrix
        .iter_entries()
        .filter(|(row, col, value)| {
            let offset = *col as i64 - *row as i64;
            match op.kind {
                SelectOpKind::Tril => offset <= k,
                SelectOpKind::Triu => offset >= k,
                SelectOpKind::Diag => offset == k,
                SelectOpKind::OffDiag => offset != k,
                SelectOpKind::RowLe => (*row as i64) <= k,
                SelectOpKind::RowGt => (*row as i64) > k,
                SelectOpKind::ColLe => (*col as i64) <= k,
                SelectOpKind::ColGt => (*col as i64) > k,
                SelectOpKind::NonZero => *value != zero,
                SelectOpKind::EqZero => *value == zero,
                SelectOpKind::GtZero => *value > zero,
                SelectOpKind::GeZero => *value >= zero,
                SelectOpKind::LtZero => *value < zero,
                SelectOpKind::LeZero => *value <= zero,
                SelectOpKind::EqThunk => value == thunk,
                SelectOpKind::NeThunk => value != thunk,
                SelectOpKind::GtThunk => value > thunk,
                SelectOpKind::GeThunk => value >= thunk,
                SelectOpKind::LtThunk => value < thunk,
                SelectOpKind::LeThunk => value <= thunk,
            }
        })
        .collect()
}

/// The thunk the CLI and the tests use for `op`: `k` for positional
/// operators, `value` converted to the element type otherwise.
pub fn thunk_for(op: &SelectOp, value: i64) -> Scalar {
    small_scalar(op.thunk_type(), value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_matrix_is_deterministic() {
        let a = random_matrix(50, 40, 0.1, ElementType::I16, MatrixFormat::Compressed, 7).unwrap();
        let b = random_matrix(50, 40, 0.1, ElementType::I16, MatrixFormat::Compressed, 7).unwrap();
        assert_eq!(a, b);
        assert!(a.validate().is_ok());
        assert!(a.nnz() > 0);
    }

    #[test]
    fn test_random_bitmap_has_same_entries() {
        let compressed = random_matrix(20, 20, 0.3, ElementType::F32, MatrixFormat::Compressed, 3).unwrap();
        let bitmap = random_matrix(20, 20, 0.3, ElementType::F32, MatrixFormat::Bitmap, 3).unwrap();
        assert_eq!(bitmap.format(), MatrixFormat::Bitmap);
        assert_eq!(
            compressed.iter_entries().collect::<Vec<_>>(),
            bitmap.iter_entries().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_density_is_validated() {
        assert!(random_matrix(2, 2, 1.5, ElementType::U8, MatrixFormat::Compressed, 0).is_err());
        let full = random_matrix(3, 4, 1.0, ElementType::U8, MatrixFormat::Compressed, 0).unwrap();
        assert_eq!(full.nnz(), 12);
    }

    #[test]
    fn test_dense_row_layout() {
        let matrix = dense_row_matrix(5, 8, 2).unwrap();
        assert_eq!(matrix.nnz(), 8 + 4);
        assert_eq!(matrix.get(2, 7), Some(Scalar::I64(9)));
    }

    #[test]
    fn test_reference_select_positional() {
        let matrix = dense_row_matrix(3, 3, 0).unwrap();
        let op = SelectOp::new(SelectOpKind::Triu, ElementType::I64);
        let kept = reference_select(&matrix, &op, &Scalar::I64(1));
        assert_eq!(kept, vec![(0, 1, Scalar::I64(1)), (0, 2, Scalar::I64(2))]);
    }
}
