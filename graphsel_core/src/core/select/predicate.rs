use crate::core::element::Element;

/// Keep/drop decision for a single entry.
///
/// Implementations are small `Copy` values so each (operator, type) pair gets
/// its own monomorphized phase loop. They must stay pure: the same predicate
/// is evaluated concurrently from every task.
pub trait EntryPredicate<T: Element>: Copy + Send + Sync {
    /// `false` for predicates that only look at coordinates, letting the
    /// kernels skip the value load.
    const READS_VALUE: bool = true;

    fn keep(&self, row: usize, col: usize, value: T) -> bool;
}

macro_rules! thunk_predicate {
    ($($name:ident => $op:tt),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy)]
            pub struct $name<T> {
                pub thunk: T,
            }

            impl<T: Element> EntryPredicate<T> for $name<T> {
                #[inline(always)]
                fn keep(&self, _row: usize, _col: usize, value: T) -> bool {
                    value $op self.thunk
                }
            }
        )*
    };
}

thunk_predicate!(
    EqThunk => ==,
    NeThunk => !=,
    GtThunk => >,
    GeThunk => >=,
    LtThunk => <,
    LeThunk => <=,
);

macro_rules! zero_predicate {
    ($($name:ident => $op:tt),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $name;

            impl<T: Element> EntryPredicate<T> for $name {
                #[inline(always)]
                fn keep(&self, _row: usize, _col: usize, value: T) -> bool {
                    value $op T::zero()
                }
            }
        )*
    };
}

zero_predicate!(
    NonZero => !=,
    EqZero => ==,
    GtZero => >,
    GeZero => >=,
    LtZero => <,
    LeZero => <=,
);

macro_rules! positional_predicate {
    ($($name:ident => |$row:ident, $col:ident, $k:ident| $body:expr),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy)]
            pub struct $name {
                pub k: i64,
            }

            impl<T: Element> EntryPredicate<T> for $name {
                const READS_VALUE: bool = false;

                #[inline(always)]
                fn keep(&self, $row: usize, $col: usize, _value: T) -> bool {
                    let $k = self.k;
                    $body
                }
            }
        )*
    };
}

positional_predicate!(
    Tril => |row, col, k| (col as i64 - row as i64) <= k,
    Triu => |row, col, k| (col as i64 - row as i64) >= k,
    Diag => |row, col, k| (col as i64 - row as i64) == k,
    OffDiag => |row, col, k| (col as i64 - row as i64) != k,
    RowLe => |row, _col, k| (row as i64) <= k,
    RowGt => |row, _col, k| (row as i64) > k,
    ColLe => |_row, col, k| (col as i64) <= k,
    ColGt => |_row, col, k| (col as i64) > k,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn keeps<P: EntryPredicate<i32>>(predicate: P, row: usize, col: usize, value: i32) -> bool {
        predicate.keep(row, col, value)
    }

    #[test]
    fn test_thunk_comparisons() {
        assert!(keeps(EqThunk { thunk: 3 }, 0, 0, 3));
        assert!(!keeps(EqThunk { thunk: 3 }, 0, 0, 4));
        assert!(keeps(NeThunk { thunk: 3 }, 0, 0, 4));
        assert!(keeps(GtThunk { thunk: 3 }, 0, 0, 4));
        assert!(!keeps(GtThunk { thunk: 3 }, 0, 0, 3));
        assert!(keeps(GeThunk { thunk: 3 }, 0, 0, 3));
        assert!(keeps(LtThunk { thunk: 3 }, 0, 0, -1));
        assert!(keeps(LeThunk { thunk: 3 }, 0, 0, 3));
    }

    #[test]
    fn test_zero_comparisons() {
        assert!(keeps(NonZero, 0, 0, -2));
        assert!(!keeps(NonZero, 0, 0, 0));
        assert!(keeps(EqZero, 0, 0, 0));
        assert!(keeps(GtZero, 0, 0, 1));
        assert!(keeps(GeZero, 0, 0, 0));
        assert!(keeps(LtZero, 0, 0, -1));
        assert!(keeps(LeZero, 0, 0, 0));
        assert!(!keeps(LeZero, 0, 0, 1));
    }

    #[test]
    fn test_positional_predicates_ignore_value() {
        assert!(keeps(Tril { k: 0 }, 2, 1, 99));
        assert!(keeps(Tril { k: 0 }, 2, 2, 99));
        assert!(!keeps(Tril { k: 0 }, 1, 2, 99));
        assert!(keeps(Triu { k: 1 }, 1, 2, 0));
        assert!(!keeps(Triu { k: 1 }, 2, 2, 0));
        assert!(keeps(Diag { k: -1 }, 3, 2, 0));
        assert!(keeps(OffDiag { k: 0 }, 3, 2, 0));
        assert!(!keeps(OffDiag { k: 0 }, 2, 2, 0));
        assert!(keeps(RowLe { k: 1 }, 1, 9, 0));
        assert!(!keeps(RowLe { k: -1 }, 0, 0, 0));
        assert!(keeps(RowGt { k: 1 }, 2, 0, 0));
        assert!(keeps(ColLe { k: 4 }, 9, 4, 0));
        assert!(keeps(ColGt { k: 4 }, 0, 5, 0));
        assert!(!<Tril as EntryPredicate<i32>>::READS_VALUE);
        assert!(<EqThunk<i32> as EntryPredicate<i32>>::READS_VALUE);
    }

    #[test]
    fn test_float_nan_never_matches() {
        let nan = f64::NAN;
        assert!(!EqThunk { thunk: nan }.keep(0, 0, nan));
        assert!(NeThunk { thunk: nan }.keep(0, 0, nan));
        assert!(!GtZero.keep(0, 0, nan));
        assert!(!EqZero.keep(0, 0, nan));
        assert!(EqZero.keep(0, 0, -0.0f64));
    }

    #[test]
    fn test_exact_integer_semantics() {
        assert!(!GtThunk { thunk: 127i8 }.keep(0, 0, 127i8));
        assert!(!LtThunk { thunk: 0u8 }.keep(0, 0, 0u8));
        assert!(GtThunk { thunk: false }.keep(0, 0, true));
    }
}
