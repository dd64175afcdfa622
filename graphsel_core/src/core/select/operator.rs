use std::fmt::Display;

use crate::core::{
    element::{ElementType, Scalar},
    error::{Result, SelectError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectOpKind {
    // Positional: compare the entry's (row, col) against an i64 thunk `k`.
    Tril,
    Triu,
    Diag,
    OffDiag,
    RowLe,
    RowGt,
    ColLe,
    ColGt,
    // Value against zero of the element type.
    NonZero,
    EqZero,
    GtZero,
    GeZero,
    LtZero,
    LeZero,
    // Value against the thunk.
    EqThunk,
    NeThunk,
    GtThunk,
    GeThunk,
    LtThunk,
    LeThunk,
}

impl SelectOpKind {
    pub const ALL: [SelectOpKind; 20] = [
        SelectOpKind::Tril,
        SelectOpKind::Triu,
        SelectOpKind::Diag,
        SelectOpKind::OffDiag,
        SelectOpKind::RowLe,
        SelectOpKind::RowGt,
        SelectOpKind::ColLe,
        SelectOpKind::ColGt,
        SelectOpKind::NonZero,
        SelectOpKind::EqZero,
        SelectOpKind::GtZero,
        SelectOpKind::GeZero,
        SelectOpKind::LtZero,
        SelectOpKind::LeZero,
        SelectOpKind::EqThunk,
        SelectOpKind::NeThunk,
        SelectOpKind::GtThunk,
        SelectOpKind::GeThunk,
        SelectOpKind::LtThunk,
        SelectOpKind::LeThunk,
    ];

    /// Positional operators look at the entry's coordinates, never its value.
    pub fn is_positional(&self) -> bool {
        matches!(
            self,
            SelectOpKind::Tril
                | SelectOpKind::Triu
                | SelectOpKind::Diag
                | SelectOpKind::OffDiag
                | SelectOpKind::RowLe
                | SelectOpKind::RowGt
                | SelectOpKind::ColLe
                | SelectOpKind::ColGt
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            SelectOpKind::Tril => "tril",
            SelectOpKind::Triu => "triu",
            SelectOpKind::Diag => "diag",
            SelectOpKind::OffDiag => "offdiag",
            SelectOpKind::RowLe => "rowle",
            SelectOpKind::RowGt => "rowgt",
            SelectOpKind::ColLe => "colle",
            SelectOpKind::ColGt => "colgt",
            SelectOpKind::NonZero => "nonzero",
            SelectOpKind::EqZero => "eq_zero",
            SelectOpKind::GtZero => "gt_zero",
            SelectOpKind::GeZero => "ge_zero",
            SelectOpKind::LtZero => "lt_zero",
            SelectOpKind::LeZero => "le_zero",
            SelectOpKind::EqThunk => "eq_thunk",
            SelectOpKind::NeThunk => "ne_thunk",
            SelectOpKind::GtThunk => "gt_thunk",
            SelectOpKind::GeThunk => "ge_thunk",
            SelectOpKind::LtThunk => "lt_thunk",
            SelectOpKind::LeThunk => "le_thunk",
        }
    }

    pub fn from_name(name: &str) -> Result<SelectOpKind> {
        let lowered = name.trim().to_ascii_lowercase();
        SelectOpKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == lowered)
            .ok_or_else(|| SelectError::InvalidArgument(format!("Unknown select operator: {}", name)))
    }
}

impl Display for SelectOpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Operator descriptor resolved once per selection call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectOp {
    pub kind: SelectOpKind,
    pub element_type: ElementType,
}

impl SelectOp {
    pub fn new(kind: SelectOpKind, element_type: ElementType) -> Self {
        Self { kind, element_type }
    }

    /// Type of the thunk this operator accepts.
    pub fn thunk_type(&self) -> ElementType {
        if self.kind.is_positional() {
            ElementType::I64
        } else {
            self.element_type
        }
    }

    /// Rejects a matrix or thunk whose type does not match the descriptor.
    pub fn check(&self, matrix_type: ElementType, thunk: &Scalar) -> Result<()> {
        if matrix_type != self.element_type {
            return Err(SelectError::TypeMismatch {
                expected: self.element_type,
                found: matrix_type,
            });
        }

        if thunk.element_type() != self.thunk_type() {
            return Err(SelectError::TypeMismatch {
                expected: self.thunk_type(),
                found: thunk.element_type(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for kind in SelectOpKind::ALL {
            assert_eq!(SelectOpKind::from_name(kind.name()).unwrap(), kind);
        }
        assert_eq!(SelectOpKind::from_name(" EQ_THUNK ").unwrap(), SelectOpKind::EqThunk);
        assert!(SelectOpKind::from_name("between").is_err());
    }

    #[test]
    fn test_positional_ops_take_i64_thunk() {
        let op = SelectOp::new(SelectOpKind::Tril, ElementType::F32);
        assert!(op.check(ElementType::F32, &Scalar::I64(0)).is_ok());
        assert_eq!(
            op.check(ElementType::F32, &Scalar::F32(0.0)),
            Err(SelectError::TypeMismatch {
                expected: ElementType::I64,
                found: ElementType::F32
            })
        );
    }

    #[test]
    fn test_value_ops_require_exact_thunk_type() {
        let op = SelectOp::new(SelectOpKind::GtThunk, ElementType::I8);
        assert!(op.check(ElementType::I8, &Scalar::I8(1)).is_ok());
        assert!(op.check(ElementType::I8, &Scalar::I16(1)).is_err());
        assert_eq!(
            op.check(ElementType::U8, &Scalar::I8(1)),
            Err(SelectError::TypeMismatch {
                expected: ElementType::I8,
                found: ElementType::U8
            })
        );
    }
}
