use crate::core::{
    element::Scalar,
    matrix::SparseMatrix,
};

use super::operator::SelectOpKind;

/// Whether every survivor of a selection is known to hold one value, decided
/// before any entry is visited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IsoDecision {
    NotIso,
    Iso(Scalar),
}

impl IsoDecision {
    pub fn is_iso(&self) -> bool {
        matches!(self, IsoDecision::Iso(_))
    }

    pub fn scalar(&self) -> Option<Scalar> {
        match self {
            IsoDecision::Iso(scalar) => Some(*scalar),
            IsoDecision::NotIso => None,
        }
    }
}

pub fn detect_iso(kind: SelectOpKind, thunk: &Scalar, input: &SparseMatrix) -> IsoDecision {
    if let Some(scalar) = input.iso_value() {
        return IsoDecision::Iso(scalar);
    }

    match kind {
        SelectOpKind::EqThunk => IsoDecision::Iso(*thunk),
        SelectOpKind::EqZero => IsoDecision::Iso(Scalar::zero(input.element_type())),
        _ => IsoDecision::NotIso,
    }
}
