use std::fmt::{Debug, Display};

use super::error::{Result, SelectError};

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Hash)]
pub enum ElementType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!("{:?}", self))
    }
}

impl ElementType {
    pub fn to_byte(&self) -> u8 {
        match self {
            ElementType::Bool => 0,
            ElementType::I8 => 1,
            ElementType::I16 => 2,
            ElementType::I32 => 3,
            ElementType::I64 => 4,
            ElementType::U8 => 6,
            ElementType::U16 => 7,
            ElementType::U32 => 8,
            ElementType::U64 => 9,
            ElementType::F32 => 11,
            ElementType::F64 => 12,
        }
    }

    pub fn from_byte(byte: u8) -> Result<ElementType> {
        match byte {
            0 => Ok(ElementType::Bool),
            1 => Ok(ElementType::I8),
            2 => Ok(ElementType::I16),
            3 => Ok(ElementType::I32),
            4 => Ok(ElementType::I64),
            6 => Ok(ElementType::U8),
            7 => Ok(ElementType::U16),
            8 => Ok(ElementType::U32),
            9 => Ok(ElementType::U64),
            11 => Ok(ElementType::F32),
            12 => Ok(ElementType::F64),
            _ => Err(SelectError::InvalidArgument(format!(
                "Invalid element type byte: {}",
                byte
            ))),
        }
    }

    pub const ALL: [ElementType; 11] = [
        ElementType::Bool,
        ElementType::I8,
        ElementType::I16,
        ElementType::I32,
        ElementType::I64,
        ElementType::U8,
        ElementType::U16,
        ElementType::U32,
        ElementType::U64,
        ElementType::F32,
        ElementType::F64,
    ];

    /// Case-insensitive lookup by name (`"i32"`, `"F64"`, `"bool"`).
    pub fn from_name(name: &str) -> Result<ElementType> {
        let lowered = name.trim().to_ascii_lowercase();
        ElementType::ALL
            .iter()
            .copied()
            .find(|ty| ty.to_string().to_ascii_lowercase() == lowered)
            .ok_or_else(|| SelectError::InvalidArgument(format!("Unknown element type: {}", name)))
    }

    pub fn get_size(&self) -> usize {
        match self {
            ElementType::Bool => 1,
            ElementType::I8 => 1,
            ElementType::I16 => 2,
            ElementType::I32 => 4,
            ElementType::I64 => 8,
            ElementType::U8 => 1,
            ElementType::U16 => 2,
            ElementType::U32 => 4,
            ElementType::U64 => 8,
            ElementType::F32 => 4,
            ElementType::F64 => 8,
        }
    }
}

/// A single typed value. Thunks, iso scalars and entry reads all travel as a
/// `Scalar` across the untyped API surface.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum Scalar {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Scalar {
    pub fn element_type(&self) -> ElementType {
        match self {
            Scalar::Bool(_) => ElementType::Bool,
            Scalar::I8(_) => ElementType::I8,
            Scalar::I16(_) => ElementType::I16,
            Scalar::I32(_) => ElementType::I32,
            Scalar::I64(_) => ElementType::I64,
            Scalar::U8(_) => ElementType::U8,
            Scalar::U16(_) => ElementType::U16,
            Scalar::U32(_) => ElementType::U32,
            Scalar::U64(_) => ElementType::U64,
            Scalar::F32(_) => ElementType::F32,
            Scalar::F64(_) => ElementType::F64,
        }
    }

    pub fn zero(element_type: ElementType) -> Scalar {
        match element_type {
            ElementType::Bool => Scalar::Bool(false),
            ElementType::I8 => Scalar::I8(0),
            ElementType::I16 => Scalar::I16(0),
            ElementType::I32 => Scalar::I32(0),
            ElementType::I64 => Scalar::I64(0),
            ElementType::U8 => Scalar::U8(0),
            ElementType::U16 => Scalar::U16(0),
            ElementType::U32 => Scalar::U32(0),
            ElementType::U64 => Scalar::U64(0),
            ElementType::F32 => Scalar::F32(0.0),
            ElementType::F64 => Scalar::F64(0.0),
        }
    }

    /// Parses `input` as a value of `element_type`. Used by the CLI to turn a
    /// textual thunk into a typed one.
    pub fn parse(element_type: ElementType, input: &str) -> Result<Scalar> {
        let input = input.trim();
        let invalid = |reason: String| {
            SelectError::InvalidArgument(format!(
                "Cannot parse '{}' as {}: {}",
                input, element_type, reason
            ))
        };

        Ok(match element_type {
            ElementType::Bool => Scalar::Bool(match input {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(invalid("expected true or false".to_string())),
            }),
            ElementType::I8 => Scalar::I8(input.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?),
            ElementType::I16 => Scalar::I16(input.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?),
            ElementType::I32 => Scalar::I32(input.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?),
            ElementType::I64 => Scalar::I64(input.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?),
            ElementType::U8 => Scalar::U8(input.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?),
            ElementType::U16 => Scalar::U16(input.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?),
            ElementType::U32 => Scalar::U32(input.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?),
            ElementType::U64 => Scalar::U64(input.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?),
            ElementType::F32 => Scalar::F32(input.parse().map_err(|e: std::num::ParseFloatError| invalid(e.to_string()))?),
            ElementType::F64 => Scalar::F64(input.parse().map_err(|e: std::num::ParseFloatError| invalid(e.to_string()))?),
        })
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::I8(v) => write!(f, "{}", v),
            Scalar::I16(v) => write!(f, "{}", v),
            Scalar::I32(v) => write!(f, "{}", v),
            Scalar::I64(v) => write!(f, "{}", v),
            Scalar::U8(v) => write!(f, "{}", v),
            Scalar::U16(v) => write!(f, "{}", v),
            Scalar::U32(v) => write!(f, "{}", v),
            Scalar::U64(v) => write!(f, "{}", v),
            Scalar::F32(v) => write!(f, "{}", v),
            Scalar::F64(v) => write!(f, "{}", v),
        }
    }
}

/// Runtime-typed value storage of a matrix: one `Vec` variant per element type.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Values {
    pub fn element_type(&self) -> ElementType {
        match self {
            Values::Bool(_) => ElementType::Bool,
            Values::I8(_) => ElementType::I8,
            Values::I16(_) => ElementType::I16,
            Values::I32(_) => ElementType::I32,
            Values::I64(_) => ElementType::I64,
            Values::U8(_) => ElementType::U8,
            Values::U16(_) => ElementType::U16,
            Values::U32(_) => ElementType::U32,
            Values::U64(_) => ElementType::U64,
            Values::F32(_) => ElementType::F32,
            Values::F64(_) => ElementType::F64,
        }
    }

    pub fn empty(element_type: ElementType) -> Values {
        match element_type {
            ElementType::Bool => Values::Bool(Vec::new()),
            ElementType::I8 => Values::I8(Vec::new()),
            ElementType::I16 => Values::I16(Vec::new()),
            ElementType::I32 => Values::I32(Vec::new()),
            ElementType::I64 => Values::I64(Vec::new()),
            ElementType::U8 => Values::U8(Vec::new()),
            ElementType::U16 => Values::U16(Vec::new()),
            ElementType::U32 => Values::U32(Vec::new()),
            ElementType::U64 => Values::U64(Vec::new()),
            ElementType::F32 => Values::F32(Vec::new()),
            ElementType::F64 => Values::F64(Vec::new()),
        }
    }

    /// A one-element store holding `scalar`, the layout of an iso matrix.
    pub fn iso(scalar: Scalar) -> Values {
        match scalar {
            Scalar::Bool(v) => Values::Bool(vec![v]),
            Scalar::I8(v) => Values::I8(vec![v]),
            Scalar::I16(v) => Values::I16(vec![v]),
            Scalar::I32(v) => Values::I32(vec![v]),
            Scalar::I64(v) => Values::I64(vec![v]),
            Scalar::U8(v) => Values::U8(vec![v]),
            Scalar::U16(v) => Values::U16(vec![v]),
            Scalar::U32(v) => Values::U32(vec![v]),
            Scalar::U64(v) => Values::U64(vec![v]),
            Scalar::F32(v) => Values::F32(vec![v]),
            Scalar::F64(v) => Values::F64(vec![v]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Values::Bool(v) => v.len(),
            Values::I8(v) => v.len(),
            Values::I16(v) => v.len(),
            Values::I32(v) => v.len(),
            Values::I64(v) => v.len(),
            Values::U8(v) => v.len(),
            Values::U16(v) => v.len(),
            Values::U32(v) => v.len(),
            Values::U64(v) => v.len(),
            Values::F32(v) => v.len(),
            Values::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, position: usize) -> Option<Scalar> {
        match self {
            Values::Bool(v) => v.get(position).map(|x| Scalar::Bool(*x)),
            Values::I8(v) => v.get(position).map(|x| Scalar::I8(*x)),
            Values::I16(v) => v.get(position).map(|x| Scalar::I16(*x)),
            Values::I32(v) => v.get(position).map(|x| Scalar::I32(*x)),
            Values::I64(v) => v.get(position).map(|x| Scalar::I64(*x)),
            Values::U8(v) => v.get(position).map(|x| Scalar::U8(*x)),
            Values::U16(v) => v.get(position).map(|x| Scalar::U16(*x)),
            Values::U32(v) => v.get(position).map(|x| Scalar::U32(*x)),
            Values::U64(v) => v.get(position).map(|x| Scalar::U64(*x)),
            Values::F32(v) => v.get(position).map(|x| Scalar::F32(*x)),
            Values::F64(v) => v.get(position).map(|x| Scalar::F64(*x)),
        }
    }
}

/// Expands `$body` once per element type with `$T` bound to the matching
/// primitive. This is the `(type)` half of every dispatch table in the crate.
macro_rules! with_element_type {
    ($element_type:expr, $T:ident => $body:expr) => {
        match $element_type {
            $crate::core::element::ElementType::Bool => { type $T = bool; $body }
            $crate::core::element::ElementType::I8 => { type $T = i8; $body }
            $crate::core::element::ElementType::I16 => { type $T = i16; $body }
            $crate::core::element::ElementType::I32 => { type $T = i32; $body }
            $crate::core::element::ElementType::I64 => { type $T = i64; $body }
            $crate::core::element::ElementType::U8 => { type $T = u8; $body }
            $crate::core::element::ElementType::U16 => { type $T = u16; $body }
            $crate::core::element::ElementType::U32 => { type $T = u32; $body }
            $crate::core::element::ElementType::U64 => { type $T = u64; $body }
            $crate::core::element::ElementType::F32 => { type $T = f32; $body }
            $crate::core::element::ElementType::F64 => { type $T = f64; $body }
        }
    };
}

pub(crate) use with_element_type;

/// A primitive that can live in a matrix. Implemented for every
/// `ElementType` so the selection kernels can be written once and
/// monomorphized per type.
pub trait Element: Copy + Default + PartialEq + PartialOrd + Debug + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;

    fn zero() -> Self;
    fn from_scalar(scalar: &Scalar) -> Option<Self>;
    fn into_scalar(self) -> Scalar;
    fn slice(values: &Values) -> Option<&[Self]>;
    fn slice_mut(values: &mut Values) -> Option<&mut [Self]>;
    fn wrap(values: Vec<Self>) -> Values;
}

macro_rules! impl_element {
    ($($type:ty => $variant:ident, $zero:expr);* $(;)?) => {
        $(
            impl Element for $type {
                const ELEMENT_TYPE: ElementType = ElementType::$variant;

                #[inline(always)]
                fn zero() -> Self {
                    $zero
                }

                #[inline(always)]
                fn from_scalar(scalar: &Scalar) -> Option<Self> {
                    match scalar {
                        Scalar::$variant(v) => Some(*v),
                        _ => None,
                    }
                }

                #[inline(always)]
                fn into_scalar(self) -> Scalar {
                    Scalar::$variant(self)
                }

                #[inline(always)]
                fn slice(values: &Values) -> Option<&[Self]> {
                    match values {
                        Values::$variant(v) => Some(v.as_slice()),
                        _ => None,
                    }
                }

                #[inline(always)]
                fn slice_mut(values: &mut Values) -> Option<&mut [Self]> {
                    match values {
                        Values::$variant(v) => Some(v.as_mut_slice()),
                        _ => None,
                    }
                }

                #[inline(always)]
                fn wrap(values: Vec<Self>) -> Values {
                    Values::$variant(values)
                }
            }
        )*
    };
}

impl_element!(
    bool => Bool, false;
    i8 => I8, 0;
    i16 => I16, 0;
    i32 => I32, 0;
    i64 => I64, 0;
    u8 => U8, 0;
    u16 => U16, 0;
    u32 => U32, 0;
    u64 => U64, 0;
    f32 => F32, 0.0;
    f64 => F64, 0.0;
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_byte_roundtrip_for_all_types() {
        for ty in [
            ElementType::Bool,
            ElementType::I8,
            ElementType::I16,
            ElementType::I32,
            ElementType::I64,
            ElementType::U8,
            ElementType::U16,
            ElementType::U32,
            ElementType::U64,
            ElementType::F32,
            ElementType::F64,
        ] {
            assert_eq!(ElementType::from_byte(ty.to_byte()).unwrap(), ty);
            assert_eq!(Scalar::zero(ty).element_type(), ty);
            assert_eq!(Values::empty(ty).element_type(), ty);
        }
        assert!(ElementType::from_byte(200).is_err());
        assert_eq!(ElementType::from_name("U16").unwrap(), ElementType::U16);
        assert_eq!(ElementType::from_name(" f64").unwrap(), ElementType::F64);
        assert!(ElementType::from_name("i128").is_err());
    }

    #[test]
    fn test_scalar_conversion_is_exact_type() {
        assert_eq!(i8::from_scalar(&Scalar::I8(-3)), Some(-3));
        assert_eq!(i8::from_scalar(&Scalar::I16(-3)), None);
        assert_eq!(f64::from_scalar(&Scalar::F32(1.0)), None);
        assert_eq!(7u32.into_scalar(), Scalar::U32(7));
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(Scalar::parse(ElementType::I8, "-12").unwrap(), Scalar::I8(-12));
        assert_eq!(Scalar::parse(ElementType::Bool, "true").unwrap(), Scalar::Bool(true));
        assert_eq!(Scalar::parse(ElementType::F64, "2.5").unwrap(), Scalar::F64(2.5));
        assert!(Scalar::parse(ElementType::I8, "300").is_err());
        assert!(Scalar::parse(ElementType::U32, "-1").is_err());
        assert!(Scalar::parse(ElementType::Bool, "maybe").is_err());
    }

    #[test]
    fn test_values_views() {
        let mut values = i32::wrap(vec![1, 2, 3]);
        assert_eq!(values.len(), 3);
        assert_eq!(i32::slice(&values), Some(&[1, 2, 3][..]));
        assert!(i64::slice(&values).is_none());
        i32::slice_mut(&mut values).unwrap()[1] = 20;
        assert_eq!(values.get(1), Some(Scalar::I32(20)));
        assert_eq!(values.get(3), None);
        assert_eq!(Values::iso(Scalar::U8(9)), Values::U8(vec![9]));
    }
}
