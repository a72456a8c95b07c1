//! Scalar component types and their host encoding.

use half::f16;

/// Scalar component type of a kernel-language value.
///
/// Names follow the kernel language (`uint`, not `unsigned int`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumString, strum::Display, strum::IntoStaticStr, strum::EnumIter, strum::VariantArray)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalarDType {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Half,
    Float,
    Double,
}

impl ScalarDType {
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Char | Self::UChar => 1,
            Self::Short | Self::UShort | Self::Half => 2,
            Self::Int | Self::UInt | Self::Float => 4,
            Self::Long | Self::ULong | Self::Double => 8,
        }
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Half | Self::Float | Self::Double)
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Char | Self::Short | Self::Int | Self::Long)
    }

    /// Appends `value` converted to this type in native byte order.
    ///
    /// Conversion follows Rust `as` semantics (saturating float to int).
    pub fn encode(&self, value: f64, out: &mut Vec<u8>) {
        match self {
            Self::Char => out.extend_from_slice(&(value as i8).to_ne_bytes()),
            Self::UChar => out.extend_from_slice(&(value as u8).to_ne_bytes()),
            Self::Short => out.extend_from_slice(&(value as i16).to_ne_bytes()),
            Self::UShort => out.extend_from_slice(&(value as u16).to_ne_bytes()),
            Self::Int => out.extend_from_slice(&(value as i32).to_ne_bytes()),
            Self::UInt => out.extend_from_slice(&(value as u32).to_ne_bytes()),
            Self::Long => out.extend_from_slice(&(value as i64).to_ne_bytes()),
            Self::ULong => out.extend_from_slice(&(value as u64).to_ne_bytes()),
            Self::Half => out.extend_from_slice(&f16::from_f64(value).to_ne_bytes()),
            Self::Float => out.extend_from_slice(&(value as f32).to_ne_bytes()),
            Self::Double => out.extend_from_slice(&value.to_ne_bytes()),
        }
    }

    /// Reads one value of this type from the front of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than [`Self::bytes`].
    pub fn decode(&self, bytes: &[u8]) -> f64 {
        fn take<const N: usize>(bytes: &[u8]) -> [u8; N] {
            let mut out = [0u8; N];
            out.copy_from_slice(&bytes[..N]);
            out
        }

        match self {
            Self::Char => i8::from_ne_bytes(take(bytes)) as f64,
            Self::UChar => u8::from_ne_bytes(take(bytes)) as f64,
            Self::Short => i16::from_ne_bytes(take(bytes)) as f64,
            Self::UShort => u16::from_ne_bytes(take(bytes)) as f64,
            Self::Int => i32::from_ne_bytes(take(bytes)) as f64,
            Self::UInt => u32::from_ne_bytes(take(bytes)) as f64,
            Self::Long => i64::from_ne_bytes(take(bytes)) as f64,
            Self::ULong => u64::from_ne_bytes(take(bytes)) as f64,
            Self::Half => f16::from_ne_bytes(take(bytes)).to_f64(),
            Self::Float => f32::from_ne_bytes(take(bytes)) as f64,
            Self::Double => f64::from_ne_bytes(take(bytes)),
        }
    }
}

/// Floating point precision backing [`crate::FLOAT_TYPE_ALIAS`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Precision {
    #[default]
    Single,
    Double,
}

impl Precision {
    pub const fn scalar(&self) -> ScalarDType {
        match self {
            Self::Single => ScalarDType::Float,
            Self::Double => ScalarDType::Double,
        }
    }

    pub const fn is_double(&self) -> bool {
        matches!(self, Self::Double)
    }
}
