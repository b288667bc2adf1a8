//! Tensor element types.
//!
//! Every output slot in the riffle graph IR carries an [`ElementType`]
//! alongside its shape. The set is closed: passes never invent new element
//! types, they only propagate the ones the loader handed them.

/// Scalar element types carried on graph edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::AsRefStr)]
pub enum ElementType {
    F32,
    F16,
    BF16,
    I64,
    I32,
    I8,
    U8,
    Bool,
}

impl ElementType {
    /// Width of one element in bytes.
    pub const fn bytes(&self) -> usize {
        match self {
            Self::F32 | Self::I32 => 4,
            Self::F16 | Self::BF16 => 2,
            Self::I64 => 8,
            Self::I8 | Self::U8 | Self::Bool => 1,
        }
    }

    /// True for floating-point types.
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F16 | Self::BF16)
    }

    /// True for integer types (signed or unsigned, excluding `Bool`).
    pub const fn is_int(&self) -> bool {
        matches!(self, Self::I64 | Self::I32 | Self::I8 | Self::U8)
    }
}
