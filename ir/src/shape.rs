//! Shapes with per-dimension static/dynamic state.
//!
//! Dimensions may be statically known or unknown until runtime. Passes that
//! need concrete extents check staticness explicitly and treat a dynamic
//! dimension as a no-match, never as an error.

use smallvec::SmallVec;

/// One dimension of a tensor shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Statically known extent.
    Static(usize),
    /// Extent unknown until runtime.
    Dynamic,
}

impl Dim {
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }

    pub fn as_static(&self) -> Option<usize> {
        match self {
            Self::Static(extent) => Some(*extent),
            Self::Dynamic => None,
        }
    }
}

impl From<usize> for Dim {
    fn from(extent: usize) -> Self {
        Self::Static(extent)
    }
}

/// Shape type - sequence of dimensions.
///
/// Inline capacity of 4 avoids heap allocation for the 1-4D ranks that
/// dominate real models.
pub type Shape = SmallVec<[Dim; 4]>;

/// Build a fully static shape from extents.
pub fn static_shape(extents: &[usize]) -> Shape {
    extents.iter().map(|&extent| Dim::Static(extent)).collect()
}

/// Check if every dimension is statically known.
pub fn is_static(shape: &Shape) -> bool {
    shape.iter().all(Dim::is_static)
}

/// Concrete extents if the shape is fully static, `None` otherwise.
pub fn static_dims(shape: &Shape) -> Option<SmallVec<[usize; 4]>> {
    shape.iter().map(Dim::as_static).collect()
}

/// Expected-vs-observed shape equality with a tolerated batch dimension.
///
/// A dynamic dimension in `expected` matches any observed dimension. A
/// static expected dimension must equal the observed one exactly, except at
/// index 0 (the batch dimension), where the observed value may be dynamic or
/// differ without failing the check. Ranks must agree.
pub fn shapes_match_expected(expected: &Shape, observed: &Shape) -> bool {
    if expected.len() != observed.len() {
        return false;
    }
    expected.iter().zip(observed).enumerate().all(|(index, (expected_dim, observed_dim))| match expected_dim {
        Dim::Dynamic => true,
        Dim::Static(_) if index == 0 => true,
        Dim::Static(extent) => observed_dim.as_static() == Some(*extent),
    })
}

/// True when applying `perm` to a tensor of shape `shape` provably leaves
/// the element layout unchanged.
///
/// Requires a fully static shape: dimensions of extent 1 may move freely,
/// but every dimension with extent > 1 must keep its relative order. A
/// malformed permutation (wrong length, repeated or out-of-range axis) is
/// never trivial.
pub fn permutation_is_trivial(perm: &[usize], shape: &Shape) -> bool {
    if perm.len() != shape.len() {
        return false;
    }
    let mut seen = [false; 16];
    if perm.len() > seen.len() {
        return false;
    }
    for &axis in perm {
        if axis >= perm.len() || seen[axis] {
            return false;
        }
        seen[axis] = true;
    }
    let Some(extents) = static_dims(shape) else {
        return false;
    };
    let mut last_significant = None;
    for &axis in perm {
        if extents[axis] > 1 {
            if last_significant.is_some_and(|previous| previous > axis) {
                return false;
            }
            last_significant = Some(axis);
        }
    }
    true
}
