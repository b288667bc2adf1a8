//! Shape helper tests.

use smallvec::smallvec;
use test_case::test_case;

use crate::shape::{Dim, Shape, is_static, permutation_is_trivial, shapes_match_expected, static_dims, static_shape};

#[test]
fn static_shape_round_trip() {
    let shape = static_shape(&[2, 3, 4]);
    assert!(is_static(&shape));
    assert_eq!(static_dims(&shape).unwrap().as_slice(), &[2, 3, 4]);
}

#[test]
fn dynamic_dim_blocks_static_extraction() {
    let shape: Shape = smallvec![Dim::Static(2), Dim::Dynamic];
    assert!(!is_static(&shape));
    assert_eq!(static_dims(&shape), None);
}

// =========================================================================
// Expected-vs-observed equality
// =========================================================================

fn shape_of(dims: &[Option<usize>]) -> Shape {
    dims.iter().map(|dim| dim.map_or(Dim::Dynamic, Dim::Static)).collect()
}

#[test_case(&[Some(1), Some(8), Some(4)], &[Some(1), Some(8), Some(4)], true; "exact_static_match")]
#[test_case(&[Some(1), Some(8), Some(4)], &[Some(1), Some(8), Some(5)], false; "non_batch_mismatch")]
#[test_case(&[Some(1), Some(8), Some(4)], &[Some(7), Some(8), Some(4)], true; "batch_mismatch_tolerated")]
#[test_case(&[Some(1), Some(8), Some(4)], &[None, Some(8), Some(4)], true; "dynamic_observed_batch_tolerated")]
#[test_case(&[None, Some(8), Some(4)], &[Some(3), Some(8), Some(4)], true; "dynamic_expected_batch")]
#[test_case(&[Some(1), None, Some(4)], &[Some(1), Some(99), Some(4)], true; "dynamic_expected_dim_matches_anything")]
#[test_case(&[Some(1), Some(8), Some(4)], &[Some(1), None, Some(4)], false; "dynamic_observed_non_batch_rejected")]
#[test_case(&[Some(1), Some(8)], &[Some(1), Some(8), Some(4)], false; "rank_mismatch")]
fn expected_vs_observed(expected: &[Option<usize>], observed: &[Option<usize>], matches: bool) {
    assert_eq!(shapes_match_expected(&shape_of(expected), &shape_of(observed)), matches);
}

// =========================================================================
// Trivial permutations
// =========================================================================

#[test_case(&[0, 1, 2, 3], &[2, 3, 4, 5], true; "identity")]
#[test_case(&[0, 2, 1, 3], &[1, 4, 1, 8], true; "unit_dims_move_freely")]
#[test_case(&[0, 2, 1, 3], &[1, 4, 2, 8], false; "significant_dims_reordered")]
#[test_case(&[1, 0], &[1, 5], true; "unit_leading_dim")]
#[test_case(&[1, 0], &[3, 5], false; "real_swap")]
#[test_case(&[0, 0, 1, 2], &[1, 2, 3, 4], false; "repeated_axis")]
#[test_case(&[0, 1, 4, 2], &[1, 2, 3, 4], false; "out_of_range_axis")]
#[test_case(&[0, 1], &[1, 2, 3], false; "length_mismatch")]
fn trivial_permutations(perm: &[usize], extents: &[usize], trivial: bool) {
    assert_eq!(permutation_is_trivial(perm, &static_shape(extents)), trivial);
}

#[test]
fn dynamic_shape_is_never_provably_trivial() {
    let shape: Shape = smallvec![Dim::Static(1), Dim::Dynamic];
    assert!(!permutation_is_trivial(&[0, 1], &shape));
}
