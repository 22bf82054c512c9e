//! Per-instance binary mask construction.
//!
//! The segmentation service returns a dense label grid. Downstream states want
//! one binary mask per object, in a stable order, which is what
//! [`build_masks`] produces.

use crate::core::{Grid, InstanceGrid, InstanceMask};
use crate::errors::{GraspflowError, Result};
use std::collections::BTreeSet;

/// Instance ids (ascending) paired index-for-index with their masks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstanceMasks {
    /// Sorted, unique, non-background ids.
    pub ids: Vec<i32>,
    /// `masks[i]` is 1 exactly where the grid equals `ids[i]`.
    pub masks: Vec<InstanceMask>,
}

/// Splits a label grid into one binary mask per non-background label.
///
/// Ids are the distinct values of `grid` minus `background_id`, sorted
/// ascending, so the order never depends on scan order or label magnitude.
/// Every returned mask has at least one set pixel.
#[must_use]
pub fn build_masks(grid: &InstanceGrid, background_id: i32) -> InstanceMasks {
    let ids: Vec<i32> = grid
        .as_slice()
        .iter()
        .copied()
        .filter(|&v| v != background_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let masks = ids
        .iter()
        .map(|&id| grid.map(|&v| u8::from(v == id)))
        .collect();

    InstanceMasks { ids, masks }
}

impl InstanceGrid {
    /// Decodes a JSON array of integer rows into an instance grid.
    ///
    /// Fails with [`GraspflowError::InvalidGrid`] when the value is not an
    /// array of arrays, rows differ in length, or a cell is not an integer
    /// that fits in `i32`.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let rows = value
            .as_array()
            .ok_or_else(|| GraspflowError::InvalidGrid("expected an array of rows".to_string()))?;

        let mut cells: Vec<Vec<i32>> = Vec::with_capacity(rows.len());
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_array().ok_or_else(|| {
                GraspflowError::InvalidGrid(format!("row {r} is not an array"))
            })?;
            let parsed = row
                .iter()
                .enumerate()
                .map(|(c, cell)| parse_cell(cell, r, c))
                .collect::<Result<Vec<_>>>()?;
            cells.push(parsed);
        }

        Grid::from_rows(&cells).ok_or_else(|| {
            let expected = cells.first().map_or(0, Vec::len);
            let (bad, len) = cells
                .iter()
                .enumerate()
                .find(|(_, row)| row.len() != expected)
                .map_or((0, 0), |(i, row)| (i, row.len()));
            GraspflowError::InvalidGrid(format!(
                "row {bad} has {len} columns, expected {expected}"
            ))
        })
    }
}

fn parse_cell(cell: &serde_json::Value, row: usize, col: usize) -> Result<i32> {
    cell.as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| {
            GraspflowError::InvalidGrid(format!(
                "cell ({row}, {col}) is not a 32-bit integer: {cell}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn grid(rows: &[Vec<i32>]) -> InstanceGrid {
        Grid::from_rows(rows).unwrap()
    }

    #[test]
    fn test_two_instances() {
        let g = grid(&[vec![0, 0, 1], vec![1, 2, 2]]);
        let built = build_masks(&g, 0);

        assert_eq!(built.ids, vec![1, 2]);
        assert_eq!(built.masks[0].to_rows(), vec![vec![0, 0, 1], vec![1, 0, 0]]);
        assert_eq!(built.masks[1].to_rows(), vec![vec![0, 0, 0], vec![0, 1, 1]]);
    }

    #[test]
    fn test_ids_sorted_regardless_of_scan_order() {
        let g = grid(&[vec![42, 7], vec![-3, 7]]);
        let built = build_masks(&g, 0);

        assert_eq!(built.ids, vec![-3, 7, 42]);
        assert_eq!(built.masks.len(), 3);
        assert!(built.masks.iter().all(|m| m.count_set() > 0));
        assert!(built.masks.iter().all(|m| m.shape() == (2, 2)));
    }

    #[test]
    fn test_custom_background() {
        let g = grid(&[vec![5, 5], vec![5, 0]]);
        let built = build_masks(&g, 5);

        assert_eq!(built.ids, vec![0]);
        assert_eq!(built.masks[0].to_rows(), vec![vec![0, 0], vec![0, 1]]);
    }

    #[test]
    fn test_background_only() {
        let g = grid(&[vec![0, 0], vec![0, 0]]);
        let built = build_masks(&g, 0);

        assert!(built.ids.is_empty());
        assert!(built.masks.is_empty());
    }

    #[test]
    fn test_masks_partition_foreground() {
        let g = grid(&[vec![1, 2, 3, 0], vec![3, 3, 2, 1], vec![0, 0, 4, 4]]);
        let built = build_masks(&g, 0);

        let total: usize = built.masks.iter().map(InstanceMask::count_set).sum();
        let foreground = g.as_slice().iter().filter(|&&v| v != 0).count();
        assert_eq!(total, foreground);
        for (id, mask) in built.ids.iter().zip(&built.masks) {
            for (cell, bit) in g.as_slice().iter().zip(mask.as_slice()) {
                assert_eq!(*bit == 1, cell == id);
            }
        }
    }

    #[test]
    fn test_from_json() {
        let g = InstanceGrid::from_json(&json!([[0, 0, 1], [1, 2, 2]])).unwrap();
        assert_eq!(g.shape(), (2, 3));
        assert_eq!(g.get(1, 2), Some(&2));
    }

    #[test]
    fn test_from_json_ragged() {
        let err = InstanceGrid::from_json(&json!([[0, 1], [1]])).unwrap_err();
        assert_eq!(err.code(), "INVALID-GRID");
        assert!(err.to_string().contains("row 1 has 1 columns, expected 2"));
    }

    #[test]
    fn test_from_json_non_integer() {
        let err = InstanceGrid::from_json(&json!([[0, "a"]])).unwrap_err();
        assert!(matches!(err, GraspflowError::InvalidGrid(_)));

        let err = InstanceGrid::from_json(&json!([[0, 1.5]])).unwrap_err();
        assert!(matches!(err, GraspflowError::InvalidGrid(_)));
    }

    #[test]
    fn test_from_json_out_of_range() {
        let err = InstanceGrid::from_json(&json!([[4_294_967_296_i64]])).unwrap_err();
        assert!(matches!(err, GraspflowError::InvalidGrid(_)));
    }

    #[test]
    fn test_from_json_not_an_array() {
        assert!(InstanceGrid::from_json(&json!({"rows": 2})).is_err());
        assert!(InstanceGrid::from_json(&json!([1, 2])).is_err());
    }
}
