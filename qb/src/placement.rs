//! Placements and the conflict predicate
//!
//! A [`Placement`] is an ordered sequence of column indices: element `i` is
//! the column of the queen in row `i`. Placements are never mutated in place;
//! new ones are built by appending one column to an existing placement.

use serde::{Deserialize, Serialize};

/// An immutable partial assignment of queens to board rows
///
/// Serializes transparently as a JSON array of column numbers, which is the
/// wire form used by the state store and the gateway (`[[1,3,0,2], ...]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Placement(Vec<u8>);

impl Placement {
    /// The empty placement (no rows filled yet)
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Number of rows already placed
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no rows have been placed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Column per row, row 0 first
    pub fn columns(&self) -> &[u8] {
        &self.0
    }

    /// A new placement with `col` appended as the next row's queen
    pub fn extended(&self, col: u8) -> Self {
        let mut cols = Vec::with_capacity(self.0.len() + 1);
        cols.extend_from_slice(&self.0);
        cols.push(col);
        Self(cols)
    }
}

impl From<Vec<u8>> for Placement {
    fn from(cols: Vec<u8>) -> Self {
        Self(cols)
    }
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, col) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{col}")?;
        }
        write!(f, "]")
    }
}

/// Whether a queen may occupy `candidate` in the row following `placed`
///
/// Returns `false` iff `candidate` repeats a column already used, or lies on
/// a diagonal with any placed queen (`|Δrow| == |Δcol|`). O(placed.len()),
/// no side effects. Every search path - the exhaustive solver and frontier
/// expansion alike - must go through this predicate.
pub fn is_safe(placed: &[u8], candidate: u8) -> bool {
    let next_row = placed.len();
    for (row, &col) in placed.iter().enumerate() {
        if col == candidate {
            return false;
        }
        if next_row - row == usize::from(col.abs_diff(candidate)) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_leaves_original_untouched() {
        let base = Placement::empty().extended(3);
        let child = base.extended(1);
        assert_eq!(base.columns(), &[3]);
        assert_eq!(child.columns(), &[3, 1]);
        assert_eq!(child.len(), 2);
    }

    #[test]
    fn test_is_safe_rejects_shared_column() {
        assert!(!is_safe(&[2], 2));
        assert!(!is_safe(&[0, 3], 3));
    }

    #[test]
    fn test_is_safe_rejects_diagonals() {
        // queen at (0,0): (1,1) and (2,2) attacked
        assert!(!is_safe(&[0], 1));
        assert!(!is_safe(&[0, 2], 2));
        // anti-diagonal: queen at (0,3) attacks (1,2)
        assert!(!is_safe(&[3], 2));
    }

    #[test]
    fn test_is_safe_accepts_non_attacking() {
        assert!(is_safe(&[], 0));
        assert!(is_safe(&[1], 3));
        assert!(is_safe(&[1, 3], 0));
        assert!(is_safe(&[1, 3, 0], 2));
    }

    #[test]
    fn test_wire_form_is_bare_array() {
        let p = Placement::from(vec![1, 3, 0, 2]);
        assert_eq!(serde_json::to_string(&p).unwrap(), "[1,3,0,2]");
        let back: Placement = serde_json::from_str("[2,0,3,1]").unwrap();
        assert_eq!(back.columns(), &[2, 0, 3, 1]);
    }

    #[test]
    fn test_display_matches_wire_form() {
        let p = Placement::from(vec![1, 3, 0, 2]);
        assert_eq!(p.to_string(), "[1,3,0,2]");
    }
}
