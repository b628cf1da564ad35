//! Cue matrix: the cross product of negative-board and positive-board channels.
//!
//! Cue numbering is a persisted contract. Cue `n` pairs positive channel
//! `n / a` with negative channel `n % a`, where `a` is the negative board's
//! channel count (positive board outer, negative board inner). With two
//! 16-channel boards that is `cue[n] = Cue(positive[n / 16], negative[n % 16])`.

use crate::board::MAX_CHANNELS;
use crate::types::{Cue, CueError, RelayChannel};
use heapless::Vec;

/// Maximum number of cues addressable by two boards.
pub const MAX_CUES: usize = MAX_CHANNELS * MAX_CHANNELS;

/// Immutable cue-number to relay-pair lookup.
#[derive(Debug, Clone)]
pub struct CueMatrix {
    cues: Vec<Cue, MAX_CUES>,
}

impl CueMatrix {
    /// Builds the matrix from the negative board (`board_a`) and the positive
    /// board (`board_b`) address tables.
    ///
    /// Tables longer than [`MAX_CHANNELS`] are truncated.
    pub fn build(board_a: &[RelayChannel], board_b: &[RelayChannel]) -> Self {
        let board_a = &board_a[..board_a.len().min(MAX_CHANNELS)];
        let board_b = &board_b[..board_b.len().min(MAX_CHANNELS)];

        let mut cues = Vec::new();
        for positive in board_b {
            for negative in board_a {
                // both tables are bounded, so the product fits MAX_CUES
                let _ = cues.push(Cue::new(*positive, *negative));
            }
        }

        Self { cues }
    }

    /// Looks up a cue by number.
    ///
    /// # Errors
    /// * `OutOfRange` - `cue` is negative or not below [`len`](Self::len)
    pub fn resolve(&self, cue: i32) -> Result<Cue, CueError> {
        usize::try_from(cue)
            .ok()
            .and_then(|index| self.cues.get(index))
            .copied()
            .ok_or(CueError::OutOfRange {
                cue,
                size: self.cues.len(),
            })
    }

    /// Returns true if `cue` resolves.
    pub fn contains(&self, cue: i32) -> bool {
        self.resolve(cue).is_ok()
    }

    /// Number of cues.
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Returns true if either board has no channels.
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Iterates cues in cue-number order.
    pub fn iter(&self) -> impl Iterator<Item = &Cue> {
        self.cues.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::relay_table;
    use crate::types::BoardId;

    #[test]
    fn empty_board_gives_empty_matrix() {
        let a = relay_table(BoardId(0), 0);
        let b = relay_table(BoardId(1), 16);
        let matrix = CueMatrix::build(&a, &b);
        assert!(matrix.is_empty());
        assert!(matches!(
            matrix.resolve(0),
            Err(CueError::OutOfRange { cue: 0, size: 0 })
        ));
    }

    #[test]
    fn narrow_boards_keep_ordering_rule() {
        let a = relay_table(BoardId(0), 3);
        let b = relay_table(BoardId(1), 2);
        let matrix = CueMatrix::build(&a, &b);

        assert_eq!(matrix.len(), 6);
        for n in 0..6 {
            let cue = matrix.resolve(n).unwrap();
            assert_eq!(cue.positive, b[n as usize / 3]);
            assert_eq!(cue.negative, a[n as usize % 3]);
        }
        assert!(!matrix.contains(6));
    }
}
