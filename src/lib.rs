#![cfg_attr(not(feature = "std"), no_std)]

//! Cue addressing and firing sequencer for dual-board relay controllers.
//!
//! # Core Concepts
//!
//! - **`RelayChannel`**: One relay output, addressed by board, port and a one-bit-low pattern
//! - **`Cue`**: A positive/negative channel pair that is always driven together
//! - **`CueMatrix`**: Maps cue numbers to cues (positive board outer, negative board inner)
//! - **`Instruction`**: Cues fired together, a hold duration and a post-fire delay
//! - **`FiringSequence`**: Ordered instructions, executed strictly one after another
//! - **`FiringOrder`**: Heap-backed sequence with no size limits (`std` only), used for files
//! - **`FiringSequencer`**: Runs activate, hold, release, delay for each instruction
//! - **`GpioWriter`**: Trait to implement for your relay hardware
//! - **`ExpanderBank`**: `GpioWriter` over MCP23017 expanders on any `embedded-hal` I2C bus
//!
//! Timing uses `embedded_hal::delay::DelayNs`, so the sequencer runs unchanged on a
//! microcontroller or on a Linux host.
//!
//! Release is always attempted for every cue an instruction targeted, even
//! when activation failed part way. A failed release is reported as a
//! critical error since a relay may still be energized.

pub mod board;
pub mod matrix;
pub mod mcp23017;
pub mod sequence;
pub mod sequencer;
pub mod types;

#[cfg(feature = "std")]
pub mod config;
#[cfg(feature = "std")]
pub mod source;

pub use board::{BoardConfig, MAX_CHANNELS, relay_table};
pub use matrix::{CueMatrix, MAX_CUES};
pub use mcp23017::{BankError, ExpanderBank, Mcp23017, Register};
pub use sequence::{FiringSequence, Instruction, SequenceBuilder, SequenceError};
#[cfg(feature = "std")]
pub use sequence::{FiringOrder, OrderStep};
pub use sequencer::{FiringError, FiringSequencer, GpioWriter, RunOutcome, SequencerState};
pub use types::{ALL_OFF, BoardId, Cue, CueError, Port, RelayChannel};

/// Builds the cue matrix for a negative board and a positive board.
///
/// The two boards must have different ids, otherwise every cue would drive
/// both of its terminals on one board. Debug builds assert this.
pub fn build_matrix(negative: &BoardConfig, positive: &BoardConfig) -> CueMatrix {
    debug_assert_ne!(
        negative.id, positive.id,
        "negative and positive channels must be on different boards"
    );
    CueMatrix::build(&negative.relay_table(), &positive.relay_table())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_boards_give_256_cues() {
        let negative = BoardConfig::new(BoardId(0), 0x20);
        let positive = BoardConfig::new(BoardId(1), 0x22);
        assert_eq!(build_matrix(&negative, &positive).len(), MAX_CUES);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "different boards")]
    fn same_board_for_both_terminals_panics_in_debug() {
        let board = BoardConfig::new(BoardId(0), 0x20);
        build_matrix(&board, &board);
    }
}
