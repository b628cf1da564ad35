//! Core addressing types shared by the board tables, the cue matrix and the sequencer.

/// Value that returns every channel on a port to the idle (off) state.
pub const ALL_OFF: u8 = 0xFF;

/// Identifies one expander board within a controller.
///
/// Board ids are indices into the configured board list, so the negative
/// board is `BoardId(0)` and the positive board is `BoardId(1)` in the
/// standard two-board wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardId(pub u8);

impl From<u8> for BoardId {
    fn from(id: u8) -> Self {
        BoardId(id)
    }
}

impl From<BoardId> for usize {
    fn from(id: BoardId) -> Self {
        id.0 as usize
    }
}

/// One of the two 8-bit register ports on an expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    /// Channels 0-7.
    A,
    /// Channels 8-15.
    B,
}

/// A single addressable relay output.
///
/// `pattern` has exactly one bit low: writing it to the port energizes the
/// selected channel and leaves the other seven idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RelayChannel {
    /// Board the channel lives on.
    pub board: BoardId,
    /// Register port holding the channel.
    pub port: Port,
    /// Activation bit pattern (one bit low).
    pub pattern: u8,
}

impl RelayChannel {
    /// Creates a relay channel address.
    #[inline]
    pub const fn new(board: BoardId, port: Port, pattern: u8) -> Self {
        Self {
            board,
            port,
            pattern,
        }
    }

    /// Returns the bit index (0-7) selected within the port.
    pub fn bit(&self) -> u8 {
        (!self.pattern).trailing_zeros() as u8
    }
}

/// A two-terminal firing circuit: one channel on the positive board and one
/// on the negative board, always driven together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cue {
    /// Channel on the positive board.
    pub positive: RelayChannel,
    /// Channel on the negative board.
    pub negative: RelayChannel,
}

impl Cue {
    /// Pairs a positive and a negative channel.
    #[inline]
    pub const fn new(positive: RelayChannel, negative: RelayChannel) -> Self {
        Self { positive, negative }
    }
}

/// Cue lookup errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CueError {
    /// Cue number is outside `[0, size)`.
    OutOfRange {
        /// The requested cue number.
        cue: i32,
        /// Number of cues in the matrix.
        size: usize,
    },
}

impl core::fmt::Display for CueError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CueError::OutOfRange { cue, size } => {
                write!(f, "cue {} is out of range (valid cues are 0..{})", cue, size)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CueError {}
