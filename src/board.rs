//! Relay address tables for a single expander board.
//!
//! Each board exposes up to 16 channels split across two 8-bit ports.
//! Channel `i` in 0-7 lives on port A with pattern `!(1 << i)`, channel `i`
//! in 8-15 lives on port B with pattern `!(1 << (i - 8))`.

use crate::types::{BoardId, Port, RelayChannel};
use heapless::Vec;

/// Channels per port.
pub const PORT_WIDTH: usize = 8;

/// Maximum channels on one board (two ports).
pub const MAX_CHANNELS: usize = 2 * PORT_WIDTH;

/// Static geometry of one relay board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardConfig {
    /// Board identifier used when routing writes.
    pub id: BoardId,
    /// 7-bit I2C address of the expander.
    pub address: u8,
    /// Number of wired channels. Only 1 to [`MAX_CHANNELS`] is valid; address
    /// tables never extend past [`MAX_CHANNELS`].
    pub channels: u8,
}

impl BoardConfig {
    /// Creates a fully populated 16-channel board.
    pub const fn new(id: BoardId, address: u8) -> Self {
        Self {
            id,
            address,
            channels: MAX_CHANNELS as u8,
        }
    }

    /// Limits the board to its first `channels` outputs.
    ///
    /// The value is stored as given; `ControllerConfig::validate` rejects
    /// widths outside 1 to [`MAX_CHANNELS`].
    pub fn with_channels(mut self, channels: u8) -> Self {
        self.channels = channels;
        self
    }

    /// Builds this board's relay address table.
    pub fn relay_table(&self) -> RelayTable {
        relay_table(self.id, self.channels as usize)
    }
}

/// Ordered relay channels for one board, indexed by logical channel.
pub type RelayTable = Vec<RelayChannel, MAX_CHANNELS>;

/// Activation pattern for `bit` within a port: that bit low, the rest high.
#[inline]
pub const fn activation_pattern(bit: u8) -> u8 {
    !(1u8 << bit)
}

/// Address of logical channel `channel` (0-15) on `board`.
#[inline]
pub const fn channel_address(board: BoardId, channel: u8) -> RelayChannel {
    if (channel as usize) < PORT_WIDTH {
        RelayChannel::new(board, Port::A, activation_pattern(channel))
    } else {
        RelayChannel::new(board, Port::B, activation_pattern(channel - PORT_WIDTH as u8))
    }
}

/// Builds the address table for the first `channels` outputs of `board`.
///
/// `channels` above [`MAX_CHANNELS`] is clamped.
pub fn relay_table(board: BoardId, channels: usize) -> RelayTable {
    let mut table = Vec::new();
    for channel in 0..channels.min(MAX_CHANNELS) {
        // capacity equals MAX_CHANNELS, which bounds the loop
        let _ = table.push(channel_address(board, channel as u8));
    }
    table
}
