//! MCP23017 16-bit I2C port expander driver and a multi-board [`GpioWriter`].
//!
//! Relays are switched through the direction register: a low IODIR bit turns
//! the pin into an output driving the latched low level (relay energized),
//! and [`ALL_OFF`] returns the whole port to inputs (relays idle). Register
//! addresses assume the power-on `IOCON.BANK = 0` layout.

use crate::sequencer::GpioWriter;
use crate::types::{ALL_OFF, BoardId, Port};
use embedded_hal::i2c::I2c;

/// MCP23017 registers used by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// I/O direction (1 = input).
    Iodir,
    /// Port input level.
    Gpio,
    /// Output latch.
    Olat,
}

impl Register {
    /// Register address for `port` in BANK=0 mode.
    pub const fn address(self, port: Port) -> u8 {
        match (self, port) {
            (Register::Iodir, Port::A) => 0x00,
            (Register::Iodir, Port::B) => 0x01,
            (Register::Gpio, Port::A) => 0x12,
            (Register::Gpio, Port::B) => 0x13,
            (Register::Olat, Port::A) => 0x14,
            (Register::Olat, Port::B) => 0x15,
        }
    }
}

/// A single MCP23017 on an I2C bus.
pub struct Mcp23017<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Mcp23017<I2C> {
    /// Wraps an expander at the given 7-bit address. No bus traffic.
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Writes one register on one port.
    pub fn write_register(
        &mut self,
        register: Register,
        port: Port,
        value: u8,
    ) -> Result<(), I2C::Error> {
        self.i2c
            .write(self.address, &[register.address(port), value])
    }

    /// Puts every channel in the idle state: all pins inputs, output latch low.
    ///
    /// Direction is written first so no pin drives while the latch changes.
    pub fn init(&mut self) -> Result<(), I2C::Error> {
        for port in [Port::A, Port::B] {
            self.write_register(Register::Iodir, port, ALL_OFF)?;
        }
        for port in [Port::A, Port::B] {
            self.write_register(Register::Olat, port, 0x00)?;
        }
        Ok(())
    }

    /// Returns the expander's I2C address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Releases the underlying bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

/// Errors from the expander bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BankError<E> {
    /// No expander is registered for the board.
    UnknownBoard(BoardId),

    /// Attempted to add an expander for a board that already has one.
    DuplicateBoard(BoardId),

    /// The board id exceeds the bank's capacity.
    BoardIdOutOfBounds { id: BoardId, capacity: usize },

    /// The bus write failed.
    Bus { board: BoardId, error: E },
}

impl<E: core::fmt::Debug> core::fmt::Display for BankError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BankError::UnknownBoard(id) => {
                write!(f, "no expander registered for board {}", id.0)
            }
            BankError::DuplicateBoard(id) => {
                write!(f, "board {} already has an expander", id.0)
            }
            BankError::BoardIdOutOfBounds { id, capacity } => {
                write!(f, "board {} exceeds bank capacity of {}", id.0, capacity)
            }
            BankError::Bus { board, error } => {
                write!(f, "I2C write to board {} failed: {:?}", board.0, error)
            }
        }
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Debug> std::error::Error for BankError<E> {}

/// Routes relay writes to one MCP23017 per board.
///
/// # Type Parameters
/// * `I2C` - Bus handle type (one handle per expander)
/// * `MAX_BOARDS` - Maximum number of boards
pub struct ExpanderBank<I2C, const MAX_BOARDS: usize = 2> {
    boards: [Option<Mcp23017<I2C>>; MAX_BOARDS],
    firing_register: Register,
}

impl<I2C: I2c, const MAX_BOARDS: usize> ExpanderBank<I2C, MAX_BOARDS> {
    /// Creates an empty bank that fires through the IODIR register.
    pub fn new() -> Self {
        Self {
            boards: core::array::from_fn(|_| None),
            firing_register: Register::Iodir,
        }
    }

    /// Selects the register relay patterns are written to.
    pub fn with_firing_register(mut self, register: Register) -> Self {
        self.firing_register = register;
        self
    }

    /// Registers the expander driving `id`.
    pub fn add(
        &mut self,
        id: BoardId,
        expander: Mcp23017<I2C>,
    ) -> Result<(), BankError<I2C::Error>> {
        let slot = self
            .boards
            .get_mut(usize::from(id))
            .ok_or(BankError::BoardIdOutOfBounds {
                id,
                capacity: MAX_BOARDS,
            })?;

        if slot.is_some() {
            return Err(BankError::DuplicateBoard(id));
        }

        *slot = Some(expander);
        Ok(())
    }

    /// Initializes every registered expander with all relays off.
    pub fn init(&mut self) -> Result<(), BankError<I2C::Error>> {
        for (index, slot) in self.boards.iter_mut().enumerate() {
            if let Some(expander) = slot {
                let board = BoardId(index as u8);
                tracing::debug!(board = board.0, address = expander.address(), "init expander");
                expander
                    .init()
                    .map_err(|error| BankError::Bus { board, error })?;
            }
        }
        Ok(())
    }

    /// Writes [`ALL_OFF`] to both ports of every board, attempting every
    /// write even after a failure. Returns the first failure.
    pub fn all_off(&mut self) -> Result<(), BankError<I2C::Error>> {
        let register = self.firing_register;
        let mut first_error = None;

        for (index, slot) in self.boards.iter_mut().enumerate() {
            let Some(expander) = slot else { continue };
            for port in [Port::A, Port::B] {
                if let Err(error) = expander.write_register(register, port, ALL_OFF) {
                    let board = BoardId(index as u8);
                    tracing::error!(board = board.0, ?port, "all-off write failed");
                    if first_error.is_none() {
                        first_error = Some(BankError::Bus { board, error });
                    }
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Number of registered boards.
    pub fn len(&self) -> usize {
        self.boards.iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns true if no boards are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the expander for `id`, if registered.
    pub fn get(&self, id: BoardId) -> Option<&Mcp23017<I2C>> {
        self.boards.get(usize::from(id)).and_then(Option::as_ref)
    }
}

impl<I2C: I2c, const MAX_BOARDS: usize> Default for ExpanderBank<I2C, MAX_BOARDS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I2C: I2c, const MAX_BOARDS: usize> GpioWriter for ExpanderBank<I2C, MAX_BOARDS> {
    type Error = BankError<I2C::Error>;

    fn write(&mut self, board: BoardId, port: Port, value: u8) -> Result<(), Self::Error> {
        let register = self.firing_register;
        let expander = self
            .boards
            .get_mut(usize::from(board))
            .and_then(Option::as_mut)
            .ok_or(BankError::UnknownBoard(board))?;

        expander
            .write_register(register, port, value)
            .map_err(|error| BankError::Bus { board, error })
    }
}
