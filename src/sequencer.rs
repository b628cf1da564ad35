//! Firing sequencer with activate, hold, release and delay timing.
//!
//! Provides [`FiringSequencer`] which executes instruction lists against a
//! [`GpioWriter`], and the [`GpioWriter`] trait for hardware abstraction.
//! Execution is blocking and strictly sequential: one instruction finishes
//! its delay before the next instruction issues any write.

use crate::matrix::CueMatrix;
use crate::sequence::Instruction;
use crate::types::{ALL_OFF, BoardId, Cue, Port, RelayChannel};
use embedded_hal::delay::DelayNs;

/// Trait for abstracting the relay expander hardware.
///
/// Implement this for your expander driver. The sequencer only ever writes
/// an activation pattern (one bit low) or [`ALL_OFF`]; it never reads back.
pub trait GpioWriter {
    /// Hardware error type.
    type Error: core::fmt::Debug;

    /// Writes `value` to `port` on `board`.
    fn write(&mut self, board: BoardId, port: Port, value: u8) -> Result<(), Self::Error>;
}

impl<W: GpioWriter + ?Sized> GpioWriter for &mut W {
    type Error = W::Error;

    fn write(&mut self, board: BoardId, port: Port, value: u8) -> Result<(), Self::Error> {
        (**self).write(board, port, value)
    }
}

/// Where the sequencer is within the current instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerState {
    /// Waiting for an instruction.
    Idle,
    /// Writing activation patterns.
    Activating,
    /// Blocking for the instruction's duration with relays energized.
    Holding,
    /// Writing [`ALL_OFF`] to every targeted port.
    Releasing,
    /// Blocking for the instruction's post-fire delay.
    Delaying,
    /// The last run completed every instruction.
    Done,
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunOutcome {
    /// Every instruction was fired.
    Completed {
        /// Number of instructions fired.
        instructions: usize,
    },
    /// The stop predicate fired between two instructions.
    Stopped {
        /// Number of instructions fully completed before stopping.
        completed: usize,
    },
}

/// Errors surfaced by a firing run.
///
/// `instruction` is the 0-based index of the failing instruction within the
/// sequence. Any error ends the run; later instructions are not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FiringError<E> {
    /// A cue number does not resolve. Nothing from this instruction was written.
    OutOfRangeCue {
        /// Failing instruction index.
        instruction: usize,
        /// The offending cue number.
        cue: i32,
        /// Number of cues in the matrix.
        size: usize,
    },
    /// An activation write failed. Release was still attempted for every cue.
    Activation {
        /// Failing instruction index.
        instruction: usize,
        /// Cue being activated.
        cue: i32,
        /// Hardware error.
        error: E,
    },
    /// A release write failed. A relay may still be energized.
    Release {
        /// Failing instruction index.
        instruction: usize,
        /// Cue being released.
        cue: i32,
        /// Hardware error.
        error: E,
    },
}

impl<E> FiringError<E> {
    /// Returns true when a relay may have been left energized.
    pub fn is_critical(&self) -> bool {
        matches!(self, FiringError::Release { .. })
    }

    /// Index of the instruction that failed.
    pub fn instruction(&self) -> usize {
        match self {
            FiringError::OutOfRangeCue { instruction, .. }
            | FiringError::Activation { instruction, .. }
            | FiringError::Release { instruction, .. } => *instruction,
        }
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for FiringError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FiringError::OutOfRangeCue {
                instruction,
                cue,
                size,
            } => {
                write!(
                    f,
                    "instruction {}: cue {} is out of range (valid cues are 0..{})",
                    instruction, cue, size
                )
            }
            FiringError::Activation {
                instruction,
                cue,
                error,
            } => {
                write!(
                    f,
                    "instruction {}: failed to activate cue {}: {:?}",
                    instruction, cue, error
                )
            }
            FiringError::Release {
                instruction,
                cue,
                error,
            } => {
                write!(
                    f,
                    "instruction {}: failed to release cue {}, relay may remain energized: {:?}",
                    instruction, cue, error
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Debug> std::error::Error for FiringError<E> {}

/// Fires cues from a [`CueMatrix`] through a [`GpioWriter`].
///
/// The sequencer owns the writer and the delay provider for its lifetime and
/// borrows the matrix, which can be shared across sequencers and calls.
///
/// # Type Parameters
/// * `'m` - Lifetime of the cue matrix reference
/// * `W` - Hardware writer type
/// * `D` - Blocking delay provider
pub struct FiringSequencer<'m, W: GpioWriter, D: DelayNs> {
    matrix: &'m CueMatrix,
    writer: W,
    delay: D,
    state: SequencerState,
}

impl<'m, W: GpioWriter, D: DelayNs> FiringSequencer<'m, W, D> {
    /// Creates an idle sequencer. No hardware is touched.
    pub fn new(matrix: &'m CueMatrix, writer: W, delay: D) -> Self {
        Self {
            matrix,
            writer,
            delay,
            state: SequencerState::Idle,
        }
    }

    /// Executes every instruction in order.
    ///
    /// Accepts a [`FiringSequence`](crate::FiringSequence), a heap-backed
    /// order or a plain slice of instructions. Stops at the first error. The
    /// failing instruction's relays are released before the error is returned.
    pub fn run<S, C>(&mut self, sequence: &S) -> Result<(), FiringError<W::Error>>
    where
        S: AsRef<[Instruction<C>]> + ?Sized,
        C: AsRef<[i32]>,
    {
        self.run_until(sequence, || false).map(|_| ())
    }

    /// Executes instructions in order until `stop` returns true.
    ///
    /// `stop` is polled only between instructions, never while relays are held.
    pub fn run_until<S, C>(
        &mut self,
        sequence: &S,
        mut stop: impl FnMut() -> bool,
    ) -> Result<RunOutcome, FiringError<W::Error>>
    where
        S: AsRef<[Instruction<C>]> + ?Sized,
        C: AsRef<[i32]>,
    {
        let instructions = sequence.as_ref();
        for (index, instruction) in instructions.iter().enumerate() {
            if stop() {
                tracing::info!(completed = index, "firing sequence stopped");
                self.state = SequencerState::Idle;
                return Ok(RunOutcome::Stopped { completed: index });
            }
            self.fire(index, instruction)?;
        }

        self.state = SequencerState::Done;
        Ok(RunOutcome::Completed {
            instructions: instructions.len(),
        })
    }

    /// Fires a single cue with the given hold and delay times.
    pub fn fire_single(
        &mut self,
        cue: i32,
        duration: u32,
        delay: u32,
    ) -> Result<(), FiringError<W::Error>> {
        let instruction = Instruction::single(cue, duration, delay);
        self.run(core::slice::from_ref(&instruction))
    }

    /// Runs one instruction through activate, hold, release and delay.
    ///
    /// `index` is only used for error reporting and logs.
    pub fn fire<C: AsRef<[i32]>>(
        &mut self,
        index: usize,
        instruction: &Instruction<C>,
    ) -> Result<(), FiringError<W::Error>> {
        let numbers = instruction.cues();
        self.check_all(index, numbers)?;
        let matrix = self.matrix;

        tracing::info!(
            instruction = index,
            cues = ?numbers,
            duration = instruction.duration,
            delay = instruction.delay,
            "firing instruction"
        );

        self.state = SequencerState::Activating;
        let mut activation_failure = None;
        for (number, cue) in resolved(matrix, numbers) {
            if let Err(error) = self.activate(&cue) {
                tracing::warn!(instruction = index, cue = number, ?error, "activation failed");
                activation_failure = Some(FiringError::Activation {
                    instruction: index,
                    cue: number,
                    error,
                });
                break;
            }
            tracing::debug!(instruction = index, cue = number, "cue energized");
        }

        if activation_failure.is_none() {
            self.state = SequencerState::Holding;
            self.delay.delay_ms(instruction.duration);
        }

        // every targeted cue is released, including ones never activated
        self.state = SequencerState::Releasing;
        let mut release_failure = None;
        for (number, cue) in resolved(matrix, numbers) {
            if let Err(error) = self.release(&cue) {
                tracing::error!(
                    instruction = index,
                    cue = number,
                    ?error,
                    "release failed, relay may remain energized"
                );
                if release_failure.is_none() {
                    release_failure = Some(FiringError::Release {
                        instruction: index,
                        cue: number,
                        error,
                    });
                }
            }
        }

        if let Some(error) = release_failure.or(activation_failure) {
            self.state = SequencerState::Idle;
            return Err(error);
        }

        self.state = SequencerState::Delaying;
        self.delay.delay_ms(instruction.delay);

        self.state = SequencerState::Idle;
        Ok(())
    }

    /// Checks every cue in the instruction before any write is issued.
    fn check_all(&self, index: usize, numbers: &[i32]) -> Result<(), FiringError<W::Error>> {
        for &number in numbers {
            if !self.matrix.contains(number) {
                return Err(FiringError::OutOfRangeCue {
                    instruction: index,
                    cue: number,
                    size: self.matrix.len(),
                });
            }
        }
        Ok(())
    }

    /// Energizes the positive then the negative channel of a cue.
    fn activate(&mut self, cue: &Cue) -> Result<(), W::Error> {
        self.write(&cue.positive, cue.positive.pattern)?;
        self.write(&cue.negative, cue.negative.pattern)
    }

    /// Writes [`ALL_OFF`] to both of a cue's ports, attempting both even if
    /// the first write fails.
    fn release(&mut self, cue: &Cue) -> Result<(), W::Error> {
        let positive = self.write(&cue.positive, ALL_OFF);
        let negative = self.write(&cue.negative, ALL_OFF);
        positive.and(negative)
    }

    fn write(&mut self, channel: &RelayChannel, value: u8) -> Result<(), W::Error> {
        tracing::debug!(
            board = channel.board.0,
            port = ?channel.port,
            value,
            "relay write"
        );
        self.writer.write(channel.board, channel.port, value)
    }

    /// Returns the current state of the sequencer.
    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Returns the cue matrix this sequencer fires from.
    pub fn matrix(&self) -> &'m CueMatrix {
        self.matrix
    }

    /// Returns a reference to the hardware writer.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Consumes the sequencer, returning the writer and delay provider.
    pub fn into_parts(self) -> (W, D) {
        (self.writer, self.delay)
    }
}

/// Pairs each cue number with its cue, skipping numbers that do not resolve.
fn resolved<'a>(
    matrix: &'a CueMatrix,
    numbers: &'a [i32],
) -> impl Iterator<Item = (i32, Cue)> + 'a {
    numbers
        .iter()
        .filter_map(move |&number| matrix.resolve(number).ok().map(|cue| (number, cue)))
}
