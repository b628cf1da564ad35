use heapless::Vec;

/// Maximum cues fired together by one instruction.
pub const MAX_CUES_PER_INSTRUCTION: usize = 32;

/// Default capacity of a [`FiringSequence`].
pub const MAX_INSTRUCTIONS: usize = 512;

/// Cue numbers fired together by one instruction.
pub type CueList = Vec<i32, MAX_CUES_PER_INSTRUCTION>;

/// One firing step: activate every listed cue, hold, release all, then pause.
///
/// Cue numbers are signed so that malformed input still reaches the matrix
/// and is rejected there as out of range.
///
/// # Type Parameters
/// * `C` - Cue number storage, [`CueList`] by default
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction<C = CueList> {
    /// Cues to fire together, in activation order.
    #[cfg_attr(feature = "serde", serde(alias = "CueNumbers"))]
    pub cue_numbers: C,

    /// Pause after release, in milliseconds.
    #[cfg_attr(feature = "serde", serde(alias = "Delay"))]
    pub delay: u32,

    /// Hold time between activation and release, in milliseconds.
    #[cfg_attr(feature = "serde", serde(alias = "Duration"))]
    pub duration: u32,
}

impl Instruction {
    /// Creates an instruction from a list of cues.
    ///
    /// # Errors
    /// * `TooManyCues` - more than [`MAX_CUES_PER_INSTRUCTION`] cues given
    pub fn new(cues: &[i32], duration: u32, delay: u32) -> Result<Self, SequenceError> {
        let mut cue_numbers = CueList::new();
        for &cue in cues {
            cue_numbers
                .push(cue)
                .map_err(|_| SequenceError::TooManyCues)?;
        }

        Ok(Self {
            cue_numbers,
            delay,
            duration,
        })
    }

    /// Creates an instruction firing a single cue.
    pub fn single(cue: i32, duration: u32, delay: u32) -> Self {
        let mut cue_numbers = CueList::new();
        // capacity is at least one
        let _ = cue_numbers.push(cue);

        Self {
            cue_numbers,
            delay,
            duration,
        }
    }
}

impl<C: AsRef<[i32]>> Instruction<C> {
    /// Cue numbers in activation order.
    pub fn cues(&self) -> &[i32] {
        self.cue_numbers.as_ref()
    }

    /// Hold plus post-fire delay, in milliseconds.
    pub fn millis(&self) -> u64 {
        u64::from(self.duration) + u64::from(self.delay)
    }
}

/// Sequence construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequenceError {
    /// Sequence capacity exceeded.
    CapacityExceeded,

    /// Instruction lists more cues than fit in one instruction.
    TooManyCues,
}

impl core::fmt::Display for SequenceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SequenceError::CapacityExceeded => {
                write!(f, "firing sequence capacity exceeded")
            }
            SequenceError::TooManyCues => {
                write!(
                    f,
                    "instruction lists more than {} cues",
                    MAX_CUES_PER_INSTRUCTION
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SequenceError {}

/// An ordered list of instructions, executed strictly in order.
///
/// # Type Parameters
/// * `N` - Maximum number of instructions this sequence can hold
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FiringSequence<const N: usize = MAX_INSTRUCTIONS> {
    #[cfg_attr(feature = "serde", serde(alias = "Instructions"))]
    instructions: Vec<Instruction, N>,
}

impl<const N: usize> FiringSequence<N> {
    /// Creates a new sequence builder.
    pub fn builder() -> SequenceBuilder<N> {
        SequenceBuilder::new()
    }

    /// Creates a sequence firing cues `0..count` one at a time.
    ///
    /// # Errors
    /// * `CapacityExceeded` - `count` is larger than `N`
    pub fn each_cue(count: usize, duration: u32, delay: u32) -> Result<Self, SequenceError> {
        let mut builder = Self::builder();
        for cue in 0..count {
            let cue = i32::try_from(cue).map_err(|_| SequenceError::CapacityExceeded)?;
            builder = builder.single(cue, duration, delay)?;
        }
        Ok(builder.build())
    }

    /// Returns the instructions in execution order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if there is nothing to fire.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Sum of all hold and delay times, in milliseconds.
    pub fn total_millis(&self) -> u64 {
        self.instructions.iter().map(Instruction::millis).sum()
    }
}

impl<const N: usize> AsRef<[Instruction]> for FiringSequence<N> {
    fn as_ref(&self) -> &[Instruction] {
        &self.instructions
    }
}

impl<const N: usize> Default for FiringSequence<N> {
    fn default() -> Self {
        Self {
            instructions: Vec::new(),
        }
    }
}

impl From<Instruction> for FiringSequence<1> {
    fn from(instruction: Instruction) -> Self {
        let mut instructions = Vec::new();
        // capacity is exactly one
        let _ = instructions.push(instruction);
        Self { instructions }
    }
}

/// Builder for firing sequences.
#[derive(Debug)]
pub struct SequenceBuilder<const N: usize> {
    instructions: Vec<Instruction, N>,
}

impl<const N: usize> SequenceBuilder<N> {
    /// Creates a new empty builder.
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
        }
    }

    /// Appends an instruction.
    ///
    /// # Errors
    /// * `CapacityExceeded` - the sequence already holds `N` instructions
    pub fn instruction(mut self, instruction: Instruction) -> Result<Self, SequenceError> {
        self.instructions
            .push(instruction)
            .map_err(|_| SequenceError::CapacityExceeded)?;
        Ok(self)
    }

    /// Appends an instruction firing `cues` together.
    pub fn fire(self, cues: &[i32], duration: u32, delay: u32) -> Result<Self, SequenceError> {
        let instruction = Instruction::new(cues, duration, delay)?;
        self.instruction(instruction)
    }

    /// Appends an instruction firing one cue.
    pub fn single(self, cue: i32, duration: u32, delay: u32) -> Result<Self, SequenceError> {
        self.instruction(Instruction::single(cue, duration, delay))
    }

    /// Number of instructions added so far.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if no instructions were added.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Finishes the sequence. An empty sequence is valid and fires nothing.
    pub fn build(self) -> FiringSequence<N> {
        FiringSequence {
            instructions: self.instructions,
        }
    }
}

impl<const N: usize> Default for SequenceBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Heap-backed instruction with any number of cues.
#[cfg(feature = "std")]
pub type OrderStep = Instruction<std::vec::Vec<i32>>;

/// Heap-backed firing sequence for hosted use.
///
/// Unlike [`FiringSequence`] it has no limit on instruction count or on cues
/// per instruction. Firing files load into this type.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FiringOrder {
    #[serde(alias = "Instructions")]
    instructions: std::vec::Vec<OrderStep>,
}

#[cfg(feature = "std")]
impl FiringOrder {
    /// Creates an empty order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an order firing cues `0..count` one at a time.
    pub fn each_cue(count: usize, duration: u32, delay: u32) -> Self {
        let instructions = (0..count)
            .map_while(|cue| i32::try_from(cue).ok())
            .map(|cue| OrderStep {
                cue_numbers: std::vec![cue],
                delay,
                duration,
            })
            .collect();
        Self { instructions }
    }

    /// Appends an instruction firing `cues` together.
    pub fn push(&mut self, cues: &[i32], duration: u32, delay: u32) {
        self.instructions.push(OrderStep {
            cue_numbers: cues.to_vec(),
            delay,
            duration,
        });
    }

    /// Returns the instructions in execution order.
    pub fn instructions(&self) -> &[OrderStep] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if there is nothing to fire.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Sum of all hold and delay times, in milliseconds.
    pub fn total_millis(&self) -> u64 {
        self.instructions.iter().map(OrderStep::millis).sum()
    }
}

#[cfg(feature = "std")]
impl AsRef<[OrderStep]> for FiringOrder {
    fn as_ref(&self) -> &[OrderStep] {
        &self.instructions
    }
}

#[cfg(feature = "std")]
impl<const N: usize> From<&FiringSequence<N>> for FiringOrder {
    fn from(sequence: &FiringSequence<N>) -> Self {
        let instructions = sequence
            .instructions()
            .iter()
            .map(|instruction| OrderStep {
                cue_numbers: instruction.cues().to_vec(),
                delay: instruction.delay,
                duration: instruction.duration,
            })
            .collect();
        Self { instructions }
    }
}
