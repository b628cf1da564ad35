//! Instruction sources: JSON firing files and operator console sessions.
//!
//! Console functions take any `BufRead`/`Write` pair so the binary can hand
//! them stdin/stdout and tests can hand them byte buffers.

use crate::sequence::FiringOrder;
use crate::sequencer::FiringError;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Errors from loading, saving or authoring a sequence.
#[derive(Debug)]
pub enum SourceError {
    /// Reading or writing failed.
    Io(io::Error),
    /// The file is not a valid firing sequence.
    Json(serde_json::Error),
}

impl core::fmt::Display for SourceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SourceError::Io(err) => write!(f, "i/o error: {}", err),
            SourceError::Json(err) => write!(f, "invalid firing sequence: {}", err),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io(err) => Some(err),
            SourceError::Json(err) => Some(err),
        }
    }
}

impl From<io::Error> for SourceError {
    fn from(err: io::Error) -> Self {
        SourceError::Io(err)
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Json(err)
    }
}

/// Parses a firing sequence from JSON text.
///
/// Any number of instructions and cues per instruction is accepted. Cue
/// numbers are not range checked here; the sequencer rejects bad cues before
/// writing anything for that instruction.
pub fn parse_sequence(json: &str) -> Result<FiringOrder, SourceError> {
    Ok(serde_json::from_str(json)?)
}

/// Loads a firing sequence from a JSON file.
pub fn load_sequence(path: impl AsRef<Path>) -> Result<FiringOrder, SourceError> {
    let json = fs::read_to_string(path)?;
    parse_sequence(&json)
}

/// Writes a firing sequence as pretty-printed JSON.
pub fn save_sequence(path: impl AsRef<Path>, sequence: &FiringOrder) -> Result<(), SourceError> {
    let json = serde_json::to_string_pretty(sequence)?;
    fs::write(path, json)?;
    Ok(())
}

/// Parses an operator-entered cue number, accepting only `0..limit`.
pub fn parse_cue(line: &str, limit: usize) -> Option<i32> {
    let cue: i32 = line.trim().parse().ok()?;
    let index = usize::try_from(cue).ok()?;
    (index < limit).then_some(cue)
}

/// Errors that end an interactive firing session.
#[derive(Debug)]
pub enum PromptError<E> {
    /// Console I/O failed.
    Io(io::Error),
    /// A release failed; a relay may still be energized.
    Firing(FiringError<E>),
}

impl<E: core::fmt::Debug> core::fmt::Display for PromptError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PromptError::Io(err) => write!(f, "console error: {}", err),
            PromptError::Firing(err) => write!(f, "{}", err),
        }
    }
}

impl<E: core::fmt::Debug> std::error::Error for PromptError<E> {}

impl<E> From<io::Error> for PromptError<E> {
    fn from(err: io::Error) -> Self {
        PromptError::Io(err)
    }
}

/// Reads one line, returning `None` at end of input.
fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Prompts for cue numbers until `exit` or end of input, firing each valid one.
///
/// Invalid entries are rejected without calling `fire`. Out-of-range and
/// activation errors from `fire` are shown and the operator is prompted
/// again; a release error ends the session.
///
/// Returns the number of cues fired.
pub fn prompt_cues<E: core::fmt::Debug>(
    mut input: impl BufRead,
    mut output: impl Write,
    limit: usize,
    mut fire: impl FnMut(i32) -> Result<(), FiringError<E>>,
) -> Result<usize, PromptError<E>> {
    let mut fired = 0;

    loop {
        writeln!(output, "Enter cue to fire: ")?;
        output.flush()?;

        let Some(line) = read_line(&mut input)? else {
            return Ok(fired);
        };
        if line.trim() == "exit" {
            return Ok(fired);
        }

        let Some(cue) = parse_cue(&line, limit) else {
            writeln!(
                output,
                "Cue must be an integer between 0 and {}",
                limit.saturating_sub(1)
            )?;
            continue;
        };

        match fire(cue) {
            Ok(()) => fired += 1,
            Err(err) if err.is_critical() => return Err(PromptError::Firing(err)),
            Err(err) => {
                tracing::warn!(cue, %err, "cue not fired");
                writeln!(output, "{}", err)?;
            }
        }
    }
}

/// Prompts until a whole number is entered. `None` at end of input.
fn prompt_millis(
    input: &mut impl BufRead,
    output: &mut impl Write,
    prompt: &str,
) -> io::Result<Option<u32>> {
    loop {
        writeln!(output, "{}", prompt)?;
        output.flush()?;

        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        match line.trim().parse() {
            Ok(millis) => return Ok(Some(millis)),
            Err(_) => writeln!(output, "Enter a whole number of milliseconds")?,
        }
    }
}

/// Interactively authors a sequence of single-cue instructions.
///
/// Each `add` fires the next cue number in order (starting at 0) and asks for
/// its delay and duration. Authoring ends on `exit`, end of input, or once
/// `cue_limit` cues have been added. An `add` cut short by end of input is
/// discarded.
pub fn author_sequence(
    mut input: impl BufRead,
    mut output: impl Write,
    cue_limit: usize,
) -> Result<FiringOrder, SourceError> {
    let mut order = FiringOrder::new();
    let mut next_cue: i32 = 0;

    while order.len() < cue_limit {
        writeln!(output, "Type add for a new cue or type exit:")?;
        output.flush()?;

        let Some(line) = read_line(&mut input)? else {
            break;
        };

        match line.trim() {
            "exit" => break,
            "add" => {
                let Some(delay) = prompt_millis(&mut input, &mut output, "Enter cue delay:")?
                else {
                    break;
                };
                let Some(duration) =
                    prompt_millis(&mut input, &mut output, "Enter cue duration:")?
                else {
                    break;
                };

                order.push(&[next_cue], duration, delay);
                tracing::debug!(cue = next_cue, duration, delay, "instruction added");
                next_cue += 1;
            }
            other => writeln!(output, "Unknown command {:?}", other)?,
        }
    }

    Ok(order)
}
