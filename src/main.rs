//! `firepi`: fire relay cues from a JSON firing order or from the console.

use anyhow::{Context, Result, bail};
use clap::Parser;
use cue_sequencer::config::{ControllerConfig, ModeFlags, RunMode};
use cue_sequencer::source::{self, PromptError};
use cue_sequencer::{
    BoardConfig, BoardId, CueMatrix, ExpanderBank, FiringOrder, FiringSequencer, Mcp23017,
};
use linux_embedded_hal::{Delay, I2cdev};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "firepi", about = "Fire relay cues on a dual MCP23017 controller")]
struct Cli {
    /// Log every relay write.
    #[arg(short, long)]
    verbose: bool,

    /// JSON firing order to execute.
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Prompt for cue numbers and fire them one at a time.
    #[arg(short, long)]
    interactive: bool,

    /// Author a firing order and write it to --output.
    #[arg(short, long)]
    build: bool,

    /// File the authored firing order is written to.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Fire every cue once, in order.
    #[arg(long)]
    all: bool,

    /// I2C bus device.
    #[arg(long, default_value = cue_sequencer::config::DEFAULT_BUS)]
    bus: PathBuf,

    /// I2C address of the negative board.
    #[arg(long, value_parser = parse_address, default_value = "0x20")]
    negative_address: u8,

    /// I2C address of the positive board.
    #[arg(long, value_parser = parse_address, default_value = "0x22")]
    positive_address: u8,

    /// Wired channels per board.
    #[arg(long, default_value_t = 16)]
    channels: u8,

    /// Hold time in milliseconds for interactive and --all firing.
    #[arg(long, default_value_t = cue_sequencer::config::DEFAULT_FIRE_MILLIS)]
    duration: u32,

    /// Delay in milliseconds after each interactive or --all cue.
    #[arg(long, default_value_t = cue_sequencer::config::DEFAULT_FIRE_MILLIS)]
    delay: u32,
}

impl Cli {
    fn split(self) -> (ModeFlags, ControllerConfig, bool) {
        let flags = ModeFlags {
            file: self.file,
            interactive: self.interactive,
            build: self.build,
            output: self.output,
            all: self.all,
        };
        let config = ControllerConfig {
            bus: self.bus,
            negative: BoardConfig::new(BoardId(0), self.negative_address)
                .with_channels(self.channels),
            positive: BoardConfig::new(BoardId(1), self.positive_address)
                .with_channels(self.channels),
            duration: self.duration,
            delay: self.delay,
        };
        (flags, config, self.verbose)
    }
}

fn parse_address(value: &str) -> Result<u8, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse(),
    };
    match parsed {
        Ok(address) if address <= 0x7f => Ok(address),
        Ok(address) => Err(format!("{:#04x} is not a 7-bit I2C address", address)),
        Err(err) => Err(err.to_string()),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let (flags, config, verbose) = Cli::parse().split();
    init_tracing(verbose);

    // mode and geometry errors surface before any bus is opened
    let mode = flags.resolve()?;
    config.validate()?;
    let matrix = config.matrix();

    if let RunMode::Build(output) = &mode {
        let sequence = source::author_sequence(io::stdin().lock(), io::stdout(), matrix.len())?;
        source::save_sequence(output, &sequence)
            .with_context(|| format!("writing {}", output.display()))?;
        tracing::info!(instructions = sequence.len(), path = %output.display(), "firing order saved");
        return Ok(());
    }

    let sequence = match &mode {
        RunMode::File(path) => Some(
            source::load_sequence(path).with_context(|| format!("loading {}", path.display()))?,
        ),
        RunMode::AllCues => Some(FiringOrder::each_cue(
            matrix.len(),
            config.duration,
            config.delay,
        )),
        _ => None,
    };

    let mut bank = open_bank(&config)?;
    let result = fire(&mode, sequence.as_ref(), &matrix, &config, &mut bank);

    if let Err(err) = bank.all_off() {
        tracing::error!(%err, "could not return relays to off, check the boards");
    }
    result
}

fn open_bank(config: &ControllerConfig) -> Result<ExpanderBank<I2cdev>> {
    let mut bank = ExpanderBank::new();
    for board in [&config.negative, &config.positive] {
        let bus = I2cdev::new(&config.bus)
            .with_context(|| format!("opening {}", config.bus.display()))?;
        bank.add(board.id, Mcp23017::new(bus, board.address))?;
    }
    bank.init().context("initializing expanders")?;
    Ok(bank)
}

fn fire(
    mode: &RunMode,
    sequence: Option<&FiringOrder>,
    matrix: &CueMatrix,
    config: &ControllerConfig,
    bank: &mut ExpanderBank<I2cdev>,
) -> Result<()> {
    let mut sequencer = FiringSequencer::new(matrix, bank, Delay);

    match (mode, sequence) {
        (RunMode::Interactive, _) => {
            let fired = source::prompt_cues(io::stdin().lock(), io::stdout(), matrix.len(), |cue| {
                sequencer.fire_single(cue, config.duration, config.delay)
            });
            match fired {
                Ok(count) => tracing::info!(cues = count, "interactive session ended"),
                Err(PromptError::Firing(err)) => {
                    tracing::error!(%err, "CRITICAL: relay may remain energized");
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            }
        }
        (_, Some(sequence)) => {
            tracing::info!(
                instructions = sequence.len(),
                millis = sequence.total_millis(),
                "running firing sequence"
            );
            if let Err(err) = sequencer.run(sequence) {
                if err.is_critical() {
                    tracing::error!(%err, "CRITICAL: relay may remain energized");
                }
                return Err(err.into());
            }
            tracing::info!("firing sequence complete");
        }
        (_, None) => bail!("no firing sequence for {:?}", mode),
    }

    Ok(())
}
