//! Controller configuration and run-mode selection.

use crate::board::{BoardConfig, MAX_CHANNELS};
use crate::matrix::CueMatrix;
use crate::types::BoardId;
use std::path::PathBuf;

/// Default I2C bus device on a Raspberry Pi.
pub const DEFAULT_BUS: &str = "/dev/i2c-1";

/// Default address of the negative board.
pub const DEFAULT_NEGATIVE_ADDRESS: u8 = 0x20;

/// Default address of the positive board.
pub const DEFAULT_POSITIVE_ADDRESS: u8 = 0x22;

/// Hold and delay used for operator-entered cues, in milliseconds.
pub const DEFAULT_FIRE_MILLIS: u32 = 1000;

/// Board geometry and timing defaults for one controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// I2C bus device path shared by both boards.
    pub bus: PathBuf,
    /// Negative board (cue matrix inner axis).
    pub negative: BoardConfig,
    /// Positive board (cue matrix outer axis).
    pub positive: BoardConfig,
    /// Hold time for interactive and all-cue firing.
    pub duration: u32,
    /// Post-fire delay for interactive and all-cue firing.
    pub delay: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            bus: PathBuf::from(DEFAULT_BUS),
            negative: BoardConfig::new(BoardId(0), DEFAULT_NEGATIVE_ADDRESS),
            positive: BoardConfig::new(BoardId(1), DEFAULT_POSITIVE_ADDRESS),
            duration: DEFAULT_FIRE_MILLIS,
            delay: DEFAULT_FIRE_MILLIS,
        }
    }
}

impl ControllerConfig {
    /// Checks the board geometry.
    ///
    /// # Errors
    /// * `Conflict` - both boards share an address or id
    /// * `InvalidChannels` - a board has zero or more than 16 channels
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.negative.address == self.positive.address {
            return Err(ConfigError::Conflict(
                "negative and positive boards share an I2C address",
            ));
        }
        if self.negative.id == self.positive.id {
            return Err(ConfigError::Conflict(
                "negative and positive boards share a board id",
            ));
        }
        for board in [&self.negative, &self.positive] {
            if board.channels == 0 || board.channels as usize > MAX_CHANNELS {
                return Err(ConfigError::InvalidChannels(board.channels));
            }
        }
        Ok(())
    }

    /// Builds the cue matrix for this controller.
    pub fn matrix(&self) -> CueMatrix {
        crate::build_matrix(&self.negative, &self.positive)
    }
}

/// How the controller obtains its instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Fire a sequence loaded from a JSON file.
    File(PathBuf),
    /// Prompt the operator for cue numbers and fire each one.
    Interactive,
    /// Author a sequence interactively and save it. No hardware is opened.
    Build(PathBuf),
    /// Fire every cue once, in cue-number order.
    AllCues,
}

/// Raw mode flags as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeFlags {
    /// `--file PATH`
    pub file: Option<PathBuf>,
    /// `--interactive`
    pub interactive: bool,
    /// `--build`
    pub build: bool,
    /// `--output PATH`
    pub output: Option<PathBuf>,
    /// `--all`
    pub all: bool,
}

impl ModeFlags {
    /// Resolves the flags to exactly one run mode.
    ///
    /// # Errors
    /// * `MissingMode` - no mode flag given
    /// * `Conflict` - more than one mode, or `--build`/`--output` given alone
    pub fn resolve(self) -> Result<RunMode, ConfigError> {
        let selected = [self.file.is_some(), self.interactive, self.build, self.all]
            .iter()
            .filter(|&&set| set)
            .count();

        if selected > 1 {
            return Err(ConfigError::Conflict(
                "choose exactly one of --file, --interactive, --build or --all",
            ));
        }
        if self.output.is_some() && !self.build {
            return Err(ConfigError::Conflict("--output is only valid with --build"));
        }

        match self {
            ModeFlags {
                file: Some(path), ..
            } => Ok(RunMode::File(path)),
            ModeFlags {
                interactive: true, ..
            } => Ok(RunMode::Interactive),
            ModeFlags {
                build: true,
                output: Some(path),
                ..
            } => Ok(RunMode::Build(path)),
            ModeFlags { build: true, .. } => {
                Err(ConfigError::Conflict("--build requires --output"))
            }
            ModeFlags { all: true, .. } => Ok(RunMode::AllCues),
            _ => Err(ConfigError::MissingMode),
        }
    }
}

/// Configuration errors, all detected before any hardware is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Contradictory options.
    Conflict(&'static str),

    /// No run mode requested.
    MissingMode,

    /// Channel count outside 1..=16.
    InvalidChannels(u8),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::Conflict(reason) => write!(f, "conflicting options: {}", reason),
            ConfigError::MissingMode => {
                write!(f, "no run mode given (use --file, --interactive, --build or --all)")
            }
            ConfigError::InvalidChannels(channels) => {
                write!(
                    f,
                    "boards must have between 1 and {} channels, got {}",
                    MAX_CHANNELS, channels
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_flags_resolve() {
        let file = ModeFlags {
            file: Some("show.json".into()),
            ..Default::default()
        };
        assert_eq!(file.resolve(), Ok(RunMode::File("show.json".into())));

        let interactive = ModeFlags {
            interactive: true,
            ..Default::default()
        };
        assert_eq!(interactive.resolve(), Ok(RunMode::Interactive));

        let all = ModeFlags {
            all: true,
            ..Default::default()
        };
        assert_eq!(all.resolve(), Ok(RunMode::AllCues));

        let build = ModeFlags {
            build: true,
            output: Some("out.json".into()),
            ..Default::default()
        };
        assert_eq!(build.resolve(), Ok(RunMode::Build("out.json".into())));
    }

    #[test]
    fn file_and_interactive_conflict() {
        let flags = ModeFlags {
            file: Some("show.json".into()),
            interactive: true,
            ..Default::default()
        };
        assert!(matches!(flags.resolve(), Err(ConfigError::Conflict(_))));
    }

    #[test]
    fn output_requires_build_and_build_requires_output() {
        let output_only = ModeFlags {
            interactive: true,
            output: Some("out.json".into()),
            ..Default::default()
        };
        assert!(matches!(output_only.resolve(), Err(ConfigError::Conflict(_))));

        let build_only = ModeFlags {
            build: true,
            ..Default::default()
        };
        assert_eq!(
            build_only.resolve(),
            Err(ConfigError::Conflict("--build requires --output"))
        );
    }

    #[test]
    fn no_flags_is_missing_mode() {
        assert_eq!(ModeFlags::default().resolve(), Err(ConfigError::MissingMode));
    }

    #[test]
    fn default_config_is_valid_with_256_cues() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.matrix().len(), 256);
    }

    #[test]
    fn shared_address_is_rejected() {
        let mut config = ControllerConfig::default();
        config.positive.address = config.negative.address;
        assert!(matches!(config.validate(), Err(ConfigError::Conflict(_))));

        let mut config = ControllerConfig::default();
        config.negative.channels = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidChannels(0)));
    }

    #[test]
    fn oversized_board_is_rejected_not_clamped() {
        let mut config = ControllerConfig::default();
        config.positive = config.positive.with_channels(40);
        assert_eq!(config.validate(), Err(ConfigError::InvalidChannels(40)));

        config.positive = config.positive.with_channels(16);
        assert!(config.validate().is_ok());
    }
}
