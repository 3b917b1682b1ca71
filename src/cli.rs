use clap::{Parser, Subcommand, ValueEnum};

use crate::decor::{FormatError, NumFormat, Unit, WidthConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drive a simulated transfer and render its speed decorators
    Simulate(Simulate),
    /// Render a single speed value through the decorator formatting
    Units(Units),
}

#[derive(Parser, Clone, Debug)]
pub struct Simulate {
    /// Total amount of work, in bytes
    #[arg(long, default_value_t = 64 << 20)]
    pub total: i64,

    /// Work completed per increment
    #[arg(long, default_value_t = 256 << 10)]
    pub chunk: i64,

    /// Time one increment takes, in milliseconds
    #[arg(long, default_value_t = 20)]
    pub delay_ms: u64,

    /// Extra time added to every third increment, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub jitter_ms: u64,

    /// Size unit for the speed columns
    #[arg(long, value_enum, default_value_t = UnitOpt::Kib)]
    pub unit: UnitOpt,

    /// printf style format for the speed value, e.g. "% .1f"
    #[arg(long, default_value = "% .1f", value_parser = parse_format)]
    pub format: String,

    /// Age of the moving average, in samples (0 for the default)
    #[arg(long, default_value_t = 0.0)]
    pub age: f64,

    /// Minimum width of every speed column
    #[arg(long, default_value_t = 0)]
    pub width: usize,

    /// Left-justify the speed columns
    #[arg(long)]
    pub ident_right: bool,

    /// Reserve one extra column for every speed column
    #[arg(long)]
    pub extra_space: bool,

    /// Text shown in the speed columns once the transfer completes
    #[arg(long)]
    pub complete_msg: Option<String>,

    /// Pause after this many increments
    #[arg(long)]
    pub pause_after: Option<u64>,

    /// Length of the pause, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub pause_ms: u64,

    /// Render in a full screen terminal UI
    #[arg(long)]
    pub tui: bool,

    /// Print a JSON report to stdout when done
    #[arg(long)]
    pub json: bool,
}

impl Simulate {
    pub fn width_config(&self) -> WidthConfig {
        let mut wc = WidthConfig::new(self.width);
        if self.ident_right {
            wc = wc.ident_right();
        }
        if self.extra_space {
            wc = wc.extra_space();
        }
        wc
    }
}

#[derive(Parser, Clone, Debug)]
pub struct Units {
    /// Speed value to render
    #[arg(allow_negative_numbers = true)]
    pub value: f64,

    /// Size unit
    #[arg(long, value_enum, default_value_t = UnitOpt::None)]
    pub unit: UnitOpt,

    /// printf style format for the value
    #[arg(long, default_value = "% .1f")]
    pub format: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum UnitOpt {
    None,
    Kib,
    Kb,
}

impl From<UnitOpt> for Unit {
    fn from(v: UnitOpt) -> Self {
        match v {
            UnitOpt::None => Unit::None,
            UnitOpt::Kib => Unit::KiB,
            UnitOpt::Kb => Unit::KB,
        }
    }
}

fn parse_format(s: &str) -> Result<String, FormatError> {
    NumFormat::parse(s)?;
    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulate_defaults() {
        let cli = Cli::parse_from(["barspeed", "simulate"]);
        let Some(Commands::Simulate(sim)) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(sim.total, 64 << 20);
        assert_eq!(sim.format, "% .1f");
        assert_eq!(Unit::from(sim.unit), Unit::KiB);
        assert_eq!(sim.width_config(), WidthConfig::new(0));
    }

    #[test]
    fn simulate_rejects_bad_format() {
        let res = Cli::try_parse_from(["barspeed", "simulate", "--format", "%x"]);
        assert!(res.is_err());
    }

    #[test]
    fn width_flags_from_cli() {
        let cli = Cli::parse_from(["barspeed", "simulate", "--width", "12", "--ident-right", "--extra-space"]);
        let Some(Commands::Simulate(sim)) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(sim.width_config(), WidthConfig::new(12).ident_right().extra_space());
    }

    #[test]
    fn units_accepts_negative_values() {
        let cli = Cli::parse_from(["barspeed", "units", "-5", "--unit", "kb"]);
        let Some(Commands::Units(units)) = cli.command else {
            panic!("expected units");
        };
        assert_eq!(units.value, -5.0);
        assert_eq!(Unit::from(units.unit), Unit::KB);
    }
}
