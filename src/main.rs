mod cli;
mod decor;
mod metrics;
mod sim;
mod tui;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, Simulate, Units};
use crate::decor::speed::format_speed;
use crate::decor::{FormatError, NumFormat, Unit};
use crate::sim::run_simulate;

fn simulate(sim: Simulate) -> Result<()> {
    let stop_flag = Arc::new(AtomicBool::new(false));
    {
        let stop = stop_flag.clone();
        let _ = ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
        });
    }

    let json = sim.json;
    let report = run_simulate(sim, stop_flag)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn units(units: Units) -> Result<()> {
    let format = NumFormat::parse(&units.format)
        .with_context(|| format!("Parsing format {:?}", units.format))?;
    println!("{}", format_speed(&format, Unit::from(units.unit), units.value));
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let cli = Cli::parse();
    let result: Result<()> = match cli.command {
        Some(Commands::Simulate(sim)) => simulate(sim),
        Some(Commands::Units(u)) => units(u),
        None => {
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(err) = result {
        let code = exit_code_for_error(&err);
        eprintln!("error: {err:?}");
        std::process::exit(code);
    }
}

pub(crate) fn exit_code_for_error(err: &anyhow::Error) -> i32 {
    // 2: bad format, 4: terminal or output failure, 1: other
    for cause in err.chain() {
        if cause.is::<FormatError>() {
            return 2;
        }
        if cause.is::<std::io::Error>() {
            return 4;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_bad_format() {
        let err = anyhow::Error::from(FormatError::MissingVerb).context("Parsing format \"abc\"");
        assert_eq!(exit_code_for_error(&err), 2);
    }

    #[test]
    fn exit_code_io_error() {
        let err = anyhow::Error::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert_eq!(exit_code_for_error(&err), 4);
    }

    #[test]
    fn exit_code_other() {
        let err = anyhow::anyhow!("other");
        assert_eq!(exit_code_for_error(&err), 1);
    }

    #[test]
    fn units_rejects_bad_format() {
        let err = units(Units { value: 1.0, unit: cli::UnitOpt::None, format: "%q".into() }).unwrap_err();
        assert_eq!(exit_code_for_error(&err), 2);
    }
}
