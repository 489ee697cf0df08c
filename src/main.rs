use std::ffi::OsString;
use std::process;
use std::str::FromStr;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command};
use flexi_logger::{DeferredNow, LogSpecBuilder, Logger};
use log::{error, Record};

use profile_store::env_config::{self, Config};
use profile_store::subcommands::error::CliError;
use profile_store::subcommands::{
    Action, DeleteProfileAction, GetProfileAction, LoginAction, MigrateAction, SubcommandActions,
};

const APP_NAME: &str = "profile-store";
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn setup_logging(log_level: log::LevelFilter) -> Result<(), CliError> {
    let mut log_spec_builder = LogSpecBuilder::new();
    log_spec_builder.default(log_level);
    log_spec_builder.module("r2d2", log::LevelFilter::Warn);
    log_spec_builder.module("tokio", log::LevelFilter::Warn);

    match Logger::with(log_spec_builder.build())
        .format(log_format)
        .log_to_stdout()
        .start()
    {
        Ok(_) => {}
        #[cfg(test)]
        // `FlexiLoggerError::Log` means the logger has already been initialized; this will happen
        // when `run` is called more than once in the tests.
        Err(flexi_logger::FlexiLoggerError::Log(_)) => {}
        Err(err) => {
            return Err(CliError::EnvironmentError(format!(
                "Failed to start logger: {}",
                err
            )))
        }
    }

    Ok(())
}

// log format for cli that will only show the log message
pub fn log_format(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    write!(w, "{}", record.args(),)
}

fn command() -> Command {
    Command::new(APP_NAME)
        .version(VERSION)
        .about("Command line for the profile store")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Log verbosely"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .global(true)
                .conflicts_with("verbose")
                .help("Do not display output"),
        )
        .arg(
            Arg::new("connect")
                .long("connect")
                .value_name("URI")
                .global(true)
                .help("Database connection URI: memory, a SQLite file or a postgres:// URL"),
        )
        .subcommand(Command::new("migrate").about("Runs database migrations"))
        .subcommand(
            Command::new("get")
                .about("Shows a profile")
                .arg(Arg::new("id").required(true).help("Profile id")),
        )
        .subcommand(
            Command::new("login")
                .about("Prints the id of the profile with the given login")
                .arg(Arg::new("login").required(true)),
        )
        .subcommand(
            Command::new("delete")
                .about("Deletes a profile")
                .arg(Arg::new("id").required(true).help("Profile id")),
        )
}

fn log_level(matches: &ArgMatches, config: Option<&Config>) -> log::LevelFilter {
    if matches.get_flag("quiet") {
        return log::LevelFilter::Error;
    }
    match matches.get_count("verbose") {
        0 => config
            .and_then(|config| log::LevelFilter::from_str(&config.log_level).ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn run<I: IntoIterator<Item = T>, T: Into<OsString> + Clone>(args: I) -> Result<(), CliError> {
    let matches = command().try_get_matches_from(args)?;

    let config = env_config::read_config();
    setup_logging(log_level(&matches, config.as_ref().ok()))?;
    let config = Arc::new(config?);

    let mut subcommands = SubcommandActions::new()
        .with_command("migrate", MigrateAction::new(Arc::clone(&config)))
        .with_command("get", GetProfileAction::new(Arc::clone(&config)))
        .with_command("login", LoginAction::new(Arc::clone(&config)))
        .with_command("delete", DeleteProfileAction::new(config));

    subcommands.run(Some(&matches))
}

fn main() {
    if let Err(e) = run(std::env::args_os()) {
        match e {
            // Help and version output are reported as errors by clap.
            CliError::ClapError(err) => err.exit(),
            e => {
                error!("{}", e);
                process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_valid() {
        command().debug_assert();
    }

    #[test]
    fn verbosity_flags_select_level() {
        let matches = command()
            .try_get_matches_from(["profile-store", "-vv", "migrate"])
            .unwrap();
        assert_eq!(log_level(&matches, None), log::LevelFilter::Debug);

        let matches = command()
            .try_get_matches_from(["profile-store", "-q", "migrate"])
            .unwrap();
        assert_eq!(log_level(&matches, None), log::LevelFilter::Error);
    }

    #[test]
    fn configured_level_applies_without_flags() {
        let matches = command()
            .try_get_matches_from(["profile-store", "migrate"])
            .unwrap();
        let config = Config {
            log_level: "warn".to_string(),
            ..Config::default()
        };
        assert_eq!(log_level(&matches, Some(&config)), log::LevelFilter::Warn);
    }

    #[test]
    fn login_requires_an_argument() {
        assert!(command()
            .try_get_matches_from(["profile-store", "login"])
            .is_err());
    }
}
