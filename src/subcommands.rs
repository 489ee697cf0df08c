// Copyright 2018-2022 Cargill Incorporated
// Copyright 2018 Intel Corporation
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod error;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use clap::ArgMatches;
use diesel::Connection;
use uuid::Uuid;

use crate::database::{self, ConnectionUri};
use crate::env_config::Config;
use crate::modules::context::RequestContext;
use crate::modules::profile::ProfileStore;

use self::error::CliError;

/// A CLI Command Action.
///
/// An Action is a single subcommand for CLI operations.
pub trait Action {
    /// Run a CLI Action with the given args
    fn run(&mut self, arg_matches: Option<&ArgMatches>) -> Result<(), CliError>;
}

/// A collection of Subcommands associated with a single parent command.
#[derive(Default)]
pub struct SubcommandActions<'a> {
    actions: HashMap<String, Box<dyn Action + 'a>>,
}

impl<'a> SubcommandActions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command<'action: 'a, A: Action + 'action>(
        mut self,
        command: &str,
        action: A,
    ) -> Self {
        self.actions.insert(command.to_string(), Box::new(action));

        self
    }
}

impl<'s> Action for SubcommandActions<'s> {
    fn run(&mut self, arg_matches: Option<&ArgMatches>) -> Result<(), CliError> {
        let args = arg_matches.ok_or(CliError::RequiresArgs)?;

        match args.subcommand() {
            Some((subcommand, args)) => {
                if let Some(action) = self.actions.get_mut(subcommand) {
                    action.run(Some(args))
                } else {
                    Err(CliError::InvalidSubcommand)
                }
            }
            None => Ok(()),
        }
    }
}

/// Resolves the database to use: `--connect` wins over the configured URL.
fn connection_uri(
    arg_matches: Option<&ArgMatches>,
    config: &Config,
) -> Result<ConnectionUri, CliError> {
    let url = match arg_matches.and_then(|args| args.get_one::<String>("connect")) {
        Some(url) => url.to_owned(),
        None => config
            .database_url
            .as_ref()
            .map(|url| url.expose_secret().to_owned())
            .ok_or_else(|| {
                CliError::EnvironmentError(
                    "No database configured; set DATABASE_URL or pass --connect".to_string(),
                )
            })?,
    };

    Ok(ConnectionUri::from_str(&url)?)
}

fn profile_store(
    arg_matches: Option<&ArgMatches>,
    config: &Config,
) -> Result<Box<dyn ProfileStore>, CliError> {
    let uri = connection_uri(arg_matches, config)?;
    let pool = database::create_connection_pool(&uri, config.pool_settings())?;
    let factory = database::create_store_factory(&pool)?;

    Ok(factory.get_profile_store())
}

fn required_id(arg_matches: Option<&ArgMatches>) -> Result<Uuid, CliError> {
    let id = arg_matches
        .and_then(|args| args.get_one::<String>("id"))
        .ok_or(CliError::RequiresArgs)?;

    Uuid::from_str(id)
        .map_err(|err| CliError::ActionError(format!("Invalid profile id '{}': {}", id, err)))
}

pub struct MigrateAction {
    config: Arc<Config>,
}

impl MigrateAction {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl Action for MigrateAction {
    fn run(&mut self, arg_matches: Option<&ArgMatches>) -> Result<(), CliError> {
        match connection_uri(arg_matches, &self.config)? {
            ConnectionUri::Memory => {
                log::info!("In-memory databases are migrated when they are opened");
            }
            #[cfg(feature = "sqlite")]
            ConnectionUri::Sqlite(path) => {
                let mut conn = diesel::SqliteConnection::establish(&path).map_err(|err| {
                    CliError::ActionError(format!(
                        "Failed to establish database connection to '{}': {}",
                        path, err
                    ))
                })?;

                log::info!("Running migrations against SQLite database: {}", path);
                crate::migrations::run_sqlite_migrations(&mut conn).map_err(|err| {
                    CliError::ActionError(format!("Unable to run SQLite migrations: {}", err))
                })?;
            }
            #[cfg(feature = "postgres")]
            ConnectionUri::Postgres(url) => {
                let mut conn = diesel::pg::PgConnection::establish(&url).map_err(|err| {
                    CliError::ActionError(format!(
                        "Failed to establish database connection: {}",
                        err
                    ))
                })?;

                log::info!("Running migrations against PostgreSQL database");
                crate::migrations::run_postgres_migrations(&mut conn).map_err(|err| {
                    CliError::ActionError(format!("Unable to run Postgres migrations: {}", err))
                })?;
            }
        }

        Ok(())
    }
}

pub struct GetProfileAction {
    config: Arc<Config>,
}

impl GetProfileAction {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl Action for GetProfileAction {
    fn run(&mut self, arg_matches: Option<&ArgMatches>) -> Result<(), CliError> {
        let id = required_id(arg_matches)?;
        let store = profile_store(arg_matches, &self.config)?;

        let profile = store.get_profile_by_id(&RequestContext::background(), &id)?;

        println!("id:       {}", profile.id());
        println!("login:    {}", profile.login());
        println!("username: {}", profile.username().unwrap_or("-"));
        println!(
            "session:  {}",
            if profile.refresh_token().is_empty() {
                "none"
            } else {
                "active"
            }
        );

        Ok(())
    }
}

pub struct LoginAction {
    config: Arc<Config>,
}

impl LoginAction {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl Action for LoginAction {
    fn run(&mut self, arg_matches: Option<&ArgMatches>) -> Result<(), CliError> {
        let login = arg_matches
            .and_then(|args| args.get_one::<String>("login"))
            .ok_or(CliError::RequiresArgs)?;
        let store = profile_store(arg_matches, &self.config)?;

        // Only the id is printed; the stored password never leaves the process.
        let (id, _) = store.authenticate_by_login(&RequestContext::background(), login)?;
        println!("{}", id);

        Ok(())
    }
}

pub struct DeleteProfileAction {
    config: Arc<Config>,
}

impl DeleteProfileAction {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl Action for DeleteProfileAction {
    fn run(&mut self, arg_matches: Option<&ArgMatches>) -> Result<(), CliError> {
        let id = required_id(arg_matches)?;
        let store = profile_store(arg_matches, &self.config)?;

        store.delete_profile_by_id(&RequestContext::background(), &id)?;
        log::info!("Deleted profile {}", id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::{Arg, Command};

    use super::*;
    use crate::env_config::SecretString;

    fn command() -> Command {
        Command::new("test")
            .arg(Arg::new("connect").long("connect").global(true))
            .subcommand(Command::new("get").arg(Arg::new("id").required(true)))
    }

    fn config(url: Option<&str>) -> Config {
        Config {
            database_url: url.map(|url| SecretString::new(url.to_string())),
            ..Config::default()
        }
    }

    #[test]
    fn connect_flag_overrides_config() {
        let matches = command()
            .try_get_matches_from(["test", "get", "--connect", "memory", "x"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();

        assert_eq!(
            connection_uri(Some(sub), &config(Some("profiles.db"))).unwrap(),
            ConnectionUri::Memory
        );
    }

    #[test]
    fn missing_url_is_an_environment_error() {
        match connection_uri(None, &config(None)) {
            Err(CliError::EnvironmentError(_)) => (),
            other => panic!("Expected environment error, got {:?}", other),
        }
    }

    #[test]
    fn invalid_id_is_rejected() {
        let matches = command()
            .try_get_matches_from(["test", "get", "not-a-uuid"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();

        match required_id(Some(sub)) {
            Err(CliError::ActionError(msg)) => assert!(msg.contains("not-a-uuid")),
            other => panic!("Expected invalid id error, got {:?}", other),
        }
    }

    #[test]
    fn unknown_subcommand_is_invalid() {
        let matches = Command::new("test")
            .subcommand(Command::new("other"))
            .try_get_matches_from(["test", "other"])
            .unwrap();

        let mut actions = SubcommandActions::new()
            .with_command("get", GetProfileAction::new(Arc::new(config(None))));
        match actions.run(Some(&matches)) {
            Err(CliError::InvalidSubcommand) => (),
            other => panic!("Expected invalid subcommand, got {:?}", other),
        }
    }

    #[test]
    fn get_against_empty_memory_database_fails() {
        let id = Uuid::new_v4().to_string();
        let matches = command()
            .try_get_matches_from(["test", "get", "--connect", "memory", id.as_str()])
            .unwrap();

        let mut actions = SubcommandActions::new()
            .with_command("get", GetProfileAction::new(Arc::new(config(None))));
        match actions.run(Some(&matches)) {
            Err(CliError::ActionError(msg)) => assert!(msg.contains("does not exist")),
            other => panic!("Expected not found, got {:?}", other),
        }
    }
}
