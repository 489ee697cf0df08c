#[macro_use]
extern crate async_trait;

#[macro_use]
extern crate anyhow;

pub mod database;
pub mod env_config;
pub mod migrations;
pub mod modules;
pub mod schema;
pub mod store;
pub mod subcommands;
