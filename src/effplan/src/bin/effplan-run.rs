#![forbid(unsafe_code)]

use clap::Parser;
use effplan::pipeline;
use std::io;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[clap(version = option_env!("EFFPLAN_VERSION").unwrap_or("dev"))]
struct CommandLineArguments {
  /// Path to the toml pipeline configuration.
  #[clap(long, short)]
  config: String,
}

async fn run(config: pipeline::Configuration) -> io::Result<()> {
  let outcome = pipeline::execute(&config)?;
  let synchronous = outcome.is_immediate();

  let value = outcome.await?;
  tracing::info!("pipeline complete (synchronous: {synchronous})");

  println!("{}", serde_json::to_string_pretty(&value)?);
  Ok(())
}

fn main() -> io::Result<()> {
  if let Err(error) = dotenv::dotenv() {
    eprintln!("no '.env' file found ({error})");
  }
  let arguments = CommandLineArguments::parse();

  tracing_subscriber::registry()
    .with(tracing_subscriber::fmt::layer())
    .with(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let config_contents = std::fs::read_to_string(&arguments.config).map_err(|error| {
    tracing::error!("unable to read pipeline '{}' - {error}", arguments.config);
    error
  })?;
  let config = toml::from_str::<pipeline::Configuration>(config_contents.as_str())
    .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, format!("{}: {error}", arguments.config)))?;

  tracing::info!("pipeline '{}' loaded: {}", arguments.config, config.describe());
  async_std::task::block_on(run(config))
}
