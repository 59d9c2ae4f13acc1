//! Thin launcher around the coupling runtime.
//!
//! Takes a link-configuration file, assembles the component graph from the
//! behavior registry and drives every component to completion. Exit code 0
//! on success, 1 on any load or configuration failure.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use simlink_core::component::BehaviorRegistry;
use simlink_core::io::LinkLoader;

mod behaviors;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
  Debug,
  Info,
  Warn,
  Err,
}

impl LogLevel {
  fn as_filter(self) -> &'static str {
    match self {
      LogLevel::Debug => "debug",
      LogLevel::Info => "info",
      LogLevel::Warn => "warn",
      LogLevel::Err => "error",
    }
  }
}

/// Run a coupled-model configuration to completion.
#[derive(Debug, Parser)]
#[command(name = "simlink", version, about)]
struct Args {
  /// Path to the link-configuration file.
  link_file: PathBuf,

  /// Log verbosity.
  #[arg(long, value_enum, default_value = "info")]
  log: LogLevel,
}

fn run(args: &Args) -> anyhow::Result<()> {
  let loader = LinkLoader::load(&args.link_file)
    .with_context(|| format!("loading link file [{}]", args.link_file.display()))?;

  let mut registry = BehaviorRegistry::new();
  behaviors::register_builtins(&mut registry);

  let (mut graph, mut controllers) = loader
    .assemble(&registry)
    .context("assembling the component graph")?;

  for cid in graph.component_ids() {
    graph.prepare(cid).context("preparing components")?;
  }

  // Iteration groups advance under their controllers; everything else is
  // pulled by the plain run loop.
  for controller in &mut controllers {
    let errors = controller
      .validate(&mut graph)
      .context("validating iteration controllers")?;
    if !errors.is_empty() {
      anyhow::bail!("iteration controller [{}] is invalid: {}", controller.id, errors.join("; "));
    }
    controller.prepare()?;
    while controller.status() == simlink_core::Status::Updated {
      controller.update(&mut graph)?;
    }
  }

  graph.run().context("running the coupled models")?;

  for cid in graph.component_ids() {
    graph.finish(cid).ok();
  }

  info!("run finished");
  Ok(())
}

fn main() -> ExitCode {
  let args = Args::parse();

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log.as_filter())),
    )
    .init();

  match run(&args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      error!("{err:#}");
      ExitCode::FAILURE
    }
  }
}
