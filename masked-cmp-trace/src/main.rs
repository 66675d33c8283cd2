use std::io;

use anyhow::Context as _;
use clap::Parser;
use masked_cmp::Context;
use rand::{SeedableRng, rngs::StdRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;
mod dump;
mod serve;

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    // stdout carries status bytes in `serve`, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let params = cli.params();
    let verification = cli.verification();
    info!(?params, ?verification, seed = ?cli.seed, "starting");

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut ctx = Context::new(params, rng, verification).context("failed to set up buffers")?;

    match cli.command {
        Command::Dump { output, trials } => dump::run(&mut ctx, &output, trials),
        Command::Serve { protocol } => {
            let served = serve::serve(&mut ctx, protocol, io::stdin().lock(), io::stdout().lock())?;
            info!(served, "input closed");
            Ok(())
        }
    }
}
