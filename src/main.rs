use clap::Parser;

mod cli;

use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let dispatch = cli.dispatch()?;
    tracing::dispatcher::with_default(&dispatch, || cli.execute())
}
