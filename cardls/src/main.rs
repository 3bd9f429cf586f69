// SPDX-License-Identifier: MIT

use clap::Parser;
use std::io::Write;

use cardls::{Cli, run, utils::init_logger};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.options.log_level())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&cli, &mut out)?;
    out.flush()?;
    Ok(())
}
