// SPDX-License-Identifier: MIT

pub mod cli;
pub mod commands;
pub mod profile;
pub mod utils;

pub use cli::{Cli, Commands, GlobalOptions};
pub use commands::run;
