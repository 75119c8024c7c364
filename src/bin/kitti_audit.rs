//! kitti-audit entry point.
//!
//! Initializes logging and delegates to the CLI module for command handling.

use env_logger::Env;

fn main() -> anyhow::Result<()> {
    let cli = rusty_kitti::cli::parse_cli();

    // RUST_LOG wins over --log-level
    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log_level.as_str())).init();

    rusty_kitti::cli::run_with_cli(cli)
}
