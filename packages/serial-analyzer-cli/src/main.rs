use clap::Parser;

mod cli;
mod commands;
mod exit_codes;
mod output;

use cli::Cli;

/// Log level for the number of `-v` flags; `RUST_LOG` still takes precedence
fn log_level(verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let exit_code = match cli.command {
        cli::Command::Monitor(args) => commands::monitor::execute(args).await,
        cli::Command::Filter(args) => commands::filter::execute(args),
        cli::Command::Ports(args) => commands::ports::execute(args),
    };

    std::process::exit(exit_code);
}
