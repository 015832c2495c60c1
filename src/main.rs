use clap::Parser;
use spottrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
