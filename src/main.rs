use bedrs::cli;
use clap::Parser;
use miette::IntoDiagnostic;

fn main() -> miette::Result<()> {
    let args = cli::Args::parse();
    cli::run(&args).into_diagnostic()
}
