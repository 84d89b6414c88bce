use std::process::ExitCode;

use clap::Parser;

use clientmerge_cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    clientmerge_observability::init(&cli.log_options());

    let stdout = std::io::stdout();
    match clientmerge_cli::run(&cli, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
