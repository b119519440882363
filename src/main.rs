use clap::{CommandFactory, Parser};
use clap_complete::generate;
use envoy_lib::cli::{Cli, Commands};
use envoy_lib::{logging, run};
use std::io;

fn main() {
    logging::init();
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut io::stdout());
        return;
    }

    std::process::exit(run::run(cli));
}
