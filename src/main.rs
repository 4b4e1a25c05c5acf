use anyhow::Result;
use clap::Parser;

use tasklight::cli::{Cli, CliCommand, TuiArgs};
use tasklight::{commands, config, logging, tui};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.clone() {
        Some(CliCommand::Tui(args)) => run_tui(&cli, &args)?,
        None => run_tui(&cli, &TuiArgs::default())?,
        Some(command) => {
            logging::init_stderr(cli.log_filter.as_deref())?;
            let config = config::from_cli(&cli)?;
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            commands::execute(&config, command, &mut handle)?;
        }
    }

    Ok(())
}

fn run_tui(cli: &Cli, args: &TuiArgs) -> Result<()> {
    let config = config::for_tui(cli, args)?;
    logging::init_file(cli.log_filter.as_deref(), &config.log_path())?;
    tui::run(config, config::tui_offline(args))
}
