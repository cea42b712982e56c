use blox_runner::{
    execute_generate, execute_kinds, execute_session_apply, execute_session_checkpoint, execute_session_new,
    execute_session_rollback, execute_session_show, init_tracing, resolve_config, Cli, Commands, SessionCommand,
};
use clap::Parser;

fn main() {
    let cli = Cli::parse();
    let config = match resolve_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };
    init_tracing(cli.verbose, config.log.filter.as_deref());

    let result = match &cli.command {
        Commands::Generate(command) => execute_generate(command, &config),
        Commands::Kinds(command) => execute_kinds(command, &config),
        Commands::Session(session_command) => match session_command {
            SessionCommand::New(command) => execute_session_new(command, &config),
            SessionCommand::Apply(command) => execute_session_apply(command, &config),
            SessionCommand::Checkpoint(command) => execute_session_checkpoint(command, &config),
            SessionCommand::Rollback(command) => execute_session_rollback(command, &config),
            SessionCommand::Show(command) => execute_session_show(command, &config),
        },
    };

    match result {
        Ok(output) => {
            println!("{output}");
        }
        Err(error) => {
            tracing::error!(error = %error, "command failed");
            eprintln!("{error}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
