pub mod history;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use history::{process_history_command, process_today_command, HistoryCommand, SourceArgs};
use tracing::error;

use crate::{
    daemon::{args::DaemonArgs, run_daemon},
    server::{start_server, ServerArgs},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX, SERVER_PREFIX},
        runtime::multi_thread_runtime,
    },
};

#[derive(Parser, Debug)]
#[command(name = "leettrack", version, long_about = None)]
#[command(about = "Tracks time spent on coding-practice problems", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Run the stats api that stores daily records")]
    Serve {
        #[command(flatten)]
        args: ServerArgs,
    },
    #[command(
        about = "Run the tracker in the current console. Reads browser messages from stdin and answers on stdout"
    )]
    Track {
        #[command(flatten)]
        args: DaemonArgs,
    },
    #[command(about = "Show today's stats")]
    Today {
        #[command(flatten)]
        source: SourceArgs,
    },
    #[command(about = "Show the stats of a day or a summary of every recorded day")]
    History {
        #[command(flatten)]
        command: HistoryCommand,
    },
}

pub fn run_cli() -> Result<()> {
    let args = Args::parse();
    let app_dir = create_application_default_path()?;

    match args.commands {
        // The tracker builds its own single threaded runtime.
        Commands::Track { args } => run_daemon(args),
        Commands::Serve { args } => {
            let record_dir = args.dir.clone().unwrap_or_else(|| app_dir.join("stats"));
            enable_logging(
                SERVER_PREFIX,
                &app_dir.join("logs"),
                args.log,
                args.log_console,
            )?;
            multi_thread_runtime()?
                .block_on(start_server(args.socket_addr(), record_dir))
                .inspect_err(|e| error!("Server stopped with an error {e:?}"))
        }
        Commands::Today { source } => {
            enable_logging(CLI_PREFIX, &app_dir.join("logs"), None, false)?;
            multi_thread_runtime()?.block_on(process_today_command(source))
        }
        Commands::History { command } => {
            enable_logging(CLI_PREFIX, &app_dir.join("logs"), None, false)?;
            multi_thread_runtime()?.block_on(process_history_command(command))
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Args, Commands};

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_subcommands_parse() {
        let args = Args::parse_from(["leettrack", "history", "yesterday", "--plain"]);
        assert!(matches!(args.commands, Commands::History { .. }));

        let args = Args::parse_from(["leettrack", "serve", "--addr", "127.0.0.1:4000"]);
        let Commands::Serve { args } = args.commands else {
            panic!("Expected serve");
        };
        assert_eq!(args.socket_addr().port(), 4000);

        let args = Args::parse_from(["leettrack", "track", "--offline"]);
        assert!(matches!(args.commands, Commands::Track { args } if args.offline));
    }
}
