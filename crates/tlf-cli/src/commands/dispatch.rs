use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;

/// Dispatch a parsed command to its handler; returns the process exit code.
pub async fn dispatch(command: Commands, flags: &GlobalFlags) -> anyhow::Result<i32> {
    match command {
        Commands::Run(args) => commands::run::handle(&args, flags).await,
        Commands::List => commands::list::handle(flags),
        Commands::Check => commands::check::handle(flags),
        Commands::Inspect(args) => commands::inspect::handle(&args, flags).await,
        Commands::Schema => commands::schema::handle(),
    }
}
