use clap::Parser;
use credstore::cli::commands;
use credstore::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    credstore::logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Get {
            ref service,
            ref user,
            show_user,
        } => commands::get::execute(&cli, service, user.as_deref(), show_user),
        Commands::Set {
            ref service,
            ref user,
            ref value,
        } => commands::set::execute(&cli, service, user.as_deref(), value.as_deref()),
        Commands::Remove {
            ref service,
            ref user,
            force,
        } => commands::remove::execute(&cli, service, user.as_deref(), force),
        Commands::List => commands::list::execute(&cli),
        Commands::Clear { force } => commands::clear::execute(&cli, force),
        Commands::DeleteStorage { force } => commands::delete_storage::execute(&cli, force),
        Commands::RotateKey { password } => commands::rotate::execute(&cli, password),
        Commands::Status => commands::status::execute(&cli),
        Commands::Version => commands::version::execute(),
        Commands::Completions { shell } => commands::completions::execute(shell),
    };

    if let Err(e) = result {
        credstore::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
