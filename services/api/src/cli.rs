use crate::infra::open_store;
use crate::report::{run_students_command, StudentsCommand};
use crate::server;
use clap::{Args, Parser, Subcommand};
use student_management::config::AppConfig;
use student_management::error::AppError;
use student_management::students::postgres::{connect, run_migrations};

#[derive(Parser, Debug)]
#[command(
    name = "Student Management",
    about = "Serve and inspect student registrations from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Apply database migrations to DATABASE_URL and exit
    Migrate,
    /// Print student details from the configured store
    Students {
        #[command(subcommand)]
        command: StudentsCommand,
    },
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Migrate => migrate().await,
        Command::Students { command } => {
            let config = AppConfig::load()?;
            let store = open_store(&config.database).await?;
            run_students_command(store, command).await
        }
    }
}

async fn migrate() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let pool = connect(&config.database).await?;
    run_migrations(&pool).await?;
    println!("Migrations applied.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve_and_parses_subcommands() {
        let cli = Cli::try_parse_from(["student-management-api"]).expect("parses");
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["student-management-api", "serve", "--port", "8080"])
            .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => assert_eq!(args.port, Some(8080)),
            other => panic!("expected serve, got {other:?}"),
        }

        let cli = Cli::try_parse_from(["student-management-api", "students", "show", "3"])
            .expect("parses");
        match cli.command {
            Some(Command::Students {
                command: StudentsCommand::Show { id },
            }) => assert_eq!(id, 3),
            other => panic!("expected students show, got {other:?}"),
        }
    }
}
