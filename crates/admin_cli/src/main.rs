use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::Engine;
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "pool_party_admin")]
#[command(about = "Admin utilities for Pool Party (moderators, site instance)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./pool_party.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Site(Site),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// List every user that has logged in at least once.
    List,
    /// Grant or revoke the moderator flag.
    Moderator(ModeratorArgs),
}

#[derive(Args, Debug)]
struct ModeratorArgs {
    /// Identity provider subject id of the user.
    subject_id: String,
    #[command(flatten)]
    flag: ModeratorFlag,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ModeratorFlag {
    #[arg(long)]
    enable: bool,
    #[arg(long)]
    disable: bool,
}

#[derive(Args, Debug)]
struct Site {
    #[command(subcommand)]
    command: SiteCommand,
}

#[derive(Subcommand, Debug)]
enum SiteCommand {
    /// Create or replace the site title and headline.
    Set(SiteSetArgs),
}

#[derive(Args, Debug)]
struct SiteSetArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    headline: Option<String>,
}

async fn connect_db(database_url: &str) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::List,
        }) => {
            for user in engine.users().await? {
                let role = if user.is_moderator { "moderator" } else { "user" };
                println!(
                    "{}\t{}\t{} {}\t{role}",
                    user.subject_id, user.email, user.first_name, user.last_name
                );
            }
        }
        Command::User(User {
            command: UserCommand::Moderator(args),
        }) => {
            let enable = args.flag.enable && !args.flag.disable;
            let user = match engine.set_moderator(&args.subject_id, enable).await {
                Ok(user) => user,
                Err(engine::EngineError::KeyNotFound(_)) => {
                    eprintln!("user not found: {}", args.subject_id);
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            };
            let state = if user.is_moderator { "enabled" } else { "disabled" };
            println!("moderator {state} for {}", user.subject_id);
        }
        Command::Site(Site {
            command: SiteCommand::Set(args),
        }) => {
            let site = engine
                .set_site_instance(&args.title, args.headline.as_deref())
                .await?;
            println!("site title set: {}", site.site_title);
        }
    }

    Ok(())
}
