use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use raccoon_db::db::{AppGroup, AppGroupDao, AppId, DataAccessObject, DatabaseManager, GroupId};
use raccoon_db::Config;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(version, about = "Manage app groups in a Raccoon database", long_about = None)]
struct Cli {
    /// Overrides `RACCOON_DATABASE__URL`
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or upgrade the app group tables
    Migrate,
    /// List all groups by name
    List {
        #[arg(long)]
        json: bool,
    },
    /// Create a group
    Add { name: String },
    /// Rename a group
    Rename { gid: GroupId, name: String },
    /// Delete a group and its memberships
    Remove { gid: GroupId },
    /// Add an app to a group
    Link { gid: GroupId, aid: AppId },
    /// Remove an app from a group
    Unlink { gid: GroupId, aid: AppId },
    /// List the app ids in a group
    Members { gid: GroupId },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut cfg = Config::load()?;
    if let Some(url) = cli.database_url {
        cfg.database.url = url;
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let manager = DatabaseManager::open(&cfg.database).await?;
    let version = manager.upgrade::<AppGroupDao>().await?;
    let dao = AppGroupDao::new(manager.clone());

    let result = run(&dao, version, cli.command).await;
    manager.close().await;
    for line in result? {
        println!("{line}");
    }
    Ok(())
}

/// Execute one command, returning the lines to print.
async fn run(
    dao: &AppGroupDao,
    version: i64,
    command: Commands,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let lines = match command {
        Commands::Migrate => {
            info!(dao = AppGroupDao::NAME, version, "schema ready");
            Vec::new()
        }
        Commands::List { json } => {
            let groups = dao.list().await?;
            if json {
                vec![serde_json::to_string_pretty(&groups)?]
            } else {
                groups.iter().map(|g| format!("{}\t{}", g.gid, g)).collect()
            }
        }
        Commands::Add { name } => {
            let mut group = AppGroup::new(name);
            match dao.insert(&mut group).await {
                Ok(gid) => vec![gid.to_string()],
                Err(e) => {
                    if e.is_unique_violation() {
                        warn!(name = %group.name, "a group with this name already exists");
                    }
                    return Err(e.into());
                }
            }
        }
        Commands::Rename { gid, name } => {
            dao.update(&AppGroup::with_id(gid, name)).await?;
            Vec::new()
        }
        Commands::Remove { gid } => {
            dao.delete(&by_id(gid)).await?;
            Vec::new()
        }
        Commands::Link { gid, aid } => {
            dao.link(&by_id(gid), aid).await?;
            Vec::new()
        }
        Commands::Unlink { gid, aid } => {
            dao.unlink(&by_id(gid), aid).await?;
            Vec::new()
        }
        Commands::Members { gid } => dao
            .members(&by_id(gid))
            .await?
            .iter()
            .map(ToString::to_string)
            .collect(),
    };
    Ok(lines)
}

/// Key-only handle for commands that address a group by id.
fn by_id(gid: GroupId) -> AppGroup {
    AppGroup::with_id(gid, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use raccoon_db::RaccoonError;
    use raccoon_db::config::DatabaseConfig;

    async fn memory_dao() -> AppGroupDao {
        let cfg = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            ..DatabaseConfig::default()
        };
        let manager = DatabaseManager::open(&cfg).await.unwrap();
        sqlx::query("CREATE TABLE androidapps (aid INTEGER PRIMARY KEY)")
            .execute(manager.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO androidapps (aid) VALUES (11)")
            .execute(manager.pool())
            .await
            .unwrap();
        manager.upgrade::<AppGroupDao>().await.unwrap();
        AppGroupDao::new(manager)
    }

    #[test]
    fn parses_group_and_app_ids() {
        let cli = Cli::try_parse_from(["raccoon-db", "link", "3", "11"]).unwrap();
        assert!(matches!(cli.command, Commands::Link { gid: 3, aid: 11 }));
        assert!(cli.database_url.is_none());

        let cli = Cli::try_parse_from(["raccoon-db", "rename", "4", "Arcade"]).unwrap();
        assert!(matches!(cli.command, Commands::Rename { gid: 4, ref name } if name == "Arcade"));
    }

    #[test]
    fn database_url_is_accepted_after_the_subcommand() {
        let cli =
            Cli::try_parse_from(["raccoon-db", "list", "--json", "--database-url", "sqlite::memory:"])
                .unwrap();
        assert!(matches!(cli.command, Commands::List { json: true }));
        assert_eq!(cli.database_url.as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn rejects_non_numeric_ids_and_missing_arguments() {
        assert!(Cli::try_parse_from(["raccoon-db", "remove", "games"]).is_err());
        assert!(Cli::try_parse_from(["raccoon-db", "add"]).is_err());
        assert!(Cli::try_parse_from(["raccoon-db"]).is_err());
    }

    #[tokio::test]
    async fn add_twice_reports_duplicate_name() {
        let dao = memory_dao().await;

        let out = run(&dao, 2, Commands::Add { name: "Games".into() }).await.unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].parse::<i64>().unwrap() > 0);

        let err = run(&dao, 2, Commands::Add { name: "Games".into() })
            .await
            .expect_err("duplicate name accepted");
        let err = err.downcast_ref::<RaccoonError>().expect("not a RaccoonError");
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn id_only_commands_address_the_group() {
        let dao = memory_dao().await;
        let gid = run(&dao, 2, Commands::Add { name: "Games".into() }).await.unwrap()[0]
            .parse::<GroupId>()
            .unwrap();

        run(&dao, 2, Commands::Link { gid, aid: 11 }).await.unwrap();
        let members = run(&dao, 2, Commands::Members { gid }).await.unwrap();
        assert_eq!(members, vec!["11".to_string()]);

        let listed = run(&dao, 2, Commands::List { json: false }).await.unwrap();
        assert_eq!(listed, vec![format!("{gid}\tGames")]);

        run(&dao, 2, Commands::Remove { gid }).await.unwrap();
        assert!(run(&dao, 2, Commands::List { json: false }).await.unwrap().is_empty());
        assert!(run(&dao, 2, Commands::Members { gid }).await.unwrap().is_empty());
    }
}
