pub mod cli;
pub mod config;
pub mod db;
pub mod entities;

pub use cli::{Cli, Commands};
pub use config::Config;

use anyhow::Context;
use db::{AuthLogEntry, Dialect, Store};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    init_tracing(&config.general.log_level);

    match cli.command.unwrap_or(Commands::Init) {
        Commands::Schema { dialect } => {
            let dialect = match dialect {
                Some(tag) => tag.parse::<Dialect>()?,
                None => config.database.dialect()?,
            };
            for statement in db::schema::schema_sql(dialect) {
                println!("{statement};");
            }
            Ok(())
        }
        Commands::Init => {
            let store = connect(&config).await?;
            store.initialize_schema().await?;
            info!("Successfully created all tables");
            Ok(())
        }
        Commands::Ping => {
            connect(&config).await?;
            Ok(())
        }
        Commands::Log {
            action,
            ip,
            status,
            user_id,
            user_agent,
            description,
        } => {
            let store = connect(&config).await?;
            let mut entry = AuthLogEntry::new(user_id, action, ip, status);
            entry.user_agent = user_agent;
            entry.description = description;

            let id = store.record_auth_log(&entry).await?;
            info!(id, action = %entry.action, "Auth log recorded");
            Ok(())
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Validates config, waits the startup delay, connects and pings.
async fn connect(config: &Config) -> anyhow::Result<Store> {
    config.validate()?;

    let dialect = config.database.dialect()?;
    let conn = config.database.connection(dialect);
    info!(
        %dialect,
        host = %conn.host,
        user = %conn.user,
        database = %conn.database,
        "Database settings"
    );

    let delay = config.database.startup_delay();
    if !delay.is_zero() {
        info!("Waiting {}s before connecting", delay.as_secs());
        tokio::time::sleep(delay).await;
    }

    let store = Store::connect(&config.database).await?;
    store
        .ping()
        .await
        .with_context(|| format!("Failed to ping {dialect} database"))?;

    info!("Successfully connected to {dialect} database");
    Ok(store)
}
