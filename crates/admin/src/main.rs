use anyhow::Context;
use clap::Parser;
use idm_core::config::DbConfig;
use idm_db::repositories::{PgEmployeeRepo, PgRoleRepo};
use idm_db::DbPool;
use idm_service::{EmployeeResponse, EmployeeService, RoleResponse, RoleService};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

#[derive(Debug, Serialize)]
struct Inventory {
    employees: Vec<EmployeeResponse>,
    roles: Vec<RoleResponse>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.json_logs);

    let config = DbConfig::load(&cli.env_file)
        .with_context(|| format!("loading database config from {}", cli.env_file.display()))?;

    let pool = idm_db::connect(&config)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    idm_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    let inventory = inventory(&pool, &config).await;
    pool.close().await;

    let inventory = inventory?;
    println!("{}", serde_json::to_string_pretty(&inventory)?);
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "idm_admin=debug,idm_db=debug,idm_service=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn inventory(pool: &DbPool, config: &DbConfig) -> anyhow::Result<Inventory> {
    let employees =
        EmployeeService::new(PgEmployeeRepo::new(pool.clone()).with_timeout(config.query_timeout));
    let roles = RoleService::new(PgRoleRepo::new(pool.clone()).with_timeout(config.query_timeout));

    let inventory = Inventory {
        employees: employees.find_all().await?,
        roles: roles.find_all().await?,
    };
    tracing::info!(
        employees = inventory.employees.len(),
        roles = inventory.roles.len(),
        "Inventory loaded"
    );
    Ok(inventory)
}
