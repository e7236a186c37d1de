use anyhow::Context;
use clap::{Parser, Subcommand};
use relay_api::{build_router, AppState};
use relay_config::load as load_config;
use relay_database::{employee_repository, initialize_database};
use relay_runtime::{telemetry, MessagingServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Relay business messaging service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Register or refresh an employee in the local directory
    AddEmployee {
        #[arg(long)]
        business: i64,
        #[arg(long)]
        user: i64,
        #[arg(long = "ref")]
        employee_ref: String,
    },
    /// Mark an employee as no longer employed
    RemoveEmployee {
        #[arg(long)]
        business: i64,
        #[arg(long)]
        user: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing().context("failed to initialise tracing")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::Migrate => migrate().await,
        Commands::AddEmployee {
            business,
            user,
            employee_ref,
        } => add_employee(business, user, &employee_ref).await,
        Commands::RemoveEmployee { business, user } => remove_employee(business, user).await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    info!("starting Relay");

    let config = load_config().context("failed to load configuration")?;

    let services = MessagingServices::initialise(&config)
        .await
        .context("failed to initialise messaging services")?;

    let app = build_router(AppState::new(services.core.clone()));

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(relay_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("relay shut down");
    Ok(())
}

async fn migrate() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    initialize_database(&config.database)
        .await
        .context("failed to migrate database")?;

    info!(url = %config.database.url, "database is up to date");
    Ok(())
}

async fn add_employee(business_id: i64, user_id: i64, employee_ref: &str) -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    let pool = initialize_database(&config.database)
        .await
        .context("failed to prepare database")?;

    let mut conn = pool
        .acquire()
        .await
        .context("failed to acquire connection")?;
    let employee = employee_repository::upsert(&mut conn, business_id, user_id, employee_ref)
        .await
        .context("failed to register employee")?;

    println!(
        "employee {} registered for user {} in business {}",
        employee.employee_ref, employee.user_id, employee.business_id
    );
    Ok(())
}

async fn remove_employee(business_id: i64, user_id: i64) -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    let pool = initialize_database(&config.database)
        .await
        .context("failed to prepare database")?;

    let mut conn = pool
        .acquire()
        .await
        .context("failed to acquire connection")?;
    let removed = employee_repository::deactivate(&mut conn, business_id, user_id)
        .await
        .context("failed to deactivate employee")?;

    if removed {
        println!("user {user_id} is no longer an employee of business {business_id}");
    } else {
        println!("user {user_id} was not an active employee of business {business_id}");
    }
    Ok(())
}
