use clap::Parser;
use env_logger::Env;
use infra::auth::{AuthConfig, BcryptPasswordHasher};
use infra::config::AppConfigImpl;
use log::{error, info};
use migration::bootstrap::{self, BootstrapOptions};
use migration::seed::SystemUser;
use std::process::ExitCode;

/// Prepares the database: applies the schema and seeds the system account.
#[derive(Debug, Parser)]
#[command(name = "bootstrap", version, about)]
struct Cli {
    /// Apply the schema migrations
    #[arg(long)]
    migrate: bool,
    /// Ensure the system account exists
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let cli = Cli::parse();

    let cfg = match AppConfigImpl::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("could not load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let options = BootstrapOptions {
        migrate: cli.migrate,
        seed: cli.seed,
    };
    if !options.migrate && !options.seed {
        info!("nothing to do: pass --migrate and/or --seed");
        return ExitCode::SUCCESS;
    }

    let db = match infra::database::connect(cfg.database()).await {
        Ok(db) => db,
        Err(e) => {
            error!("could not connect to database: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let system = SystemUser::new(&cfg.seed().system_password);
    let hasher = BcryptPasswordHasher::new(cfg.salt_cost());

    match bootstrap::run(&db, options, &system, &hasher).await {
        Ok(report) => {
            info!("bootstrap finished: {:?}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("bootstrap aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
