use crate::seed::{ensure_system_user, SeedOutcome, SystemUser};
use crate::Migrator;
use application::auth::PasswordHasher;
use log::{error, info};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("migration {name} failed: {source}")]
    Migration { name: String, source: DbErr },
    #[error("seed failed: {0}")]
    Seed(String),
}

/// Which steps a bootstrap run performs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BootstrapOptions {
    pub migrate: bool,
    pub seed: bool,
}

/// Furthest point a run reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    Idle,
    SchemaApplied,
    SystemUserEnsured,
    Committed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapReport {
    pub stage: BootstrapStage,
    pub migrations_applied: usize,
    pub seed: Option<SeedOutcome>,
}

/// Runs the requested steps inside a single transaction.
///
/// Nothing is persisted unless every step succeeds. Running it again on an
/// up to date database changes nothing.
pub async fn run(
    db: &DatabaseConnection,
    options: BootstrapOptions,
    system: &SystemUser,
    hasher: &dyn PasswordHasher,
) -> Result<BootstrapReport, BootstrapError> {
    if !options.migrate && !options.seed {
        info!("bootstrap: nothing requested (use --migrate and/or --seed)");
        return Ok(BootstrapReport {
            stage: BootstrapStage::Idle,
            migrations_applied: 0,
            seed: None,
        });
    }

    let txn = db.begin().await?;
    match steps(&txn, options, system, hasher).await {
        Ok(mut report) => {
            txn.commit().await?;
            report.stage = BootstrapStage::Committed;
            info!(
                "bootstrap committed: migrations_applied={} seed={:?}",
                report.migrations_applied, report.seed
            );
            Ok(report)
        }
        Err(e) => {
            error!("bootstrap failed, rolling back: {}", e);
            if let Err(rollback_err) = txn.rollback().await {
                error!("rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

async fn steps(
    txn: &DatabaseTransaction,
    options: BootstrapOptions,
    system: &SystemUser,
    hasher: &dyn PasswordHasher,
) -> Result<BootstrapReport, BootstrapError> {
    let mut report = BootstrapReport {
        stage: BootstrapStage::Idle,
        migrations_applied: 0,
        seed: None,
    };

    if options.migrate {
        let manager = SchemaManager::new(txn);
        for migration in Migrator::migrations() {
            let name = migration.name().to_string();
            info!("applying migration {}", name);
            migration
                .up(&manager)
                .await
                .map_err(|source| BootstrapError::Migration { name, source })?;
            report.migrations_applied += 1;
        }
        report.stage = BootstrapStage::SchemaApplied;
    }

    if options.seed {
        report.seed = Some(ensure_system_user(txn, system, hasher).await?);
        report.stage = BootstrapStage::SystemUserEnsured;
    }

    Ok(report)
}
