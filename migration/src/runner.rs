use colored::Colorize;
use futures::FutureExt;
use sea_orm_migration::prelude::*;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

/// Applies every registered migration in order, one status line per step.
/// The first failed or panicking step aborts the process, leaving the
/// schema at the last good step.
pub async fn apply_pending(url: &str) {
    let db = sea_orm::Database::connect(url)
        .await
        .expect("cannot open database");
    let manager = SchemaManager::new(&db);

    let steps = <migration::Migrator as MigratorTrait>::migrations();
    let total = steps.len();
    println!("{total} migration steps");

    for (pos, step) in steps.into_iter().enumerate() {
        apply_step(&manager, step, pos + 1, total).await;
    }
}

async fn apply_step(
    manager: &SchemaManager<'_>,
    step: Box<dyn MigrationTrait>,
    pos: usize,
    total: usize,
) {
    let label = format!("[{pos:>2}/{total}] {}", step.name());
    let started = Instant::now();

    match AssertUnwindSafe(step.up(manager)).catch_unwind().await {
        Ok(Ok(())) => {
            let elapsed = format!("{:.2?}", started.elapsed());
            println!("{label} {} {}", "ok".green(), elapsed.dimmed());
        }
        Ok(Err(e)) => {
            eprintln!("{label} {}: {e}", "error".red());
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("{label} {}", "panicked".red());
            std::process::exit(1);
        }
    }
}
