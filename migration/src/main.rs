use std::{env, fs, path::Path};

mod runner;

/// `migration` applies pending steps; `migration clean` removes the database
/// file; `migration fresh` does both.
#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let db_path = env::var("DATABASE_PATH").expect("DATABASE_PATH must be set");
    let url = format!("sqlite://{db_path}?mode=rwc");

    match env::args().nth(1).as_deref() {
        Some("clean") => drop_database(&db_path),
        Some("fresh") => {
            drop_database(&db_path);
            ensure_parent_dir(&db_path);
            runner::apply_pending(&url).await;
        }
        _ => {
            ensure_parent_dir(&db_path);
            runner::apply_pending(&url).await;
        }
    }
}

fn drop_database(path: &str) {
    let file = Path::new(path);
    if file.exists() {
        fs::remove_file(file).expect("could not remove database file");
        println!("removed {}", file.display());
    }
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent).expect("could not create database directory");
    }
}
