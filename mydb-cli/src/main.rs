//! A simple user lookup tool built on the late-bound driver.
//!
//! This is the fixed demonstration consumer: it reads an operator-supplied
//! username, substitutes it into a query template through the driver's
//! formatting passthrough, and executes the result verbatim. The driver
//! forwards statements exactly as given, so the substitution here is
//! knowingly unsafe (try `' OR 1=1 --` as the username).

use std::path::Path;

use anyhow::{bail, Context, Result};
use mydb_core::Driver;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DB_PATH: &str = "users.db";
const INPUT_CAPACITY: usize = 256;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (  id INTEGER PRIMARY KEY,  name TEXT NOT NULL,  role TEXT NOT NULL);",
    "INSERT OR IGNORE INTO users VALUES (1, 'alice', 'admin');",
    "INSERT OR IGNORE INTO users VALUES (2, 'bob',   'user');",
];

fn main() -> Result<()> {
    setup_tracing();

    let driver = Driver::initialize().context("failed to initialize the database driver")?;
    info!("driver initialized; opening {DB_PATH}");

    let conn = driver
        .open(Path::new(DB_PATH))
        .context("failed to open the database")?;

    for statement in SCHEMA {
        // Setup failures are already logged by the driver; keep going.
        let _ = driver.execute(&conn, statement);
    }

    let username = match driver.read_line("Enter username to look up: ", INPUT_CAPACITY)? {
        Some(username) => username,
        None => {
            driver.close(conn);
            bail!("failed to read input");
        }
    };

    let query = driver.format_string("SELECT * FROM users WHERE name = '%s';", &username)?;
    println!("Running query: {query}");
    let _ = driver.execute(&conn, &query);

    driver.close(conn);
    Ok(())
}

fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
