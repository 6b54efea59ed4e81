//! Late-bound database driver.
//!
//! Instead of linking against SQLite, the driver locates the native library
//! at initialization time, resolves a fixed set of symbols by name, and
//! routes every call through the resulting typed dispatch table. Two of the
//! capabilities (line reading and string formatting) come from the
//! process's own symbol namespace rather than the loaded library.
//!
//! ```no_run
//! use std::path::Path;
//! use mydb_core::Driver;
//!
//! # fn main() -> Result<(), mydb_core::DriverError> {
//! let driver = Driver::initialize()?;
//! let conn = driver.open(Path::new("users.db"))?;
//! driver.execute(&conn, "CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY);")?;
//! driver.close(conn);
//! # Ok(())
//! # }
//! ```

pub mod abi;
pub mod resolver;
pub mod session;

pub use abi::{Capability, DispatchTable, Slot};
pub use session::{Connection, Driver};
