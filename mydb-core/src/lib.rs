pub mod driver;
pub mod error;

pub use driver::{Capability, Connection, DispatchTable, Driver, Slot};
pub use error::DriverError;
