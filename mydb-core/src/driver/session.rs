//! The driver context and connection handle.
//!
//! `Driver` owns the dispatch table built by the resolver (and keeps the
//! loaded library alive for as long as any pointer in the table may be
//! dereferenced). Every public operation forwards through exactly one
//! table slot; an unresolved slot surfaces as a typed error, never a
//! dereference.
//!
//! The execute operation forwards the statement string exactly as given.
//! It is never inspected, parsed, or parameterized here; the safety of the
//! statement's content is entirely the caller's responsibility.

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::io::{self, Write};
use std::path::Path;
use std::ptr;

use libloading::Library;
use tracing::{debug, error, warn};

use super::abi::{Capability, CloseFn, DispatchTable, Slot};
use super::resolver::{self, Resolution};
use crate::error::DriverError;

/// Default destination bound for [`Driver::format_string`].
const FORMAT_CAPACITY: usize = 512;

/// The driver context: a resolved dispatch table plus the library the
/// pointers were resolved from.
///
/// # Safety
///
/// The driver dereferences function pointers resolved by name at runtime.
/// [`Driver::initialize`] only succeeds with every capability resolved;
/// [`Driver::with_table`] accepts any table, and each operation then fails
/// explicitly when it hits an unresolved slot.
pub struct Driver {
    table: DispatchTable,
    _library: Option<Library>,
}

// The table is immutable after construction, and the stdin stream pointer
// refers to the process-wide stream. Connections stay !Send + !Sync; the
// underlying native reference is not guaranteed reentrant.
unsafe impl Send for Driver {}
unsafe impl Sync for Driver {}

/// An open database connection. Owned by exactly one caller; closing
/// consumes it, so use-after-close and double-close do not compile. A
/// connection dropped without an explicit close closes itself.
#[derive(Debug)]
pub struct Connection {
    db: *mut c_void,
    close_fn: CloseFn,
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.db.is_null() {
            unsafe { (self.close_fn)(self.db) };
            self.db = ptr::null_mut();
        }
    }
}

impl Driver {
    /// Loads the native database library and resolves every capability.
    ///
    /// Unlike the permissive [`Driver::with_table`], this reports resolution
    /// failure up front: a missing library or any unresolved capability is
    /// an error enumerating exactly what is missing.
    pub fn initialize() -> Result<Self, DriverError> {
        let Resolution { library, table } = resolver::resolve();

        if library.is_none() {
            return Err(DriverError::LibraryNotFound {
                tried: resolver::candidates().iter().map(|s| s.to_string()).collect(),
            });
        }

        let missing = table.unresolved();
        if !missing.is_empty() {
            return Err(DriverError::Unresolved(missing));
        }

        debug!("Driver initialized; all capabilities resolved");
        Ok(Self {
            table,
            _library: library,
        })
    }

    /// Builds a driver around an arbitrary dispatch table, resolved or not.
    /// Operations on unresolved slots fail per call. This is the injection
    /// seam for test doubles.
    pub fn with_table(table: DispatchTable) -> Self {
        Self {
            table,
            _library: None,
        }
    }

    /// Opens (or creates) the database at `path`.
    ///
    /// On failure the underlying error message is logged, any partially
    /// constructed native reference is released, and no handle is produced.
    pub fn open(&self, path: &Path) -> Result<Connection, DriverError> {
        let open_fn = self.table.open.get(Capability::OpenConnection)?;
        // A connection that could never be closed must not be created.
        let close_fn = self.table.close.get(Capability::CloseConnection)?;

        let c_path = CString::new(path.as_os_str().as_encoded_bytes())?;
        let mut db: *mut c_void = ptr::null_mut();
        let rc = unsafe { open_fn(c_path.as_ptr(), &mut db) };
        if rc != 0 {
            let message = self.fetch_error_message(db);
            error!("Cannot open database: {message}");
            if !db.is_null() {
                unsafe { close_fn(db) };
            }
            return Err(DriverError::Open { message });
        }

        Ok(Connection { db, close_fn })
    }

    /// Executes `statement` against the connection, forwarding it verbatim
    /// with no callback and no context.
    ///
    /// On failure the message buffer the native call allocated is logged
    /// and released exactly once; the connection stays live and usable.
    pub fn execute(&self, connection: &Connection, statement: &str) -> Result<(), DriverError> {
        let exec_fn = self.table.exec.get(Capability::ExecuteStatement)?;

        let sql = CString::new(statement)?;
        let mut err_msg: *mut c_char = ptr::null_mut();
        let rc = unsafe {
            exec_fn(
                connection.db,
                sql.as_ptr(),
                ptr::null_mut(),
                ptr::null_mut(),
                &mut err_msg,
            )
        };
        if rc != 0 {
            let message = if err_msg.is_null() {
                String::from("unknown error")
            } else {
                let message = unsafe { CStr::from_ptr(err_msg) }.to_string_lossy().into_owned();
                match self.table.free {
                    Slot::Resolved(free_fn) => unsafe { free_fn(err_msg.cast()) },
                    Slot::Unresolved => {
                        warn!("free-buffer capability unresolved; native error buffer leaks")
                    }
                }
                message
            };
            error!("SQL error: {message}");
            return Err(DriverError::Execute { message });
        }
        Ok(())
    }

    /// Closes the connection, releasing the underlying native reference and
    /// the handle itself. The move makes any further use a compile error.
    pub fn close(&self, connection: Connection) {
        drop(connection);
    }

    /// Writes `prompt` to standard output, then reads one line (at most
    /// `max_len - 1` bytes) through the resolved read-line slot. Exactly one
    /// trailing line terminator is stripped. End-of-input is `Ok(None)`,
    /// not an error.
    pub fn read_line(&self, prompt: &str, max_len: usize) -> Result<Option<String>, DriverError> {
        let read_fn = self.table.read_line.get(Capability::ReadLine)?;

        let mut stdout = io::stdout();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;

        let capacity = max_len.clamp(2, c_int::MAX as usize);
        let mut buf = vec![0u8; capacity];
        let outcome = unsafe {
            read_fn(
                buf.as_mut_ptr().cast(),
                capacity as c_int,
                self.table.stdin_stream,
            )
        };
        if outcome.is_null() {
            return Ok(None);
        }

        let mut line = unsafe { CStr::from_ptr(buf.as_ptr().cast()) }
            .to_string_lossy()
            .into_owned();
        if line.ends_with('\n') {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Bounded single-substitution string formatting through the resolved
    /// format slot, with the default destination bound. The value is not
    /// escaped or validated; this is a pure passthrough.
    pub fn format_string(&self, template: &str, value: &str) -> Result<String, DriverError> {
        self.format_string_bounded(template, value, FORMAT_CAPACITY)
    }

    /// Like [`Driver::format_string`] with an explicit destination bound;
    /// output longer than `capacity - 1` bytes is truncated.
    pub fn format_string_bounded(
        &self,
        template: &str,
        value: &str,
        capacity: usize,
    ) -> Result<String, DriverError> {
        let format_fn = self.table.format.get(Capability::FormatString)?;

        let template = CString::new(template)?;
        let value = CString::new(value)?;
        let capacity = capacity.max(1);
        let mut buf = vec![0u8; capacity];
        unsafe {
            format_fn(buf.as_mut_ptr().cast(), capacity, template.as_ptr(), value.as_ptr());
        }
        Ok(unsafe { CStr::from_ptr(buf.as_ptr().cast()) }
            .to_string_lossy()
            .into_owned())
    }

    /// Reads the connection's current error message through the errmsg
    /// slot. Falls back to a fixed message when the handle is null (the
    /// native open only leaves it null when allocation itself failed) or
    /// the slot is unresolved.
    fn fetch_error_message(&self, db: *mut c_void) -> String {
        if db.is_null() {
            return String::from("out of memory");
        }
        match self.table.errmsg {
            Slot::Resolved(errmsg_fn) => {
                let message = unsafe { errmsg_fn(db) };
                if message.is_null() {
                    String::from("unknown error")
                } else {
                    unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned()
                }
            }
            Slot::Unresolved => String::from("unknown error"),
        }
    }
}
