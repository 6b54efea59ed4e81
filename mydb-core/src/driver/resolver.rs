//! Runtime symbol resolution.
//!
//! Locates the native SQLite library by trying an ordered list of candidate
//! names, then resolves each dispatch-table capability: database symbols
//! from the loaded library, line-reading and string-formatting from the
//! process's own symbol namespace (they are libc facilities, not part of
//! the database library).
//!
//! Resolution never fails hard: a missing library or symbol leaves the
//! corresponding slot `Unresolved` and logs a warning. `Driver::initialize`
//! decides whether that partial state is acceptable.

use libloading::Library;
use tracing::{debug, warn};

use super::abi::{Capability, DispatchTable, Slot};

#[cfg(all(unix, not(target_os = "macos")))]
const LIBRARY_CANDIDATES: &[&str] = &["libsqlite3.so", "libsqlite3.so.0"];
#[cfg(target_os = "macos")]
const LIBRARY_CANDIDATES: &[&str] = &["libsqlite3.dylib", "libsqlite3.0.dylib"];
#[cfg(windows)]
const LIBRARY_CANDIDATES: &[&str] = &["sqlite3.dll"];

/// The candidate library names tried, in order, by [`resolve`].
pub fn candidates() -> &'static [&'static str] {
    LIBRARY_CANDIDATES
}

/// The outcome of one resolution pass. The `Library` must outlive every
/// pointer in the table, so the two travel together.
pub struct Resolution {
    pub library: Option<Library>,
    pub table: DispatchTable,
}

/// Runs one resolution pass. Safe to call more than once; each call loads
/// and resolves from scratch.
pub fn resolve() -> Resolution {
    let library = load_database_library();
    let mut table = DispatchTable::empty();

    if let Some(library) = &library {
        table.open = library_symbol(library, b"sqlite3_open\0", Capability::OpenConnection);
        table.exec = library_symbol(library, b"sqlite3_exec\0", Capability::ExecuteStatement);
        table.close = library_symbol(library, b"sqlite3_close\0", Capability::CloseConnection);
        table.free = library_symbol(library, b"sqlite3_free\0", Capability::FreeBuffer);
        table.errmsg = library_symbol(library, b"sqlite3_errmsg\0", Capability::ErrorMessage);
    }

    resolve_process_symbols(&mut table);

    Resolution { library, table }
}

fn load_database_library() -> Option<Library> {
    for name in candidates() {
        match unsafe { Library::new(name) } {
            Ok(library) => {
                debug!("Loaded native database library: {name}");
                return Some(library);
            }
            Err(e) => {
                debug!("Could not load {name}: {e}");
            }
        }
    }
    warn!(
        "No native database library could be loaded (tried: {})",
        candidates().join(", ")
    );
    None
}

fn library_symbol<F: Copy>(library: &Library, name: &[u8], capability: Capability) -> Slot<F> {
    match unsafe { library.get::<F>(name) } {
        Ok(symbol) => Slot::Resolved(*symbol),
        Err(e) => {
            warn!(
                "Failed to resolve {capability} ({}): {e}",
                String::from_utf8_lossy(&name[..name.len() - 1])
            );
            Slot::Unresolved
        }
    }
}

#[cfg(target_os = "macos")]
const STDIN_SYMBOL: &[u8] = b"__stdinp\0";
#[cfg(all(unix, not(target_os = "macos")))]
const STDIN_SYMBOL: &[u8] = b"stdin\0";

/// Resolves `fgets`, `snprintf`, and the `stdin` stream object from the
/// process's default symbol namespace. These are treated as always present
/// on unix; a failure here still only marks the slot unresolved.
#[cfg(unix)]
fn resolve_process_symbols(table: &mut DispatchTable) {
    use super::abi::{FormatFn, ReadLineFn};

    let process = libloading::os::unix::Library::this();

    table.read_line = match unsafe { process.get::<ReadLineFn>(b"fgets\0") } {
        Ok(symbol) => Slot::Resolved(*symbol),
        Err(e) => {
            warn!("Failed to resolve read-line (fgets): {e}");
            Slot::Unresolved
        }
    };

    table.format = match unsafe { process.get::<FormatFn>(b"snprintf\0") } {
        Ok(symbol) => Slot::Resolved(*symbol),
        Err(e) => {
            warn!("Failed to resolve string-formatting (snprintf): {e}");
            Slot::Unresolved
        }
    };

    // `stdin` is a data symbol: the lookup yields the address of the FILE*
    // variable, one more dereference yields the stream itself.
    match unsafe { process.get::<*mut *mut std::ffi::c_void>(STDIN_SYMBOL) } {
        Ok(symbol) => {
            let stdin_var: *mut *mut std::ffi::c_void = *symbol;
            table.stdin_stream = unsafe { *stdin_var };
        }
        Err(e) => {
            warn!("Failed to resolve the standard input stream: {e}");
            table.read_line = Slot::Unresolved;
        }
    }
}

#[cfg(not(unix))]
fn resolve_process_symbols(_table: &mut DispatchTable) {
    warn!("Process symbol namespace is not supported on this platform; read-line and string-formatting stay unresolved");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_list_is_ordered_and_nonempty() {
        assert!(!candidates().is_empty());
    }

    #[cfg(all(unix, not(target_env = "musl")))]
    #[test]
    fn test_process_symbols_always_resolve() {
        let resolution = resolve();
        assert!(resolution.table.read_line.is_resolved());
        assert!(resolution.table.format.is_resolved());
        assert!(!resolution.table.stdin_stream.is_null());
    }

    #[test]
    fn test_resolve_is_repeatable() {
        let first = resolve();
        let second = resolve();
        assert_eq!(first.table.unresolved(), second.table.unresolved());
    }

    #[test]
    fn test_database_slots_track_library_availability() {
        let resolution = resolve();
        let missing = resolution.table.unresolved();
        if resolution.library.is_some() {
            // A loadable library must yield every database capability.
            assert!(!missing.contains(&Capability::OpenConnection));
            assert!(!missing.contains(&Capability::ExecuteStatement));
            assert!(!missing.contains(&Capability::CloseConnection));
            assert!(!missing.contains(&Capability::FreeBuffer));
            assert!(!missing.contains(&Capability::ErrorMessage));
        } else {
            assert!(missing.contains(&Capability::OpenConnection));
        }
    }
}
