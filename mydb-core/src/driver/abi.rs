//! ABI definitions for the late-bound database driver.
//!
//! This module defines the typed function-pointer signatures the driver
//! resolves at runtime, and the dispatch table that holds them. Signatures
//! match the C prototypes of the underlying symbols (`sqlite3_open`,
//! `sqlite3_exec`, ..., plus libc's `fgets` and `snprintf`).

use std::ffi::{c_char, c_int, c_void};

use crate::error::DriverError;

/// Signature of `sqlite3_open`: `(path, out_handle) -> rc`.
pub type OpenFn = unsafe extern "C" fn(*const c_char, *mut *mut c_void) -> c_int;

/// Signature of `sqlite3_exec`: `(handle, sql, callback, context, out_errmsg) -> rc`.
/// The driver always forwards null for callback and context.
pub type ExecFn =
    unsafe extern "C" fn(*mut c_void, *const c_char, *mut c_void, *mut c_void, *mut *mut c_char) -> c_int;

/// Signature of `sqlite3_close`: `(handle) -> rc`.
pub type CloseFn = unsafe extern "C" fn(*mut c_void) -> c_int;

/// Signature of `sqlite3_free`: releases a buffer the library allocated.
pub type FreeFn = unsafe extern "C" fn(*mut c_void);

/// Signature of `sqlite3_errmsg`: `(handle) -> message`.
pub type ErrmsgFn = unsafe extern "C" fn(*mut c_void) -> *const c_char;

/// Signature of `fgets`: `(buf, size, stream) -> buf or null on end-of-input`.
pub type ReadLineFn = unsafe extern "C" fn(*mut c_char, c_int, *mut c_void) -> *mut c_char;

/// Signature of `snprintf`. C-variadic; the driver only ever forwards a
/// single string substitution value.
pub type FormatFn = unsafe extern "C" fn(*mut c_char, usize, *const c_char, ...) -> c_int;

/// The capabilities the dispatch table carries, one slot each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Capability {
    OpenConnection,
    ExecuteStatement,
    CloseConnection,
    FreeBuffer,
    ErrorMessage,
    ReadLine,
    FormatString,
}

/// A dispatch-table slot: either a symbol resolved from a loaded library or
/// explicitly unresolved. Forwarding operations must go through
/// [`Slot::get`] so an unresolved slot surfaces as a typed error instead of
/// a dereference of garbage.
#[derive(Debug, Clone, Copy)]
pub enum Slot<F> {
    Resolved(F),
    Unresolved,
}

impl<F: Copy> Slot<F> {
    pub fn get(&self, capability: Capability) -> Result<F, DriverError> {
        match self {
            Slot::Resolved(f) => Ok(*f),
            Slot::Unresolved => Err(DriverError::UnresolvedSlot(capability)),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Slot::Resolved(_))
    }
}

/// The driver's dispatch table. Built once by the resolver, immutable
/// afterwards; every public operation forwards through exactly one slot.
///
/// Fields are public so tests can inject a hand-built table (see
/// `Driver::with_table`).
#[derive(Debug)]
pub struct DispatchTable {
    pub open: Slot<OpenFn>,
    pub exec: Slot<ExecFn>,
    pub close: Slot<CloseFn>,
    pub free: Slot<FreeFn>,
    pub errmsg: Slot<ErrmsgFn>,
    pub read_line: Slot<ReadLineFn>,
    pub format: Slot<FormatFn>,
    /// The process's standard input stream (libc `stdin`), captured at
    /// resolution time and forwarded to the read-line slot. Null when the
    /// `stdin` symbol could not be resolved.
    pub stdin_stream: *mut c_void,
}

impl DispatchTable {
    /// A table with every slot unresolved.
    pub fn empty() -> Self {
        Self {
            open: Slot::Unresolved,
            exec: Slot::Unresolved,
            close: Slot::Unresolved,
            free: Slot::Unresolved,
            errmsg: Slot::Unresolved,
            read_line: Slot::Unresolved,
            format: Slot::Unresolved,
            stdin_stream: std::ptr::null_mut(),
        }
    }

    /// Lists every capability whose slot is still unresolved.
    pub fn unresolved(&self) -> Vec<Capability> {
        let mut missing = Vec::new();
        if !self.open.is_resolved() {
            missing.push(Capability::OpenConnection);
        }
        if !self.exec.is_resolved() {
            missing.push(Capability::ExecuteStatement);
        }
        if !self.close.is_resolved() {
            missing.push(Capability::CloseConnection);
        }
        if !self.free.is_resolved() {
            missing.push(Capability::FreeBuffer);
        }
        if !self.errmsg.is_resolved() {
            missing.push(Capability::ErrorMessage);
        }
        if !self.read_line.is_resolved() {
            missing.push(Capability::ReadLine);
        }
        if !self.format.is_resolved() {
            missing.push(Capability::FormatString);
        }
        missing
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved().is_empty()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_reports_every_capability() {
        let table = DispatchTable::empty();
        assert_eq!(table.unresolved().len(), 7);
        assert!(!table.is_fully_resolved());
    }

    #[test]
    fn test_unresolved_slot_is_a_typed_error() {
        let slot: Slot<CloseFn> = Slot::Unresolved;
        let err = slot.get(Capability::CloseConnection).unwrap_err();
        assert!(err.to_string().contains("close-connection"));
    }

    #[test]
    fn test_resolved_slot_returns_the_pointer() {
        unsafe extern "C" fn noop(_db: *mut std::ffi::c_void) -> c_int {
            0
        }
        let slot: Slot<CloseFn> = Slot::Resolved(noop);
        assert!(slot.is_resolved());
        assert!(slot.get(Capability::CloseConnection).is_ok());
    }
}
