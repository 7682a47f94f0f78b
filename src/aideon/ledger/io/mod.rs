//! Filesystem adapters: locating source workbooks and reading their cells.

pub mod excel_read;
pub mod locate;
