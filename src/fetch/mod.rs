// src/fetch/mod.rs
//
// Row sources: the spreadsheet service over HTTP, and workbook files on disk.
// Both hand back `schema::Sheet`; nothing here interprets cell values.

pub mod smartsheet;
pub mod workbook;

pub use smartsheet::{SmartsheetClient, DEFAULT_API_BASE};
pub use workbook::{open_workbook, SheetLayout, WorkbookSource};
