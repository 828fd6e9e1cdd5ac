pub mod aggregate;
pub mod date_parser;
pub mod normalize;

pub use date_parser::{DateFormat, SERVICE_DATE_FORMATS, WORKBOOK_DATE_FORMATS};
