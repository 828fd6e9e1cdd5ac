pub mod field_map;
pub mod types;

pub use field_map::{FieldMap, Projection, ResolvedFields};
pub use types::{Attachment, Column, RawRow, RawValue, Sheet};
