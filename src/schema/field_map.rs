// src/schema/field_map.rs

use std::collections::HashMap;
use tracing::debug;

use super::types::{Column, RawRow, RawValue};

/// Static column-title → semantic-field table, fixed per source.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    entries: &'static [(&'static str, &'static str)],
}

impl FieldMap {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    /// Build the title → id index for one sheet and bind every known field to
    /// its column. Titles the map doesn't know are ignored.
    pub fn resolve(&self, columns: &[Column]) -> ResolvedFields {
        let by_title: HashMap<&str, u64> =
            columns.iter().map(|c| (c.title.as_str(), c.id)).collect();

        let mut fields = HashMap::with_capacity(self.entries.len());
        for (title, field) in self.entries {
            match by_title.get(title) {
                Some(id) => {
                    fields.insert(*field, *id);
                }
                None => debug!(title = %title, field = %field, "column not present in sheet"),
            }
        }
        ResolvedFields { fields }
    }
}

/// Field → column id binding for one sheet.
#[derive(Debug, Clone, Default)]
pub struct ResolvedFields {
    fields: HashMap<&'static str, u64>,
}

impl ResolvedFields {
    pub fn project<'a>(&'a self, row: &'a RawRow) -> Projection<'a> {
        Projection { fields: self, row }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A row viewed through its semantic field names.
#[derive(Debug, Clone, Copy)]
pub struct Projection<'a> {
    fields: &'a ResolvedFields,
    row: &'a RawRow,
}

impl<'a> Projection<'a> {
    /// Raw cell for `field`; `Empty` when the field is unmapped or the cell missing.
    pub fn get(&self, field: &str) -> &'a RawValue {
        static EMPTY: RawValue = RawValue::Empty;
        match self.fields.fields.get(field) {
            Some(id) => self.row.cell(*id),
            None => &EMPTY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Sheet;

    static MAP: FieldMap = FieldMap::new(&[("PR Num", "pr_num"), ("PR Status", "status")]);

    #[test]
    fn projects_by_title_and_ignores_extra_columns() {
        let sheet = Sheet::from_rows(
            &["Notes", "PR Status", "PR Num"],
            vec![vec!["ignored".into(), "APPROVED".into(), "PR-1".into()]],
        );
        let resolved = MAP.resolve(&sheet.columns);
        assert_eq!(resolved.len(), 2);

        let p = resolved.project(&sheet.rows[0]);
        assert_eq!(p.get("pr_num"), &RawValue::from("PR-1"));
        assert_eq!(p.get("status"), &RawValue::from("APPROVED"));
        assert_eq!(p.get("notes"), &RawValue::Empty);
    }

    #[test]
    fn missing_column_projects_as_empty() {
        let sheet = Sheet::from_rows(&["PR Num"], vec![vec!["PR-9".into()]]);
        let resolved = MAP.resolve(&sheet.columns);
        let p = resolved.project(&sheet.rows[0]);
        assert_eq!(p.get("status"), &RawValue::Empty);
    }

    #[test]
    fn short_row_projects_as_empty() {
        let sheet = Sheet::from_rows(&["PR Num", "PR Status"], vec![vec!["PR-2".into()]]);
        let resolved = MAP.resolve(&sheet.columns);
        let p = resolved.project(&sheet.rows[0]);
        assert_eq!(p.get("status"), &RawValue::Empty);
    }
}
