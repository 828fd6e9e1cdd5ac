// src/fetch/workbook.rs

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use csv::ReaderBuilder;
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

use crate::error::SourceError;
use crate::process::date_parser::{self, DateFormat};
use crate::process::normalize::{iso_date, number_text};
use crate::schema::{Column, RawRow, RawValue, Sheet};

/// How to read one sheet: optional positional header titles, and the date
/// formats header cells may be written in.
#[derive(Debug, Clone, Copy)]
pub struct SheetLayout {
    pub header_override: Option<&'static [&'static str]>,
    pub date_formats: &'static [DateFormat],
}

impl SheetLayout {
    pub const fn new(date_formats: &'static [DateFormat]) -> Self {
        Self {
            header_override: None,
            date_formats,
        }
    }

    pub const fn with_headers(mut self, titles: &'static [&'static str]) -> Self {
        self.header_override = Some(titles);
        self
    }
}

/// A file (or directory) holding named sheets.
pub trait WorkbookSource {
    fn sheet_names(&self) -> Vec<String>;

    /// Read `name` with the first row as header.
    fn sheet(&mut self, name: &str, layout: &SheetLayout) -> Result<Sheet, SourceError>;
}

/// Open `path` as a workbook: a directory of `<sheet>.csv` files, or any
/// spreadsheet format calamine understands.
pub fn open_workbook(path: &Path) -> Result<Box<dyn WorkbookSource>, SourceError> {
    if !path.exists() {
        return Err(SourceError::MissingFile(path.to_path_buf()));
    }
    if path.is_dir() {
        return Ok(Box::new(CsvWorkbook {
            dir: path.to_path_buf(),
        }));
    }
    let sheets = open_workbook_auto(path)?;
    Ok(Box::new(ExcelWorkbook {
        path: path.to_path_buf(),
        sheets,
    }))
}

pub struct ExcelWorkbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
}

fn data_to_raw(cell: &Data) -> RawValue {
    match cell {
        Data::Empty | Data::Error(_) => RawValue::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            if s.trim().is_empty() {
                RawValue::Empty
            } else {
                RawValue::Text(s.clone())
            }
        }
        Data::Int(i) => RawValue::Number(*i as f64),
        Data::Float(f) => RawValue::Number(*f),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::DateTime(dt) => dt.as_datetime().map(RawValue::DateTime).unwrap_or_default(),
    }
}

impl WorkbookSource for ExcelWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    #[instrument(level = "debug", skip(self, layout), fields(path = %self.path.display()))]
    fn sheet(&mut self, name: &str, layout: &SheetLayout) -> Result<Sheet, SourceError> {
        if !self.sheet_names().iter().any(|n| n == name) {
            return Err(SourceError::MissingSheet {
                path: self.path.clone(),
                sheet: name.to_string(),
            });
        }
        let range = self.sheets.worksheet_range(name)?;
        let rows = range
            .rows()
            .map(|r| r.iter().map(data_to_raw).collect::<Vec<_>>());
        Ok(build_sheet(name, rows, layout))
    }
}

pub struct CsvWorkbook {
    dir: PathBuf,
}

impl CsvWorkbook {
    fn sheet_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.csv"))
    }
}

impl WorkbookSource for CsvWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|e| {
                let fname = e.file_name().to_string_lossy().to_string();
                fname.strip_suffix(".csv").map(str::to_string)
            })
            .collect();
        names.sort();
        names
    }

    #[instrument(level = "debug", skip(self, layout), fields(path = %self.dir.display()))]
    fn sheet(&mut self, name: &str, layout: &SheetLayout) -> Result<Sheet, SourceError> {
        let path = self.sheet_path(name);
        if !path.is_file() {
            return Err(SourceError::MissingSheet {
                path: self.dir.clone(),
                sheet: name.to_string(),
            });
        }
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)?;

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|s| {
                        if s.trim().is_empty() {
                            RawValue::Empty
                        } else {
                            RawValue::Text(s.to_string())
                        }
                    })
                    .collect::<Vec<_>>(),
            );
        }
        Ok(build_sheet(name, rows.into_iter(), layout))
    }
}

fn header_column(idx: usize, cell: &RawValue, layout: &SheetLayout) -> Column {
    let (title, date) = match cell {
        RawValue::DateTime(dt) => (iso_date(dt.date()), Some(dt.date())),
        RawValue::Text(s) => {
            let title = s.trim().to_string();
            let date = date_parser::parse_with(&title, layout.date_formats);
            (title, date)
        }
        RawValue::Number(n) => (number_text(*n), None),
        RawValue::Bool(b) => (b.to_string(), None),
        RawValue::Empty => (String::new(), None),
    };
    let title = layout
        .header_override
        .and_then(|titles| titles.get(idx))
        .map(|t| t.to_string())
        .unwrap_or(title);
    Column {
        id: idx as u64,
        title,
        date,
    }
}

/// First row is the header; blank data rows are dropped but keep their
/// position so row ids stay tied to the source layout.
fn build_sheet<I>(name: &str, mut rows: I, layout: &SheetLayout) -> Sheet
where
    I: Iterator<Item = Vec<RawValue>>,
{
    let columns: Vec<Column> = rows
        .next()
        .map(|header| {
            header
                .iter()
                .enumerate()
                .map(|(idx, cell)| header_column(idx, cell, layout))
                .collect()
        })
        .unwrap_or_default();

    let rows: Vec<RawRow> = rows
        .enumerate()
        .map(|(position, values)| RawRow {
            position,
            cells: values
                .into_iter()
                .enumerate()
                .filter(|(_, v)| !v.is_empty())
                .map(|(i, v)| (i as u64, v))
                .collect(),
            ..RawRow::default()
        })
        .filter(|row| !row.is_blank())
        .collect();

    debug!(sheet = name, columns = columns.len(), rows = rows.len(), "read sheet");
    Sheet {
        id: None,
        name: Some(name.to_string()),
        columns,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::WORKBOOK_DATE_FORMATS;
    use anyhow::Result;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    const LAYOUT: SheetLayout = SheetLayout::new(WORKBOOK_DATE_FORMATS);

    #[test]
    fn reads_csv_sheet_from_directory() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("Issued Materials.csv"),
            "S/N,MATERIALS DESCRIPTION,01/10/2025,2025-10-02\n\
             1,PVC Pipe 4in,5,\n\
             ,,,\n\
             2,Copper Lug,,3\n",
        )?;

        let mut wb = open_workbook(dir.path())?;
        assert_eq!(wb.sheet_names(), vec!["Issued Materials".to_string()]);

        let sheet = wb.sheet("Issued Materials", &LAYOUT)?;
        assert_eq!(sheet.columns.len(), 4);
        assert_eq!(sheet.columns[0].date, None);
        assert_eq!(sheet.columns[2].date, NaiveDate::from_ymd_opt(2025, 10, 1));
        assert_eq!(sheet.columns[3].date, NaiveDate::from_ymd_opt(2025, 10, 2));

        // the all-blank row is dropped, positions are kept
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].position, 0);
        assert_eq!(sheet.rows[1].position, 2);
        assert_eq!(sheet.rows[1].cell(1), &RawValue::from("Copper Lug"));
        assert_eq!(sheet.rows[0].cell(3), &RawValue::Empty);
        Ok(())
    }

    #[test]
    fn header_override_renames_positionally() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("OCT 25.csv"), "#,Item,Quantity\n1,Cable,4\n")?;
        let layout = LAYOUT.with_headers(&["id", "Description", "Qty"]);

        let mut wb = open_workbook(dir.path())?;
        let sheet = wb.sheet("OCT 25", &layout)?;
        let titles: Vec<_> = sheet.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["id", "Description", "Qty"]);
        Ok(())
    }

    #[test]
    fn missing_inputs_are_unavailable() -> Result<()> {
        let dir = tempdir()?;
        let err = open_workbook(&dir.path().join("nope.xlsx")).err().unwrap();
        assert!(err.is_unavailable());

        let mut wb = open_workbook(dir.path())?;
        let err = wb.sheet("Sammary", &LAYOUT).unwrap_err();
        assert!(matches!(err, SourceError::MissingSheet { .. }));
        assert!(err.is_unavailable());
        Ok(())
    }

    #[test]
    fn native_date_header_becomes_iso_title() {
        let day = NaiveDate::from_ymd_opt(2025, 10, 5).unwrap();
        let rows = vec![
            vec![
                "S/N".into(),
                RawValue::DateTime(day.and_hms_opt(0, 0, 0).unwrap()),
                RawValue::Number(3.0),
            ],
            vec![RawValue::Number(1.0), RawValue::Number(12.0), RawValue::Empty],
        ];
        let sheet = build_sheet("Issued", rows.into_iter(), &LAYOUT);

        assert_eq!(sheet.name.as_deref(), Some("Issued"));
        assert_eq!(sheet.columns[0].title, "S/N");
        assert_eq!(sheet.columns[0].date, None);
        assert_eq!(sheet.columns[1].title, "2025-10-05");
        assert_eq!(sheet.columns[1].date, Some(day));
        assert_eq!(sheet.columns[2].title, "3");
        assert_eq!(sheet.columns[2].date, None);
        assert_eq!(sheet.rows[0].cell(1), &RawValue::Number(12.0));
    }

    #[test]
    fn spreadsheet_cells_map_to_raw_values() {
        use calamine::CellErrorType;

        assert_eq!(data_to_raw(&Data::Int(7)), RawValue::Number(7.0));
        assert_eq!(data_to_raw(&Data::Float(2.5)), RawValue::Number(2.5));
        assert_eq!(data_to_raw(&Data::Bool(true)), RawValue::Bool(true));
        assert_eq!(data_to_raw(&Data::Error(CellErrorType::Div0)), RawValue::Empty);
        assert_eq!(data_to_raw(&Data::Empty), RawValue::Empty);
        assert_eq!(data_to_raw(&Data::String("   ".into())), RawValue::Empty);
        assert_eq!(
            data_to_raw(&Data::String("Copper Lug".into())),
            RawValue::Text("Copper Lug".into())
        );
    }
}
