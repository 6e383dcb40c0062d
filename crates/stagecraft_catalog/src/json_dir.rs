//! JSON directory catalog backend.
//!
//! Stores one table per file:
//!
//! ```text
//! <dir>/
//! ├── {hex(table_name_1)}.jsonl
//! ├── {hex(table_name_2)}.jsonl
//! └── ...
//! ```
//!
//! Table names are hex-encoded in file names so that any name (spaces,
//! slashes, unicode) maps to exactly one file and can be listed back without
//! opening the files.
//!
//! Each file is JSON Lines. The first line is a header carrying the column
//! names and the row count, and every following line is one row as a JSON
//! array:
//!
//! ```text
//! {"columns":["First Name"],"rows":2}
//! ["Oski"]
//! ["Carol"]
//! ```
//!
//! Row counts and column names come from the header alone, and cell and
//! column reads stream the file a row at a time.

use crate::catalog::{check_name, CellIter, TableCatalog};
use crate::error::{CatalogError, Result};
use crate::table::{Table, TableError, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use tracing::debug;

const TABLE_EXTENSION: &str = "jsonl";

type RowLines = Lines<BufReader<File>>;

/// First line of a table file.
#[derive(Debug, Serialize, Deserialize)]
struct Header {
    columns: Vec<String>,
    rows: usize,
}

/// Catalog persisted as JSON Lines files in a directory.
#[derive(Debug, Clone)]
pub struct JsonDirCatalog {
    dir: PathBuf,
}

impl JsonDirCatalog {
    /// Open (creating if needed) a catalog rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Opened JSON table catalog");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", hex::encode(name.as_bytes()), TABLE_EXTENSION))
    }

    /// Parse the header and hand back the remaining lines unread.
    fn open_table(&self, name: &str) -> Result<(Header, RowLines)> {
        let file = match File::open(self.table_path(name)) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(CatalogError::not_found(name))
            }
            Err(err) => return Err(err.into()),
        };
        let mut lines = BufReader::new(file).lines();
        let first = lines.next().transpose()?.ok_or(TableError::MissingHeader)?;
        let header: Header = serde_json::from_str(&first)?;
        Ok((header, lines))
    }

    fn open_column(&self, name: &str, column: &str) -> Result<(Header, usize, RowLines)> {
        let (header, lines) = self.open_table(name)?;
        let col = header
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        Ok((header, col, lines))
    }
}

/// Decode row lines, checking each against the header width.
fn parse_rows(lines: RowLines, width: usize) -> impl Iterator<Item = Result<Vec<Value>>> {
    lines
        .filter(|line| !matches!(line, Ok(text) if text.trim().is_empty()))
        .enumerate()
        .map(move |(index, line)| {
            let row: Vec<Value> = serde_json::from_str(&line?)?;
            if row.len() != width {
                return Err(TableError::RowWidth {
                    row: index,
                    expected: width,
                    found: row.len(),
                }
                .into());
            }
            Ok(row)
        })
}

impl TableCatalog for JsonDirCatalog {
    fn list_names(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(TABLE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            // Temp files and foreign files are skipped
            let Ok(bytes) = hex::decode(stem) else {
                continue;
            };
            match String::from_utf8(bytes) {
                Ok(name) => {
                    names.insert(name);
                }
                Err(_) => continue,
            }
        }
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<Table> {
        let (header, lines) = self.open_table(name)?;
        let mut table = Table::new(header.columns)?;
        let width = table.columns().len();
        for row in parse_rows(lines, width) {
            table.push_row(row?)?;
        }
        if table.len() != header.rows {
            return Err(CatalogError::corrupt(
                name,
                format!("header says {} rows, found {}", header.rows, table.len()),
            ));
        }
        Ok(table)
    }

    fn overwrite(&mut self, name: &str, table: &Table) -> Result<()> {
        check_name(name)?;
        table.validate()?;
        let path = self.table_path(name);
        let header = Header {
            columns: table.columns().to_vec(),
            rows: table.len(),
        };
        let mut content = serde_json::to_string(&header)?;
        content.push('\n');
        for row in table.rows() {
            content.push_str(&serde_json::to_string(row)?);
            content.push('\n');
        }
        atomic_write(&path, content.as_bytes())?;
        debug!(table = name, rows = table.len(), path = %path.display(), "Wrote table");
        Ok(())
    }

    fn drop_table(&mut self, name: &str) -> Result<()> {
        let path = self.table_path(name);
        if !path.exists() {
            return Err(CatalogError::not_found(name));
        }
        fs::remove_file(&path)?;
        debug!(table = name, path = %path.display(), "Dropped table");
        Ok(())
    }

    fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.table_path(name).exists())
    }

    fn row_count(&self, name: &str) -> Result<usize> {
        Ok(self.open_table(name)?.0.rows)
    }

    fn column_names(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.open_table(name)?.0.columns)
    }

    fn read_cell(&self, name: &str, row: usize, column: &str) -> Result<Value> {
        let (header, col, lines) = self.open_column(name, column)?;
        match parse_rows(lines, header.columns.len()).nth(row) {
            Some(values) => Ok(values?.swap_remove(col)),
            None => Err(TableError::RowOutOfRange {
                row,
                len: header.rows,
            }
            .into()),
        }
    }

    fn scan_column<'a>(&'a self, name: &'a str, column: &'a str) -> Result<CellIter<'a>> {
        let (header, col, lines) = self.open_column(name, column)?;
        let width = header.columns.len();
        Ok(Box::new(
            parse_rows(lines, width).map(move |row| row.map(|mut values| values.swap_remove(col))),
        ))
    }
}

/// Atomic write via temp file + rename
fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = parent.join(format!(".tmp_{}", uuid::Uuid::new_v4()));
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names() -> Table {
        Table::new(["First Name"])
            .unwrap()
            .with_row(["Oski"])
            .unwrap()
            .with_row(["Carol"])
            .unwrap()
    }

    #[test]
    fn test_overwrite_and_read() {
        let temp = TempDir::new().unwrap();
        let mut catalog = JsonDirCatalog::open(temp.path()).unwrap();

        catalog.overwrite("First Names", &names()).unwrap();

        assert_eq!(catalog.read("First Names").unwrap(), names());
        assert_eq!(
            catalog.read_cell("First Names", 1, "First Name").unwrap(),
            Value::from("Carol")
        );
    }

    #[test]
    fn test_list_names_decodes_file_names() {
        let temp = TempDir::new().unwrap();
        let mut catalog = JsonDirCatalog::open(temp.path()).unwrap();

        catalog.overwrite("a/b c", &names()).unwrap();
        catalog.overwrite("plain", &names()).unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();
        fs::write(temp.path().join("zz-not-hex.jsonl"), "{}").unwrap();

        let listed = catalog.list_names().unwrap();
        assert_eq!(
            listed.into_iter().collect::<Vec<_>>(),
            vec!["a/b c".to_string(), "plain".to_string()]
        );
    }

    #[test]
    fn test_reopen_sees_existing_tables() {
        let temp = TempDir::new().unwrap();
        {
            let mut catalog = JsonDirCatalog::open(temp.path()).unwrap();
            catalog.overwrite("t", &names()).unwrap();
        }
        let catalog = JsonDirCatalog::open(temp.path()).unwrap();
        assert!(catalog.contains("t").unwrap());
        assert_eq!(catalog.row_count("t").unwrap(), 2);
    }

    #[test]
    fn test_file_is_header_then_rows() {
        let temp = TempDir::new().unwrap();
        let mut catalog = JsonDirCatalog::open(temp.path()).unwrap();
        catalog.overwrite("t", &names()).unwrap();

        let content = fs::read_to_string(catalog.table_path("t")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![r#"{"columns":["First Name"],"rows":2}"#, r#"["Oski"]"#, r#"["Carol"]"#]
        );
    }

    #[test]
    fn test_helpers_stream_without_full_read() {
        let temp = TempDir::new().unwrap();
        let mut catalog = JsonDirCatalog::open(temp.path()).unwrap();
        catalog.overwrite("t", &names()).unwrap();

        // A damaged trailing line breaks a full read but not the header or
        // the rows before it.
        let path = catalog.table_path("t");
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("not json\n");
        fs::write(&path, content).unwrap();

        assert!(catalog.read("t").is_err());
        assert_eq!(catalog.row_count("t").unwrap(), 2);
        assert_eq!(catalog.column_names("t").unwrap(), vec!["First Name".to_string()]);
        assert_eq!(catalog.read_cell("t", 1, "First Name").unwrap(), Value::from("Carol"));

        let mut cells = catalog.scan_column("t", "First Name").unwrap();
        assert_eq!(cells.next().unwrap().unwrap(), Value::from("Oski"));
        assert_eq!(cells.next().unwrap().unwrap(), Value::from("Carol"));
        assert!(cells.next().unwrap().is_err());
    }

    #[test]
    fn test_cell_errors() {
        let temp = TempDir::new().unwrap();
        let mut catalog = JsonDirCatalog::open(temp.path()).unwrap();
        catalog.overwrite("t", &names()).unwrap();

        assert!(matches!(
            catalog.read_cell("t", 5, "First Name"),
            Err(CatalogError::Table(TableError::RowOutOfRange { row: 5, len: 2 }))
        ));
        assert!(matches!(
            catalog.scan_column("t", "Age"),
            Err(CatalogError::Table(TableError::UnknownColumn(_)))
        ));
        assert!(catalog.row_count("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_row_count_mismatch_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let catalog = JsonDirCatalog::open(temp.path()).unwrap();
        fs::write(
            catalog.table_path("t"),
            "{\"columns\":[\"a\"],\"rows\":3}\n[\"x\"]\n",
        )
        .unwrap();
        assert!(matches!(catalog.read("t"), Err(CatalogError::Corrupt { .. })));
    }

    #[test]
    fn test_drop_table() {
        let temp = TempDir::new().unwrap();
        let mut catalog = JsonDirCatalog::open(temp.path()).unwrap();

        catalog.overwrite("t", &names()).unwrap();
        catalog.drop_table("t").unwrap();

        assert!(!catalog.contains("t").unwrap());
        assert!(catalog.read("t").unwrap_err().is_not_found());
        assert!(catalog.drop_table("t").unwrap_err().is_not_found());
    }
}
