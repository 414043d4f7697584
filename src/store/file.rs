use async_trait::async_trait;
use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{table_width, Grid, SheetRange, TabularStore};
use crate::error::StoreError;

/// Store backed by one JSON workbook file per spreadsheet id.
///
/// `<dir>/<spreadsheet id>.json` holds the sheets in order. Writes replace the
/// file atomically; reading a missing workbook is `NotFound`, writing creates it.
#[derive(Clone)]
pub struct FileStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles on workbooks
    write_lock: Arc<Mutex<()>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Sheet {
    pub title: String,
    #[serde(default)]
    pub rows: Grid,
}

impl Workbook {
    fn sheet(&self, title: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.title == title)
    }

    /// Sheet by title, created with `header` as its first row if missing
    fn sheet_or_create(&mut self, title: &str, header: &[String]) -> &mut Sheet {
        let index = match self.sheets.iter().position(|s| s.title == title) {
            Some(i) => i,
            None => {
                self.sheets.push(Sheet {
                    title: title.to_string(),
                    rows: vec![header.to_vec()],
                });
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[index]
    }
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn workbook_path(&self, spreadsheet_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !spreadsheet_id.is_empty()
            && spreadsheet_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::Rejected(format!(
                "invalid spreadsheet id '{}'",
                spreadsheet_id
            )));
        }
        Ok(self.dir.join(format!("{}.json", spreadsheet_id)))
    }

    async fn load(&self, spreadsheet_id: &str) -> Result<Workbook, StoreError> {
        let path = self.workbook_path(spreadsheet_id)?;
        let id = spreadsheet_id.to_string();
        run_blocking(move || match load_workbook(&path)? {
            Some(workbook) => Ok(workbook),
            None => Err(StoreError::NotFound(format!("spreadsheet {}", id))),
        })
        .await
    }

    /// Load (or start) a workbook, apply `edit`, and write it back atomically
    async fn update<F>(&self, spreadsheet_id: &str, edit: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Workbook) + Send + 'static,
    {
        let path = self.workbook_path(spreadsheet_id)?;
        let dir = self.dir.clone();
        let _guard = self.write_lock.lock().await;
        run_blocking(move || {
            let mut workbook = load_workbook(&path)?.unwrap_or_default();
            edit(&mut workbook);
            std::fs::create_dir_all(&dir)?;
            save_workbook(&path, &workbook)
        })
        .await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Io(io::Error::other(format!("task join error: {}", e))))?
}

fn load_workbook(path: &Path) -> Result<Option<Workbook>, StoreError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_reader(file)
        .map(Some)
        .map_err(|e| StoreError::Malformed(format!("{}: {}", path.display(), e)))
}

fn save_workbook(path: &Path, workbook: &Workbook) -> Result<(), StoreError> {
    let mut file = AtomicWriteFile::open(path)?;
    serde_json::to_writer_pretty(&mut file, workbook)
        .map_err(|e| StoreError::Io(io::Error::other(e)))?;
    file.commit()?;
    Ok(())
}

/// Drop trailing empty cells and rows so cleared areas do not linger in the file
fn trim_empty_tail(rows: &mut Grid) {
    for row in rows.iter_mut() {
        while row.last().is_some_and(|c| c.is_empty()) {
            row.pop();
        }
    }
    while rows.len() > 1 && rows.last().is_some_and(|r| r.is_empty()) {
        rows.pop();
    }
}

fn read_from(workbook: &Workbook, range: &SheetRange) -> Result<Grid, StoreError> {
    workbook
        .sheet(&range.sheet)
        .map(|sheet| range.select(&sheet.rows))
        .ok_or_else(|| StoreError::NotFound(format!("sheet {}", range.sheet)))
}

#[async_trait]
impl TabularStore for FileStore {
    async fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, StoreError> {
        let workbook = self.load(spreadsheet_id).await?;
        Ok(workbook.sheets.into_iter().map(|s| s.title).collect())
    }

    async fn read_range(&self, spreadsheet_id: &str, range: &SheetRange) -> Result<Grid, StoreError> {
        let workbook = self.load(spreadsheet_id).await?;
        read_from(&workbook, range)
    }

    async fn batch_read(
        &self,
        spreadsheet_id: &str,
        ranges: &[SheetRange],
    ) -> Result<Vec<Grid>, StoreError> {
        // One load gives every range the same snapshot
        let workbook = self.load(spreadsheet_id).await?;
        ranges.iter().map(|range| read_from(&workbook, range)).collect()
    }

    async fn replace_table(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        header: &[String],
        rows: &[Vec<String>],
    ) -> Result<(), StoreError> {
        let title = sheet.to_string();
        let header = header.to_vec();
        let rows = rows.to_vec();
        let width = table_width(&header, &rows);
        self.update(spreadsheet_id, move |workbook| {
            let sheet = workbook.sheet_or_create(&title, &header);
            if sheet.rows.first().map_or(true, |r| r.iter().all(|c| c.is_empty())) {
                match sheet.rows.first_mut() {
                    Some(first) => *first = header.clone(),
                    None => sheet.rows.push(header.clone()),
                }
            }
            // Clear the body within the table's columns, as a range clear would
            for row in sheet.rows.iter_mut().skip(1) {
                for cell in row.iter_mut().take(width) {
                    cell.clear();
                }
            }
            for (i, new_row) in rows.into_iter().enumerate() {
                match sheet.rows.get_mut(i + 1) {
                    Some(existing) => {
                        for (col, cell) in new_row.into_iter().enumerate() {
                            match existing.get_mut(col) {
                                Some(slot) => *slot = cell,
                                None => existing.push(cell),
                            }
                        }
                    }
                    None => sheet.rows.push(new_row),
                }
            }
            trim_empty_tail(&mut sheet.rows);
        })
        .await
    }

    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        header: &[String],
        rows: &[Vec<String>],
    ) -> Result<(), StoreError> {
        let title = sheet.to_string();
        let header = header.to_vec();
        let rows = rows.to_vec();
        self.update(spreadsheet_id, move |workbook| {
            let sheet = workbook.sheet_or_create(&title, &header);
            sheet.rows.extend(rows);
        })
        .await
    }
}
