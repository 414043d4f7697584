use anyhow::{bail, Result};
use std::fmt;

/// An A1-notation range such as `Sheet1!A:F`, `'Judge_Dr Rao'!A:K` or `Score!A2:I`.
///
/// Rows and columns are 0-based here; `to_a1` renders them 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    pub sheet: String,
    pub first_col: usize,
    pub last_col: Option<usize>,
    pub first_row: usize,
    pub last_row: Option<usize>,
}

impl SheetRange {
    /// Whole columns `first..=last` of a sheet
    pub fn columns(sheet: &str, first_col: usize, last_col: usize) -> Self {
        Self {
            sheet: sheet.to_string(),
            first_col,
            last_col: Some(last_col),
            first_row: 0,
            last_row: None,
        }
    }

    /// The `width` x `height` block anchored at A1
    pub fn block(sheet: &str, width: usize, height: usize) -> Self {
        Self {
            sheet: sheet.to_string(),
            first_col: 0,
            last_col: Some(width.max(1) - 1),
            first_row: 0,
            last_row: Some(height.max(1) - 1),
        }
    }

    pub fn starting_at_row(mut self, row: usize) -> Self {
        self.first_row = row;
        self
    }

    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (sheet, cells) = split_sheet(s)?;
        if sheet.is_empty() {
            bail!("Range is missing a sheet name: {}", s);
        }

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (start, Some(end)),
            None => (cells, None),
        };

        let (first_col, first_row) = parse_cell(start)
            .ok_or_else(|| anyhow::anyhow!("Invalid range start '{}' in {}", start, s))?;
        let (last_col, last_row) = match end {
            Some(end) => {
                let (col, row) = parse_cell(end)
                    .ok_or_else(|| anyhow::anyhow!("Invalid range end '{}' in {}", end, s))?;
                (Some(col), row)
            }
            None => (None, None),
        };

        if let Some(last) = last_col {
            if last < first_col {
                bail!("Range columns are reversed: {}", s);
            }
        }

        Ok(Self {
            sheet,
            first_col,
            last_col,
            first_row: first_row.unwrap_or(0),
            last_row,
        })
    }

    pub fn to_a1(&self) -> String {
        let mut out = format!("{}!{}", quote_sheet(&self.sheet), column_letters(self.first_col));
        if self.first_row > 0 || self.last_row.is_some() {
            out.push_str(&(self.first_row + 1).to_string());
        }
        if let Some(last_col) = self.last_col {
            out.push(':');
            out.push_str(&column_letters(last_col));
            if let Some(last_row) = self.last_row {
                out.push_str(&(last_row + 1).to_string());
            }
        }
        out
    }

    /// Cut the cells this range covers out of a full sheet grid.
    ///
    /// Trailing empty cells and trailing empty rows are dropped, matching what
    /// the Sheets API returns.
    pub fn select(&self, grid: &[Vec<String>]) -> Vec<Vec<String>> {
        let row_end = self
            .last_row
            .map(|r| (r + 1).min(grid.len()))
            .unwrap_or(grid.len());

        let mut rows: Vec<Vec<String>> = grid
            .get(self.first_row..row_end)
            .unwrap_or_default()
            .iter()
            .map(|row| {
                let col_end = self
                    .last_col
                    .map(|c| (c + 1).min(row.len()))
                    .unwrap_or(row.len());
                let mut cells: Vec<String> =
                    row.get(self.first_col..col_end).unwrap_or_default().to_vec();
                while cells.last().is_some_and(|c| c.is_empty()) {
                    cells.pop();
                }
                cells
            })
            .collect();

        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        rows
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

fn split_sheet(s: &str) -> Result<(String, &str)> {
    if let Some(rest) = s.strip_prefix('\'') {
        // Quoted sheet name, '' escapes a quote
        let mut name = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    name.push('\'');
                    chars.next();
                    continue;
                }
                let after = &rest[i + 1..];
                return match after.strip_prefix('!') {
                    Some(cells) => Ok((name, cells)),
                    None => bail!("Expected '!' after sheet name in {}", s),
                };
            }
            name.push(c);
        }
        bail!("Unterminated sheet name in {}", s)
    } else {
        match s.split_once('!') {
            Some((sheet, cells)) => Ok((sheet.to_string(), cells)),
            None => bail!("Range must look like Sheet!A:F, got {}", s),
        }
    }
}

/// Parse `A`, `K12`, `AA3` into (0-based column, optional 0-based row)
fn parse_cell(s: &str) -> Option<(usize, Option<usize>)> {
    let s = s.trim();
    let split = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
    let (letters, digits) = s.split_at(split);
    let col = column_index(letters)?;
    let row = if digits.is_empty() {
        None
    } else {
        let n: usize = digits.parse().ok()?;
        if n == 0 {
            return None;
        }
        Some(n - 1)
    };
    Some((col, row))
}

fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut n = 0usize;
    for c in letters.chars() {
        n = n * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(n - 1)
}

pub fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn quote_sheet(sheet: &str) -> String {
    if !sheet.is_empty() && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}
