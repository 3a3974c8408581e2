//! 入力シート読み込み
//!
//! 先頭シートの1行目を見出し、2行目以降をデータ行として文字列で読む。
//! 値の検証はしない。

use crate::error::{BotError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 列の位置を見出し名（大小文字無視）または1始まりの番号で解決
    pub fn column_index(&self, key: &str) -> Result<usize> {
        let key = key.trim();

        if let Some(index) = self
            .headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(key))
        {
            return Ok(index);
        }

        match key.parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.headers.len().max(self.width()) => Ok(n - 1),
            _ => Err(BotError::InvalidArgument(format!(
                "列が見つかりません: {} (見出し: {})",
                key,
                self.headers.join(", ")
            ))),
        }
    }

    /// 列の値（前後の空白を除去、空セルは除外）
    pub fn column(&self, key: Option<&str>) -> Result<Vec<String>> {
        let index = match key {
            Some(k) => self.column_index(k)?,
            None => 0,
        };

        Ok(self
            .rows
            .iter()
            .filter_map(|row| row.get(index))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect())
    }

    fn width(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }
}

/// xlsx/xlsm/xls/ods を読み込む
pub fn read_sheet(path: &Path) -> Result<SheetTable> {
    if !path.is_file() {
        return Err(BotError::FileNotFound(path.display().to_string()));
    }

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| BotError::Sheet(format!("{}: {}", path.display(), e)))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| BotError::Sheet(format!("{}: {}", path.display(), e)))?,
        None => return Ok(SheetTable::default()),
    };

    let mut rows = range.rows().map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>());

    let headers = rows.next().unwrap_or_default();
    let rows: Vec<Vec<String>> = rows
        .filter(|row| row.iter().any(|v| !v.trim().is_empty()))
        .collect();

    tracing::info!(file = %path.display(), rows = rows.len(), "シート読み込み");
    Ok(SheetTable { headers, rows })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SheetTable {
        SheetTable {
            headers: vec!["Customer".into(), "Name".into()],
            rows: vec![
                vec!["ARGOCZ".into(), "Argo".into()],
                vec![" ".into(), "空行".into()],
                vec!["BETA01 ".into()],
            ],
        }
    }

    #[test]
    fn test_column_by_header() {
        assert_eq!(table().column(Some("customer")).unwrap(), vec!["ARGOCZ", "BETA01"]);
    }

    #[test]
    fn test_column_by_number() {
        assert_eq!(table().column(Some("2")).unwrap(), vec!["Argo", "空行"]);
    }

    #[test]
    fn test_default_first_column() {
        assert_eq!(table().column(None).unwrap(), vec!["ARGOCZ", "BETA01"]);
    }

    #[test]
    fn test_unknown_column() {
        assert!(matches!(table().column(Some("Phone")), Err(BotError::InvalidArgument(_))));
        assert!(table().column(Some("0")).is_err());
        assert!(table().column(Some("3")).is_err());
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_sheet(Path::new("/nonexistent/input.xlsx"));
        assert!(matches!(result, Err(BotError::FileNotFound(_))));
    }
}
