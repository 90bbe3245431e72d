//! Tabular export of session results.
//!
//! Files are UTF-8 with a leading byte-order mark so spreadsheet tools pick the right encoding,
//! comma separated, `\n` terminated, and a field is quoted only when it holds a comma, a quote
//! or a newline.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::session::Mode;
use crate::trial::SessionReport;

const BOM: &str = "\u{feff}";

pub const RESULT_HEADERS: [&str; 8] = [
    "順番",
    "回答にかかった時間",
    "正解の指示",
    "被験者の回答",
    "マンハッタン誤差",
    "平均回答時間",
    "正答率",
    "平均誤差",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Results,
    Survey,
}

impl ExportKind {
    fn suffix(self) -> &'static str {
        match self {
            ExportKind::Results => "結果",
            ExportKind::Survey => "アンケート",
        }
    }
}

/// `<modeLabel>_<participantId>_<suffix>.csv`
pub fn file_name(mode: Mode, participant_id: u32, kind: ExportKind) -> String {
    format!(
        "{}_{}_{}.csv",
        mode.file_label(),
        participant_id,
        kind.suffix()
    )
}

/// Header plus data rows, every row as wide as the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSet {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RowSet {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row, padding short rows with empty fields.
    pub fn push<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = row.into_iter().map(Into::into).collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row per trial and a trailing summary row.
pub fn result_rows(report: &SessionReport) -> Result<RowSet> {
    if report.records.is_empty() {
        return Err(Error::EmptyRecords);
    }

    let mut rows = RowSet::new(RESULT_HEADERS);
    for record in &report.records {
        rows.push([
            record.sequence_number.to_string(),
            record.response_time_ms.to_string(),
            record.target_cell.to_string(),
            record.responded_cell.to_string(),
            record.manhattan_error.to_string(),
        ]);
    }

    let summary = &report.summary;
    rows.push([
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        summary.average_response_time_ms.to_string(),
        format!("{:.2}%", summary.accuracy_rate_percent),
        format!("{:.2}", summary.average_manhattan_error),
    ]);
    Ok(rows)
}

/// A single flattened key/value row, keys becoming the header.
pub fn key_value_row<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> RowSet
where
    K: Into<String>,
    V: Into<String>,
{
    let (keys, values): (Vec<String>, Vec<String>) = pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .unzip();
    let mut rows = RowSet::new(keys);
    rows.push(values);
    rows
}

pub fn encode_csv(rows: &RowSet) -> Result<Vec<u8>> {
    if rows.is_empty() {
        return Err(Error::EmptyRecords);
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(BOM.as_bytes().to_vec());
    writer.write_record(rows.headers())?;
    for row in rows.rows() {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Csv(csv::Error::from(e.into_error())))
}

/// Where finished row sets go.
pub trait ResultExporter {
    fn export(&self, file_name: &str, rows: &RowSet) -> Result<PathBuf>;
}

/// Writes CSV files into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct CsvDirExporter {
    dir: PathBuf,
}

impl CsvDirExporter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ResultExporter for CsvDirExporter {
    fn export(&self, file_name: &str, rows: &RowSet) -> Result<PathBuf> {
        let bytes = encode_csv(rows)?;
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let path = self.dir.join(file_name);
        fs::write(&path, bytes).map_err(|e| Error::io(&path, e))?;
        tracing::info!(path = %path.display(), rows = rows.rows().len(), "exported csv");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{score, summarize};
    use crate::session::Grid;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn report() -> SessionReport {
        let grid = Grid::default();
        let records = vec![
            score(&grid, 1, 100, 5, 5),
            score(&grid, 2, 200, 1, 35),
            score(&grid, 3, 300, 8, 8),
        ];
        let summary = summarize(&records).unwrap();
        SessionReport {
            participant_id: 4,
            mode: Mode::Existing,
            records,
            summary,
        }
    }

    fn as_text(bytes: &[u8]) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn file_names_follow_legacy_convention() {
        assert_eq!(
            file_name(Mode::Existing, 12, ExportKind::Results),
            "本番-既存_12_結果.csv"
        );
        assert_eq!(
            file_name(Mode::Proposed, 3, ExportKind::Survey),
            "本番-提案_3_アンケート.csv"
        );
    }

    #[test]
    fn result_rows_end_with_summary() {
        let rows = result_rows(&report()).unwrap();
        assert_eq!(rows.rows().len(), 4);
        assert_eq!(rows.rows()[1], ["2", "200", "1", "35", "10", "", "", ""]);
        assert_eq!(rows.rows()[3], ["", "", "", "", "", "200", "66.67%", "3.33"]);
    }

    #[test]
    fn empty_report_is_rejected() {
        let mut r = report();
        r.records.clear();
        assert_matches!(result_rows(&r), Err(Error::EmptyRecords));
        assert_matches!(encode_csv(&RowSet::new(["a"])), Err(Error::EmptyRecords));
    }

    #[test]
    fn csv_starts_with_bom_and_uses_newlines() {
        let text = as_text(&encode_csv(&result_rows(&report()).unwrap()).unwrap());
        assert!(text.starts_with('\u{feff}'));
        let lines: Vec<&str> = text.trim_start_matches('\u{feff}').lines().collect();
        assert_eq!(lines[0], RESULT_HEADERS.join(","));
        assert_eq!(lines[1], "1,100,5,5,0,,,");
        assert_eq!(lines[4], ",,,,,200,66.67%,3.33");
        assert!(!text.contains('\r'));
    }

    #[test]
    fn fields_with_separators_are_quoted() {
        let rows = key_value_row([
            ("plain", "text"),
            ("comma", "a,b"),
            ("quote", "say \"hi\""),
            ("newline", "one\ntwo"),
        ]);
        let text = as_text(&encode_csv(&rows).unwrap());
        assert_eq!(
            text,
            "\u{feff}plain,comma,quote,newline\ntext,\"a,b\",\"say \"\"hi\"\"\",\"one\ntwo\"\n"
        );
    }

    #[test]
    fn short_rows_are_padded() {
        let mut rows = RowSet::new(["a", "b", "c"]);
        rows.push(["1"]);
        assert_eq!(rows.rows()[0], ["1", "", ""]);
    }

    #[test]
    fn dir_exporter_writes_named_file() {
        let dir = tempdir().unwrap();
        let exporter = CsvDirExporter::new(dir.path().join("out"));
        let name = file_name(Mode::Existing, 4, ExportKind::Results);
        let path = exporter
            .export(&name, &result_rows(&report()).unwrap())
            .unwrap();

        assert_eq!(path, dir.path().join("out").join(&name));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
        assert_eq!(as_text(&bytes).lines().count(), 5);
    }
}
