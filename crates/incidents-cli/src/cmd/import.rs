//! `inc import`: bulk-create incidents from JSON Lines or a JSON array.
//!
//! Each record carries the same four fields as `inc create`:
//!
//! ```text
//! {"title":"Server down","description":"Main server offline","category":"IT","severity":"HIGH"}
//! ```
//!
//! Invalid rows are reported and skipped. The command fails only when the
//! input cannot be read or the store cannot be written.

use crate::cmd::{fail, fail_code, open_project};
use crate::output::{CliError, OutputMode, render};
use anyhow::Context as _;
use clap::Args;
use incidents_core::error::ErrorCode;
use incidents_core::import::{ImportReport, import_records, parse_records};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// File to read; `-` or omitted reads stdin.
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn write_report(report: &ImportReport, w: &mut dyn std::io::Write) -> std::io::Result<()> {
    writeln!(
        w,
        "Imported {} of {} record(s); skipped {}",
        report.created, report.total_rows, report.skipped
    )?;
    for rejection in &report.rejections {
        writeln!(w, "  row {}: {}", rejection.row, rejection.errors.join("; "))?;
    }
    Ok(())
}

pub fn run_import(args: &ImportArgs, output: OutputMode, data_dir: &Path) -> anyhow::Result<()> {
    let text = read_input(args.file.as_deref())
        .map_err(|e| fail_code(output, ErrorCode::StoreReadFailed, format!("{e:#}")))?;
    let records = parse_records(&text).map_err(|e| {
        fail_code(
            output,
            ErrorCode::ValidationFailed,
            format!("input is not a valid JSON array: {e}"),
        )
    })?;

    let mut project = open_project(data_dir, output)?;
    let report = import_records(&mut project.store, records).map_err(|aborted| {
        let error = CliError::from_code(aborted.source.code(), aborted.to_string());
        fail(output, &error)
    })?;

    render(output, &report, write_report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use incidents_core::import::Rejection;

    #[test]
    fn report_lists_each_rejected_row() {
        let report = ImportReport {
            total_rows: 3,
            created: 1,
            skipped: 2,
            created_ids: vec!["a".to_string()],
            rejections: vec![
                Rejection {
                    row: 2,
                    errors: vec!["invalid title 'Bad': too short".to_string()],
                },
                Rejection {
                    row: 3,
                    errors: vec!["malformed record: expected value".to_string()],
                },
            ],
        };

        let mut buf = Vec::new();
        write_report(&report, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Imported 1 of 3 record(s); skipped 2"));
        assert!(text.contains("  row 2: invalid title 'Bad'"));
        assert!(text.contains("  row 3: malformed record"));
    }

    #[test]
    fn reads_named_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("batch.jsonl");
        std::fs::write(&path, "{}\n").unwrap();
        assert_eq!(read_input(Some(&path)).unwrap(), "{}\n");
        assert!(read_input(Some(&dir.path().join("missing.jsonl"))).is_err());
    }
}
