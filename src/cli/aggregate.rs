use crate::aggregate::{MonthlyAggregator, MonthlyReport};
use crate::core::{Averaging, DataFunction};
use crate::store::write_report;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Names a saved payload after its file stem, so `IBM/OVERVIEW.json` is
/// read back as the `OVERVIEW` function.
fn function_for_file(path: &Path) -> Result<DataFunction> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Cannot derive a function name from {}", path.display()))?;
    stem.parse::<DataFunction>()
        .with_context(|| format!("Cannot derive a function name from {}", path.display()))
}

/// Aggregates previously saved payload files. Unreadable files are fatal;
/// files not named after a function and payloads that are not valid series
/// are skipped with a warning.
pub fn aggregate_files(files: &[PathBuf], averaging: Averaging) -> Result<MonthlyReport> {
    let mut aggregator = MonthlyAggregator::new();
    for path in files {
        let function = match function_for_file(path) {
            Ok(function) => function,
            Err(e) => {
                warn!("Skipping {}: {e:#}", path.display());
                continue;
            }
        };
        let body = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        match aggregator.add_body(&function, &body) {
            Ok(records) => debug!(%function, records, "Aggregated {}", path.display()),
            Err(e) => warn!(%function, "Skipping {}: {e:#}", path.display()),
        }
    }
    Ok(aggregator.finish(averaging))
}

pub fn run(files: &[PathBuf], output: Option<&Path>, averaging: Averaging) -> Result<()> {
    let report = aggregate_files(files, averaging)?;
    println!("{}", report.display_as_table());
    if let Some(path) = output {
        write_report(path, &report)?;
        println!("\nWritten to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MonthKey;
    use tempfile::TempDir;

    #[test]
    fn test_aggregate_saved_payloads() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let daily = temp_dir.path().join("TIME_SERIES_DAILY.json");
        fs::write(
            &daily,
            r#"{"Time Series (Daily)": {"2023-05-01": {"1. open": "20"}, "2023-05-02": {"1. open": "20"}}}"#,
        )?;
        let listing = temp_dir.path().join("LISTING_STATUS.json");
        fs::write(&listing, "symbol,name,exchange\nIBM,International Business Machines,NYSE\n")?;

        let report = aggregate_files(
            &[daily, listing],
            Averaging::FixedDivisor { divisor: 20 },
        )?;
        let month: MonthKey = "2023-05".parse()?;
        assert_eq!(report.months[&month]["1. open"], 2.0);
        Ok(())
    }

    #[test]
    fn test_badly_named_file_is_skipped() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let stray = temp_dir.path().join("my-data.json");
        fs::write(&stray, r#"{"series": {"2023-05-01": {"close": "2200"}}}"#)?;
        let daily = temp_dir.path().join("TIME_SERIES_DAILY.json");
        fs::write(&daily, r#"{"series": {"2023-05-01": {"close": "22"}}}"#)?;

        let report = aggregate_files(&[stray, daily], Averaging::default())?;
        let month: MonthKey = "2023-05".parse()?;
        assert_eq!(report.months[&month]["close"], 1.0);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = aggregate_files(
            &[PathBuf::from("/nonexistent/OVERVIEW.json")],
            Averaging::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_run_writes_output() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let input = temp_dir.path().join("weekly.json");
        fs::write(&input, r#"{"Weekly Time Series": {"2024-01-05": {"4. close": "44"}}}"#)?;
        let output = temp_dir.path().join("out.json");

        run(&[input], Some(&output), Averaging::default())?;
        assert_eq!(
            fs::read_to_string(&output)?,
            r#"{"Monthly Data":{"2024-01":{"4. close":2.0}}}"#
        );
        Ok(())
    }

    #[test]
    fn test_function_for_file() {
        assert_eq!(
            function_for_file(Path::new("IBM/CASH_FLOW.json")).unwrap(),
            DataFunction::CashFlow
        );
        assert!(function_for_file(Path::new("my-data.json")).is_err());
    }
}
