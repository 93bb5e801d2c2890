use crate::aggregate::MonthlyReport;
use crate::core::{DataFunction, FetchResult, Symbol};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const MONTHLY_FILE: &str = "monthly.json";

/// Writes raw payloads under `<root>/<SYMBOL>/` and the report to `<root>/monthly.json`.
/// Existing files are overwritten.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        OutputStore { root: root.into() }
    }

    pub fn symbol_dir(&self, symbol: &Symbol) -> PathBuf {
        self.root.join(symbol.as_str())
    }

    pub fn raw_path(&self, symbol: &Symbol, function: &DataFunction) -> PathBuf {
        self.symbol_dir(symbol).join(function.file_name())
    }

    pub fn monthly_path(&self) -> PathBuf {
        self.root.join(MONTHLY_FILE)
    }

    pub fn ensure_symbol_dir(&self, symbol: &Symbol) -> Result<PathBuf> {
        let dir = self.symbol_dir(symbol);
        if !dir.is_dir() {
            debug!("Directory {} does not exist, creating", dir.display());
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(dir)
    }

    pub fn write_raw(&self, symbol: &Symbol, function: &DataFunction, body: &str) -> Result<PathBuf> {
        self.ensure_symbol_dir(symbol)?;
        let path = self.raw_path(symbol, function);
        if path.exists() {
            debug!("{} exists, overwriting", path.display());
        } else {
            debug!("{} does not exist, creating", path.display());
        }
        fs::write(&path, body)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn write_monthly(&self, report: &MonthlyReport) -> Result<PathBuf> {
        let path = self.monthly_path();
        write_report(&path, report)?;
        Ok(path)
    }

    /// Like [`OutputStore::write_raw`], but a failure is logged and reported
    /// as `false` so the caller can move on to the next function.
    pub fn save_raw(&self, symbol: &Symbol, function: &DataFunction, body: &str) -> bool {
        match self.write_raw(symbol, function, body) {
            Ok(_) => true,
            Err(e) => {
                warn!(%function, "Failed to save payload: {e:#}");
                false
            }
        }
    }

    /// Writes every successfully fetched payload and the monthly report in one
    /// go, for callers that already hold all outcomes. Failed fetches leave no
    /// file behind and a payload that cannot be saved is skipped; only the
    /// report write is fatal. Returns the number of payloads saved.
    pub fn persist<'a, I>(&self, symbol: &Symbol, outcomes: I, report: &MonthlyReport) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a DataFunction, &'a FetchResult)>,
    {
        self.ensure_symbol_dir(symbol)?;
        let mut written = 0;
        for (function, outcome) in outcomes {
            if let Ok(body) = outcome {
                if self.save_raw(symbol, function, body) {
                    written += 1;
                }
            }
        }
        self.write_monthly(report)?;
        info!(%symbol, written, "Persisted fetched data");
        Ok(written)
    }
}

/// Serialises a report as compact JSON. Map keys are sorted, so equal
/// reports always produce identical bytes.
pub fn write_report<P: AsRef<Path>>(path: P, report: &MonthlyReport) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_vec(report).context("Failed to serialise monthly report")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote monthly report to {}", path.display());
    Ok(())
}
