use super::{report, ui};
use crate::aggregate::{MonthlyReport, aggregate};
use crate::core::{AppConfig, Averaging, DataFunction, DataProvider, FetchResult, Symbol};
use crate::providers::AlphaVantageClient;
use crate::store::OutputStore;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub symbol: Symbol,
    pub outcomes: Vec<(DataFunction, FetchResult)>,
    pub report: MonthlyReport,
    pub monthly_path: PathBuf,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_err())
            .count()
    }

    pub fn display(&self) -> String {
        format!(
            "Symbol: {}\n\n{}\n\nMonthly averages:\n{}\n\nWritten to {}",
            ui::style_text(self.symbol.as_str(), ui::StyleType::Title),
            report::display_fetch_table(&self.outcomes),
            self.report.display_as_table(),
            self.monthly_path.display()
        )
    }
}

/// Reads the API key, then fetches, aggregates and persists every configured
/// function for `symbol`. A missing key aborts before any request is made.
pub async fn run(symbol: &Symbol, config: &AppConfig) -> Result<RunSummary> {
    let api_key = config.read_api_key()?;
    let client = AlphaVantageClient::new(&config.alpha_vantage, api_key)?;
    let store = OutputStore::new(&config.output_dir);

    run_with_provider(&client, symbol, &config.functions, config.averaging, &store).await
}

/// Fetches `functions` one after another. Each payload is written as soon as
/// it arrives; fetch and write failures are logged and the loop moves on.
/// `monthly.json` is always written, even when nothing could be fetched or
/// saved, and failing to write it is the only fatal error.
#[instrument(skip_all, fields(symbol = %symbol))]
pub async fn run_with_provider(
    provider: &dyn DataProvider,
    symbol: &Symbol,
    functions: &[DataFunction],
    averaging: Averaging,
    store: &OutputStore,
) -> Result<RunSummary> {
    let started = Instant::now();
    info!(functions = functions.len(), "Starting run");
    store.ensure_symbol_dir(symbol)?;

    let pb = ui::new_progress_bar(functions.len() as u64);
    let mut outcomes = Vec::with_capacity(functions.len());
    for function in functions {
        pb.set_message(function.to_string());
        let outcome = provider.fetch(function, symbol).await;
        match &outcome {
            Ok(body) => {
                store.save_raw(symbol, function, body);
            }
            Err(e) => warn!(%function, "Failed to retrieve data: {e}"),
        }
        outcomes.push((function.clone(), outcome));
        pb.inc(1);
    }
    pb.finish_and_clear();

    let report = aggregate(outcomes.iter().map(|(f, r)| (f, r)), averaging);
    let monthly_path = store.write_monthly(&report)?;

    let summary = RunSummary {
        symbol: symbol.clone(),
        outcomes,
        report,
        monthly_path,
    };
    info!(
        failed = summary.failed(),
        months = summary.report.months.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Monthly data for {} written to {}",
        symbol,
        summary.monthly_path.display()
    );
    Ok(summary)
}
