//! Daily to monthly aggregation of Alpha Vantage payloads.
//!
//! Every date-keyed series in every payload is folded into one set of
//! calendar-month buckets: a month collects values from all functions, not
//! just the one they were fetched with. Sums are finalised once, by dividing
//! and rounding half-up to two decimals.

use crate::core::{Averaging, DataFunction, FetchResult, MonthKey};
use anyhow::{Context, Result, bail};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Payload entry holding descriptive data about the series rather than values.
pub const METADATA_KEY: &str = "Meta Data";

/// Magnitude from which an `f64` carries no fractional digits at two decimals.
const LARGE_VALUE: f64 = 1e15;

/// Averaged values of one month, keyed by field name.
pub type MonthlyFields = BTreeMap<String, f64>;

/// Finalised monthly averages, serialised as `{"Monthly Data": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    #[serde(rename = "Monthly Data")]
    pub months: BTreeMap<MonthKey, MonthlyFields>,
}

impl MonthlyReport {
    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Union of all field names, in sorted order.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .months
            .values()
            .flat_map(|fields| fields.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    sum: f64,
    samples: u32,
}

type Buckets = BTreeMap<MonthKey, BTreeMap<String, Tally>>;

/// Accumulates payloads until [`MonthlyAggregator::finish`] is called.
#[derive(Debug, Default)]
pub struct MonthlyAggregator {
    months: Buckets,
    payloads: usize,
}

impl MonthlyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payloads that contributed so far.
    pub fn payloads(&self) -> usize {
        self.payloads
    }

    /// Parses a raw response body and adds it, see [`MonthlyAggregator::add_json`].
    pub fn add_body(&mut self, function: &DataFunction, body: &str) -> Result<usize> {
        let payload: Value = serde_json::from_str(body)
            .with_context(|| format!("Response for {function} is not valid JSON"))?;
        self.add_json(function, &payload)
    }

    /// Adds every date-keyed series of a payload and returns the number of
    /// dated records read. A malformed date rejects the whole payload and
    /// leaves the aggregator untouched.
    pub fn add_json(&mut self, function: &DataFunction, payload: &Value) -> Result<usize> {
        let Value::Object(entries) = payload else {
            bail!("Response for {function} is not a JSON object");
        };

        let mut staged = Buckets::new();
        let mut records = 0;
        for (name, entry) in entries {
            if name == METADATA_KEY {
                continue;
            }
            let Value::Object(series) = entry else {
                continue;
            };

            for (date, record) in series {
                let month = MonthKey::from_date_str(date)
                    .with_context(|| format!("Invalid series '{name}' in {function}"))?;
                let Value::Object(fields) = record else {
                    debug!(%date, "Skipping non-object record in {}", name);
                    continue;
                };
                let bucket = staged.entry(month).or_default();
                for (field, raw) in fields {
                    let Some(value) = parse_number(raw) else {
                        continue;
                    };
                    let tally = bucket.entry(field.clone()).or_default();
                    tally.sum += value;
                    tally.samples += 1;
                }
                records += 1;
            }
        }

        for (month, fields) in staged {
            let bucket = self.months.entry(month).or_default();
            for (field, tally) in fields {
                let total = bucket.entry(field).or_default();
                total.sum += tally.sum;
                total.samples += tally.samples;
            }
        }
        self.payloads += 1;
        Ok(records)
    }

    pub fn finish(self, averaging: Averaging) -> MonthlyReport {
        let months = self
            .months
            .into_iter()
            .map(|(month, fields)| {
                let averaged = fields
                    .into_iter()
                    .filter_map(|(field, tally)| {
                        if !tally.sum.is_finite() {
                            warn!(%month, %field, "Dropping field, sum is out of range");
                            return None;
                        }
                        let divisor = match averaging {
                            Averaging::FixedDivisor { divisor } => f64::from(divisor),
                            Averaging::ContributingDays => f64::from(tally.samples.max(1)),
                        };
                        Some((field, round_half_up(tally.sum / divisor, 2)))
                    })
                    .collect();
                (month, averaged)
            })
            .collect();
        MonthlyReport { months }
    }
}

/// Aggregates the outcome of a fetch run. Failed fetches and rejected
/// payloads are logged and contribute nothing.
#[instrument(skip_all)]
pub fn aggregate<'a, I>(outcomes: I, averaging: Averaging) -> MonthlyReport
where
    I: IntoIterator<Item = (&'a DataFunction, &'a FetchResult)>,
{
    let started = Instant::now();
    let mut aggregator = MonthlyAggregator::new();

    for (function, outcome) in outcomes {
        match outcome {
            Ok(body) => match aggregator.add_body(function, body) {
                Ok(records) => debug!(%function, records, "Aggregated payload"),
                Err(e) => warn!(%function, "Skipping payload: {e:#}"),
            },
            Err(e) => debug!(%function, "No data to aggregate: {e}"),
        }
    }

    let payloads = aggregator.payloads();
    let report = aggregator.finish(averaging);
    info!(
        payloads,
        months = report.months.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Monthly aggregation finished"
    );
    report
}

/// Reads a field value as a number. Descriptive values ("USD", "None") and
/// non-finite numbers yield `None`.
fn parse_number(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Rounds half away from zero on the shortest decimal form of `value`, so
/// `2.675` becomes `2.68` even though its binary value is slightly lower.
/// Values too large for `Decimal` have no fractional digits left and are
/// returned unchanged.
pub fn round_half_up(value: f64, dp: u32) -> f64 {
    if !value.is_finite() || value.abs() >= LARGE_VALUE {
        return value;
    }
    Decimal::from_str(&value.to_string())
        .ok()
        .and_then(|d| {
            d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
                .to_string()
                .parse::<f64>()
                .ok()
        })
        .unwrap_or_else(|| {
            let factor = 10f64.powi(dp as i32);
            (value * factor).round() / factor
        })
}
