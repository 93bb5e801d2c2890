//! Identifiers shared by the fetch, aggregation and persistence stages

use anyhow::{Result, anyhow, bail};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Date format of the keys in a daily time series.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Upper-cased ticker symbol, safe to use as a directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Symbol {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbol = s.trim().to_uppercase();
        if symbol.is_empty() {
            bail!("Symbol must not be empty");
        }
        if !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
            || symbol.chars().all(|c| c == '.')
        {
            bail!("Invalid symbol: {}", s);
        }
        Ok(Symbol(symbol))
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A data product offered by the Alpha Vantage API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataFunction {
    TimeSeriesDaily,
    TimeSeriesDailyAdjusted,
    TimeSeriesWeekly,
    TimeSeriesMonthly,
    Overview,
    IncomeStatement,
    BalanceSheet,
    CashFlow,
    Earnings,
    ListingStatus,
    /// Any other function name, stored upper-cased.
    Custom(String),
}

impl DataFunction {
    pub fn as_str(&self) -> &str {
        match self {
            DataFunction::TimeSeriesDaily => "TIME_SERIES_DAILY",
            DataFunction::TimeSeriesDailyAdjusted => "TIME_SERIES_DAILY_ADJUSTED",
            DataFunction::TimeSeriesWeekly => "TIME_SERIES_WEEKLY",
            DataFunction::TimeSeriesMonthly => "TIME_SERIES_MONTHLY",
            DataFunction::Overview => "OVERVIEW",
            DataFunction::IncomeStatement => "INCOME_STATEMENT",
            DataFunction::BalanceSheet => "BALANCE_SHEET",
            DataFunction::CashFlow => "CASH_FLOW",
            DataFunction::Earnings => "EARNINGS",
            DataFunction::ListingStatus => "LISTING_STATUS",
            DataFunction::Custom(name) => name,
        }
    }

    /// File name used when persisting this function's raw payload.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl Display for DataFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFunction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_uppercase();
        let function = match name.as_str() {
            "TIME_SERIES_DAILY" => DataFunction::TimeSeriesDaily,
            "TIME_SERIES_DAILY_ADJUSTED" => DataFunction::TimeSeriesDailyAdjusted,
            "TIME_SERIES_WEEKLY" => DataFunction::TimeSeriesWeekly,
            "TIME_SERIES_MONTHLY" => DataFunction::TimeSeriesMonthly,
            "OVERVIEW" => DataFunction::Overview,
            "INCOME_STATEMENT" => DataFunction::IncomeStatement,
            "BALANCE_SHEET" => DataFunction::BalanceSheet,
            "CASH_FLOW" => DataFunction::CashFlow,
            "EARNINGS" => DataFunction::Earnings,
            "LISTING_STATUS" => DataFunction::ListingStatus,
            "" => return Err(anyhow!("Function name must not be empty")),
            _ if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
                DataFunction::Custom(name)
            }
            _ => return Err(anyhow!("Invalid function name: {}", s)),
        };
        Ok(function)
    }
}

impl TryFrom<String> for DataFunction {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataFunction> for String {
    fn from(value: DataFunction) -> Self {
        value.as_str().to_string()
    }
}

/// Calendar year-month grouping key, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Parses a `YYYY-MM-DD` date strictly and keeps its year and month.
    pub fn from_date_str(date: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|e| anyhow!("Malformed date '{}': {}", date, e))?;
        Ok(MonthKey::from(date))
    }
}

impl From<NaiveDate> for MonthKey {
    fn from(date: NaiveDate) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MonthKey::from_date_str(&format!("{s}-01"))
            .map_err(|_| anyhow!("Invalid month key: {}", s))
    }
}

impl TryFrom<String> for MonthKey {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    fn from(value: MonthKey) -> Self {
        value.to_string()
    }
}
