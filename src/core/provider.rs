//! Data provider abstractions

use crate::core::series::{DataFunction, Symbol};
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Why a single data-function could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request error for function {function}: {source}")]
    Transport {
        function: DataFunction,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP error: {status} for function: {function}")]
    Status {
        function: DataFunction,
        status: StatusCode,
    },
}

impl FetchError {
    pub fn function(&self) -> &DataFunction {
        match self {
            FetchError::Transport { function, .. } | FetchError::Status { function, .. } => {
                function
            }
        }
    }
}

/// Outcome of fetching one data-function: the raw body or the failure reason.
pub type FetchResult = Result<String, FetchError>;

#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn fetch(&self, function: &DataFunction, symbol: &Symbol) -> FetchResult;
}
