pub mod alpha_vantage;
pub mod throttle;
pub mod util;

pub use alpha_vantage::AlphaVantageClient;
pub use throttle::RateLimiter;
