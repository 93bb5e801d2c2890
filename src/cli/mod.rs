pub mod aggregate;
pub mod report;
pub mod run;
pub mod setup;
pub mod ui;
