pub mod disk;

pub use disk::{MONTHLY_FILE, OutputStore, write_report};
