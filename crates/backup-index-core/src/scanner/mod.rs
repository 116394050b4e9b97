pub mod walk;

pub use walk::{remote_name, scan, ScanStats};
