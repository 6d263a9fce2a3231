pub mod file_scanner;

pub use file_scanner::{DEFAULT_EXCLUDE, DEFAULT_MAX_FILE_SIZE, FileScanner, ScannedFile};
