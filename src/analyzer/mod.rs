//! Workspace Analyzer
//!
//! File enumeration with gitignore and exclude-glob support.

pub mod scanner;

pub use scanner::FileScanner;
