//! Global Constants
//!
//! Centralized constants for configuration and tuning.

/// Workspace folder layout
pub mod workspace {
    /// Folder holding persisted indexes, state and project config
    pub const DATA_DIR: &str = ".ragweave";

    /// Code index persist folder (relative to `DATA_DIR`)
    pub const CODE_EMBEDDINGS_DIR: &str = "code-embeddings";

    /// Dependency index persist folder (relative to `DATA_DIR`)
    pub const DEPENDENCY_EMBEDDINGS_DIR: &str = "dependency-embeddings";

    /// Last-embedded dependency snapshot (relative to `DATA_DIR`)
    pub const DEPENDENCY_STATE_FILE: &str = "dependencies.json";

    /// Project config file (relative to `DATA_DIR`)
    pub const CONFIG_FILE: &str = "config.toml";
}

/// Codebase pipeline constants
pub mod code {
    /// Key used for the root directory, which has no path segment of its own
    pub const ROOT_SENTINEL: &str = "$ROOT";

    /// Text stored when the model returns no content
    pub const MISSING_SUMMARY: &str = "Missing summary";

    /// Extensions tagged `code` in flat tagging mode
    pub const CODE_EXTENSIONS: &[&str] = &[
        "rs", "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "go", "java", "kt", "rb", "c", "cpp",
        "h", "hpp", "cs", "swift", "scala", "php", "lua", "sh", "css", "scss", "html", "vue",
        "svelte",
    ];
}

/// Package resolution constants
pub mod packages {
    pub const PACKAGE_MANIFEST: &str = "package.json";
    pub const PACKAGES_DIR: &str = "node_modules";
    pub const README: &str = "README.md";
    pub const TYPES_SCOPE: &str = "@types";
    pub const DECLARATION_EXT: &str = ".d.ts";
    pub const INDEX_DECLARATION: &str = "index.d.ts";
    pub const BUILTIN_PREFIX: &str = "node:";
}

/// Default rates for cost estimates, USD per million tokens
pub mod pricing {
    /// Usage-guide model input
    pub const INPUT_PER_MILLION: f64 = 5.0;

    /// Usage-guide model output
    pub const OUTPUT_PER_MILLION: f64 = 15.0;

    /// Summary model input
    pub const SUMMARY_INPUT_PER_MILLION: f64 = 0.5;

    /// Summary model output
    pub const SUMMARY_OUTPUT_PER_MILLION: f64 = 1.5;
}

/// Retry constants for completion calls
pub mod retry {
    /// Default number of retries after the first attempt
    pub const DEFAULT_MAX_RETRIES: usize = 2;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
}

/// Retrieval hand-off constants
pub mod retrieval {
    pub const DEFAULT_SIMILARITY_TOP_K: usize = 10;

    /// Query tool over file and directory summaries
    pub const CODE_TOOL_NAME: &str = "code_rag_tool";

    /// Query tool over flat, extension-tagged file summaries
    pub const FLAT_CODE_TOOL_NAME: &str = "code_tool";

    pub const CODE_TOOL_DESCRIPTION: &str =
        "This tool can answer detailed questions about the files in the codebase";

    pub const DEPENDENCY_TOOL_NAME: &str = "dependency_rag_tool";

    pub const DEPENDENCY_TOOL_DESCRIPTION: &str =
        "This tool has documentation for all dependencies in the project";
}
