//! Constants used throughout ticketsmith

/// Engine configuration file names in order of preference
pub const CONFIG_FILENAMES: &[&str] =
    &["ticketsmith.yaml", "ticketsmith.yml", "ticketsmith.json"];

/// Environment variable pointing at the template directory tree
pub const TEMPLATE_ROOT_ENV: &str = "TICKETSMITH_TEMPLATE_ROOT";

/// Template root used when neither the flag nor the environment is set
pub const DEFAULT_TEMPLATE_ROOT: &str = "templates";

/// Default patterns matching template definition files
pub const DEFAULT_TEMPLATE_GLOBS: &[&str] = &["**/*.yaml", "**/*.yml"];

/// Patterns never treated as template definitions
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git/**",
    ".hg/**",
    ".svn/**",
    "**/.DS_Store",
    "ticketsmith.yaml",
    "ticketsmith.yml",
    "ticketsmith.json",
];

/// Default cache time-to-live, in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Default separator between rendered sections
pub const DEFAULT_SECTION_SEPARATOR: &str = "\n\n";

/// Sentinel tech stack for platform + document type defaults
pub const AGNOSTIC_TECH_STACK: &str = "custom";

/// Sentinel platform for tech-stack defaults
pub const AGNOSTIC_PLATFORM: &str = "any";

/// Built-in default template identity
pub mod builtin {
    pub const PLATFORM: &str = "builtin";
    pub const DOCUMENT_TYPE: &str = "default";
    pub const VERSION: &str = "1";
}

/// Fallback path labels
pub mod fallback {
    pub const EXACT: &str = "exact";
    pub const PLATFORM_DOC_TYPE: &str = "platform+docType-default";
    pub const TECH_STACK_DOC_TYPE: &str = "techStack+docType-default";
    pub const BUILTIN: &str = "builtin-default";
    pub const HIT: &str = "hit";
    pub const MISS: &str = "miss";
}

/// Exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const RENDER_FAILURE: i32 = 2;
}

/// Verbosity levels
pub mod verbosity {
    pub const OFF: u8 = 0;
    pub const INFO: u8 = 1;
    pub const DEBUG: u8 = 2;
    pub const TRACE: u8 = 3;
}
