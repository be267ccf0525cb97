//! Default values for testlens configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Workspace Defaults
// ============================================================================

/// Files whose presence marks a directory as a Java project.
pub const DEFAULT_PROJECT_MARKERS: &[&str] = &["pom.xml", "build.gradle", "build.gradle.kts", ".project"];

/// Main source roots, relative to a project directory.
pub const DEFAULT_SOURCE_ROOTS: &[&str] = &["src/main/java"];

/// Test source roots, relative to a project directory.
pub const DEFAULT_TEST_SOURCE_ROOTS: &[&str] = &["src/test/java"];

/// Directory holding a project's library archives.
pub const DEFAULT_LIBRARY_DIR: &str = "lib";

/// Maximum size of a single source file to index (1 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Directories never walked for projects or sources.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    // Version control
    ".git",
    ".svn",
    ".hg",
    // Build outputs
    "target",
    "build",
    "out",
    "bin",
    ".gradle",
    // Dependencies
    "node_modules",
    // IDE/Editor
    ".idea",
    ".vscode",
    ".settings",
];

// ============================================================================
// Discovery Defaults
// ============================================================================

/// Frameworks searched when none are configured, by config name.
pub const DEFAULT_FRAMEWORKS: &[&str] = &["junit3", "junit4", "junit5"];

/// Project-local config file name.
pub const LOCAL_CONFIG_FILE: &str = "testlens.toml";

/// Directory under the user config dir.
pub const USER_CONFIG_DIR: &str = "testlens";
