//! Staged-file naming: traversal-safe sanitization and the unique-prefix
//! scheme that keeps the original name recoverable.

use std::path::Path;
use uuid::Uuid;

/// Name used when a client declares an empty or unusable filename.
pub const FALLBACK_FILE_NAME: &str = "default.txt";

/// Reduces a client-declared filename to its final component, discarding any
/// path portion so a crafted name cannot escape the staging directory.
pub fn sanitize_file_name(declared: &str) -> String {
    let declared = declared.trim();
    if declared.is_empty() {
        return FALLBACK_FILE_NAME.to_string();
    }

    // Windows-style separators don't split on Unix; normalize them first.
    let normalized = declared.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .map(|n| n.to_string())
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

/// Collision-resistant staging name: a random unique prefix joined to the
/// sanitized original name with a single underscore.
pub fn staged_file_name(declared: &str) -> String {
    format!("{}_{}", Uuid::new_v4(), sanitize_file_name(declared))
}

/// Recovers the original display name from a staged path by stripping the
/// unique prefix. Underscores in the original name survive the round-trip.
pub fn display_file_name(staged: &Path) -> String {
    let name = staged
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(FALLBACK_FILE_NAME);

    name.split_once('_')
        .map(|(_, original)| original)
        .filter(|original| !original.is_empty())
        .unwrap_or(name)
        .to_string()
}
