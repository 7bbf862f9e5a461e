//! URL joining for the Microticks web API.

/// Join a base URL and a path with exactly one `/` between them.
///
/// Duplicate slashes at the join point are collapsed; slashes anywhere
/// else are preserved.
pub fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
