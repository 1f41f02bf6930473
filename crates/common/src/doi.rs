//! DOI normalization
//!
//! All graph and corpus keys are normalized DOIs. Normalization happens once
//! at every boundary where a DOI enters the system.

/// Normalize a raw DOI string for use as a key
///
/// Lowercases, trims whitespace, and strips URL/scheme prefixes so that
/// `https://doi.org/10.1234/ABC` and `doi:10.1234/abc` map to the same key.
pub fn normalize_doi(raw: &str) -> String {
    let mut doi = raw.trim().to_lowercase();

    for prefix in ["https://doi.org/", "http://doi.org/", "doi.org/", "doi:"] {
        if let Some(stripped) = doi.strip_prefix(prefix) {
            doi = stripped.to_string();
            break;
        }
    }

    doi
}
