//! Catalog URL normalization and reference resolution.

use anyhow::{Context, Result};
use reqwest::Url;

/// Rewrite a human-facing `catalog.html` URL to its `catalog.xml` endpoint.
pub fn html_to_xml(url: &str) -> String {
    let (path, query) = split_query(url);
    match path.strip_suffix(".html") {
        Some(stem) => match query {
            Some(q) => format!("{}.xml?{}", stem, q),
            None => format!("{}.xml", stem),
        },
        None => url.to_string(),
    }
}

/// Derive a catalog id from its URL.
///
/// The scheme and the trailing `catalog.xml` (or `.xml`/`.html` extension)
/// are dropped, every run of characters outside `[A-Za-z0-9._-]` becomes a
/// single `_`, and leading or trailing `_` are trimmed.
pub fn catalog_id(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let (path, query) = split_query(without_scheme);
    let trimmed = path
        .strip_suffix("catalog.xml")
        .or_else(|| path.strip_suffix("catalog.html"))
        .or_else(|| path.strip_suffix(".xml"))
        .or_else(|| path.strip_suffix(".html"))
        .unwrap_or(path);

    let mut source = trimmed.to_string();
    if let Some(q) = query {
        source.push('_');
        source.push_str(q);
    }

    let mut id = String::with_capacity(source.len());
    let mut in_run = false;
    for c in source.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            id.push(c);
            in_run = false;
        } else if !in_run {
            id.push('_');
            in_run = true;
        }
    }

    // Dot-only ids would name `.`/`..` directories on disk.
    match id.trim_matches('_') {
        s if s.chars().all(|c| c == '.') => "catalog".to_string(),
        s => s.to_string(),
    }
}

/// Resolve `href` against `base` (RFC 3986).
pub fn resolve(base: &str, href: &str) -> Result<String> {
    let base = Url::parse(base).with_context(|| format!("invalid base URL '{}'", base))?;
    let joined = base
        .join(href)
        .with_context(|| format!("cannot resolve '{}'", href))?;
    Ok(joined.to_string())
}

/// The part of `url` before any query string.
pub fn strip_query(url: &str) -> &str {
    split_query(url).0
}

/// URL of the detail document for dataset `id` in `catalog_url`.
pub fn dataset_detail_url(catalog_url: &str, id: &str) -> String {
    format!("{}?dataset={}", strip_query(catalog_url), id)
}

/// Append form-encoded `dataset` and `catalog` query parameters.
pub fn with_dataset_query(url: &str, dataset_id: &str, catalog_url: &str) -> Result<String> {
    let mut parsed = Url::parse(url).with_context(|| format!("invalid service URL '{}'", url))?;
    parsed
        .query_pairs_mut()
        .append_pair("dataset", dataset_id)
        .append_pair("catalog", catalog_url);
    Ok(parsed.to_string())
}

fn split_query(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}
