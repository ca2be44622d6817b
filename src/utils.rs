//! Small helpers shared by the extractors, the store and logging.

use scraper::ElementRef;
use url::Url;

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` bytes (backing off to a char boundary) with
/// an ellipsis and the number of dropped bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Visible text of an element with runs of whitespace collapsed to one space.
pub fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether the element's `class` attribute carries `token`.
pub fn has_class(element: &ElementRef<'_>, token: &str) -> bool {
    element.value().classes().any(|c| c == token)
}

/// Resolve an `href` found on a page against a site base URL.
///
/// Root-relative paths are appended to `base` as-is, so a base with a path
/// prefix (`https://www.freecodecamp.org/news`) keeps it. Absolute URLs pass
/// through; other relative forms are joined per RFC 3986.
pub fn absolutize_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if let Ok(absolute) = Url::parse(href) {
        return matches!(absolute.scheme(), "http" | "https").then(|| absolute.to_string());
    }
    if href.starts_with("//") {
        let scheme = Url::parse(base).map(|b| b.scheme().to_string()).ok()?;
        return Some(format!("{scheme}:{href}"));
    }
    if href.starts_with('/') {
        return Some(format!("{}{}", base.trim_end_matches('/'), href));
    }
    let mut base = Url::parse(base).ok()?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(href).ok().map(|u| u.to_string())
}

/// `scheme://host[:port]` of a URL, or the input unchanged if it does not parse.
pub fn website_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}://{}:{}", parsed.scheme(), host, port),
            (Some(host), None) => format!("{}://{}", parsed.scheme(), host),
            _ => url.to_string(),
        },
        Err(_) => url.to_string(),
    }
}
