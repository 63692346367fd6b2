/// Schemes that already name a single location; no fallbacks are derived.
const ABSOLUTE_SCHEMES: [&str; 4] = ["http:", "https:", "data:", "blob:"];

pub fn is_absolute_url(src: &str) -> bool {
    let lower = src.trim_start().get(..6).unwrap_or(src).to_ascii_lowercase();
    src.starts_with("//") || ABSOLUTE_SCHEMES.iter().any(|s| lower.starts_with(s))
}

/// Ordered, de-duplicated candidate URLs for a model source.
///
/// A bare path expands to: the path as written, origin-relative (`/path`),
/// then public-folder relative (`<public_prefix>/path`). Absolute URLs are
/// tried as-is. Explicit fallbacks are appended last.
pub fn resolve_candidates(source: &str, public_prefix: &str, fallbacks: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |url: String| {
        if !url.is_empty() && !out.contains(&url) {
            out.push(url);
        }
    };

    let source = source.trim();
    if !source.is_empty() {
        if is_absolute_url(source) {
            push(source.to_string());
        } else {
            let bare = source.trim_start_matches("./").trim_start_matches('/');
            let prefix = public_prefix.trim_end_matches('/');
            push(source.to_string());
            if !bare.is_empty() {
                let origin = format!("/{bare}");
                let public = if prefix.is_empty() || origin.starts_with(&format!("{prefix}/")) {
                    None
                } else {
                    Some(format!("{prefix}/{bare}"))
                };
                push(origin);
                if let Some(public) = public {
                    push(public);
                }
            }
        }
    }

    for fb in fallbacks {
        push(fb.trim().to_string());
    }
    out
}

/// Append `t=<stamp>` so the browser doesn't serve a stale model.
pub fn cache_bust(url: &str, stamp_ms: u64) -> String {
    let lower = url.get(..5).unwrap_or(url).to_ascii_lowercase();
    if lower.starts_with("data:") || lower.starts_with("blob:") {
        return url.to_string();
    }
    let (base, fragment) = match url.find('#') {
        Some(i) => url.split_at(i),
        None => (url, ""),
    };
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}t={stamp_ms}{fragment}")
}

/// Resolve a URI found inside a model relative to the model's URL.
pub fn resolve_relative(base_url: &str, uri: &str) -> String {
    if is_absolute_url(uri) || uri.starts_with('/') {
        return uri.to_string();
    }
    let base = base_url
        .split(['?', '#'])
        .next()
        .unwrap_or(base_url);
    match base.rfind('/') {
        Some(i) => format!("{}{}", &base[..=i], uri.trim_start_matches("./")),
        None => uri.trim_start_matches("./").to_string(),
    }
}
