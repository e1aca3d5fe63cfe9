//! URL clean-up for `navigate` targets.

/// Targets that are resolved against the current page instead of being
/// completed with a scheme.
pub fn is_relative(url: &str) -> bool {
    let trimmed = url.trim();
    trimmed.starts_with('/')
        || trimmed.starts_with("./")
        || trimmed.starts_with("../")
        || trimmed.starts_with('?')
        || trimmed.starts_with('#')
}

/// Complete a URL the model wrote loosely.
///
/// Returns `None` for an empty target. Absolute URLs and relative paths pass
/// through; `localhost` gets `http://`; anything else gets `https://`.
pub fn normalize_url(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }

    if has_scheme(trimmed) || is_relative(trimmed) {
        return Some(trimmed.to_string());
    }

    if trimmed.starts_with("localhost") || trimmed.starts_with("127.0.0.1") {
        return Some(format!("http://{}", trimmed));
    }

    Some(format!("https://{}", trimmed))
}

fn has_scheme(url: &str) -> bool {
    ["http://", "https://", "file://", "data:", "about:", "chrome://"]
        .iter()
        .any(|prefix| url.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_urls_pass_through() {
        assert_eq!(
            normalize_url("https://example.com/a?b=1").as_deref(),
            Some("https://example.com/a?b=1")
        );
        assert_eq!(
            normalize_url("  http://example.com ").as_deref(),
            Some("http://example.com")
        );
        assert_eq!(normalize_url("about:blank").as_deref(), Some("about:blank"));
        assert_eq!(
            normalize_url("data:text/html,<p>hi</p>").as_deref(),
            Some("data:text/html,<p>hi</p>")
        );
    }

    #[test]
    fn test_bare_hosts_get_a_scheme() {
        assert_eq!(
            normalize_url("example.com").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            normalize_url("news.ycombinator.com/news").as_deref(),
            Some("https://news.ycombinator.com/news")
        );
        assert_eq!(
            normalize_url("localhost:8080/admin").as_deref(),
            Some("http://localhost:8080/admin")
        );
        assert_eq!(
            normalize_url("127.0.0.1:3000").as_deref(),
            Some("http://127.0.0.1:3000")
        );
    }

    #[test]
    fn test_relative_targets() {
        for target in ["/search", "./next", "../up", "?page=2", "#top"] {
            assert!(is_relative(target), "{}", target);
            assert_eq!(normalize_url(target).as_deref(), Some(target));
        }
        assert!(!is_relative("example.com"));
    }

    #[test]
    fn test_empty_target() {
        assert_eq!(normalize_url(""), None);
        assert_eq!(normalize_url("   "), None);
    }
}
