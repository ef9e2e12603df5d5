//! Site identifier normalization

/// Prepend `https://` to a site identifier that has no scheme
///
/// A scheme is an ASCII letter followed by letters, digits, `+`, `-` or `.`
/// and terminated by `:`. Identifiers that already carry one are returned
/// unchanged, so normalizing twice is the same as normalizing once.
pub fn ensure_full_url(site: &str) -> String {
    if has_scheme(site) {
        site.to_string()
    } else {
        format!("https://{}", site)
    }
}

fn has_scheme(site: &str) -> bool {
    let Some((scheme, _)) = site.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return false;
    }
    // `example.com:8080` splits into a scheme-shaped host and a numeric port
    !port_like(&site[scheme.len() + 1..])
}

fn port_like(rest: &str) -> bool {
    let digits: String = rest.chars().take_while(|c| *c != '/').collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_gets_https() {
        assert_eq!(ensure_full_url("google.com"), "https://google.com");
        assert_eq!(
            ensure_full_url("www.example.org/path?q=1"),
            "https://www.example.org/path?q=1"
        );
    }

    #[test]
    fn test_existing_scheme_is_kept() {
        assert_eq!(ensure_full_url("http://example.com"), "http://example.com");
        assert_eq!(ensure_full_url("https://example.com/"), "https://example.com/");
        assert_eq!(ensure_full_url("ftp://files.example.com"), "ftp://files.example.com");
    }

    #[test]
    fn test_host_with_port_is_not_a_scheme() {
        assert_eq!(ensure_full_url("example.com:8080"), "https://example.com:8080");
        assert_eq!(ensure_full_url("localhost:3000"), "https://localhost:3000");
        assert_eq!(
            ensure_full_url("example.com:8080/index.html"),
            "https://example.com:8080/index.html"
        );
    }

    #[test]
    fn test_idempotent() {
        for site in ["google.com", "http://a.b", "x.y:81", "", "  spaced.example  "] {
            let once = ensure_full_url(site);
            assert_eq!(ensure_full_url(&once), once);
        }
    }
}
