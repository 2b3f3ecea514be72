use url::Url;

/// HTML-escapes a free-text field and drops control characters, so imported
/// names can never carry markup into the dashboards.
pub fn sanitize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '\n' | '\r' | '\t' => out.push(ch),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Parses a user-supplied URL, assuming `https://` when no scheme is given.
fn parse_url(url: &str) -> Option<Url> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    let parsed = if url.contains("://") {
        Url::parse(url)
    } else {
        Url::parse(&format!("https://{url}"))
    };
    parsed
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}

fn is_linkedin_host(url: &Url) -> bool {
    url.host_str()
        .map(|host| host.to_ascii_lowercase().ends_with("linkedin.com"))
        .unwrap_or(false)
}

/// Empty is accepted; anything else must point at a linkedin.com host.
pub fn is_valid_linkedin_url(url: &str) -> bool {
    if url.trim().is_empty() {
        return true;
    }
    parse_url(url).is_some_and(|u| is_linkedin_host(&u))
}

/// The `<username>` in `linkedin.com/in/<username>`, or empty.
pub fn extract_username(url: &str) -> String {
    let Some(url) = parse_url(url).filter(is_linkedin_host) else {
        return String::new();
    };
    let Some(mut segments) = url.path_segments() else {
        return String::new();
    };
    match (segments.next(), segments.next()) {
        (Some("in"), Some(username)) => username.to_string(),
        _ => String::new(),
    }
}

pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn profile_url(username: &str) -> String {
    format!("https://www.linkedin.com/in/{username}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_escapes_markup() {
        assert_eq!(
            sanitize("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"
        );
        assert_eq!(sanitize("Fish & Chips\u{0007}"), "Fish &amp; Chips");
    }

    #[test]
    fn linkedin_url_validation() {
        assert!(is_valid_linkedin_url(""));
        assert!(is_valid_linkedin_url("https://www.linkedin.com/in/avery-lee"));
        assert!(is_valid_linkedin_url("linkedin.com/in/avery-lee"));
        assert!(!is_valid_linkedin_url("https://evil.example.com/linkedin.com/in/x"));
        assert!(!is_valid_linkedin_url("https://linkedin.com.evil.io/in/x"));
        assert!(!is_valid_linkedin_url("https://evil.io@fake.example/in/x"));
        assert!(is_valid_linkedin_url("https://user@www.linkedin.com:443/in/x"));
        assert!(is_valid_linkedin_url("www.linkedin.com:443/in/x"));
        assert!(!is_valid_linkedin_url("javascript://linkedin.com/in/x"));
        assert!(!is_valid_linkedin_url("https://"));
    }

    #[test]
    fn extracts_profile_username() {
        assert_eq!(
            extract_username("https://www.linkedin.com/in/avery-lee/?trk=abc"),
            "avery-lee"
        );
        assert_eq!(extract_username("https://www.linkedin.com/company/acme"), "");
        assert_eq!(extract_username("linkedin.com/in/jules_moreno"), "jules_moreno");
        assert_eq!(extract_username("https://evil.example.com/linkedin.com/in/x"), "");
        assert!(is_valid_username("jules_moreno-2"));
        assert!(!is_valid_username("jules%20moreno"));
    }
}
