use tracing::warn;

/// Domain all local documents are attributed to.
pub const LOCAL_FILE_DOMAIN: &str = "local file";

/// Browser and extension internal pages. Time spent there is never tracked.
const UNTRACKED_SCHEMES: &[&str] = &[
    "about",
    "brave",
    "chrome",
    "chrome-extension",
    "chrome-search",
    "chrome-untrusted",
    "devtools",
    "edge",
    "extension",
    "moz-extension",
    "opera",
    "resource",
    "safari-web-extension",
    "view-source",
    "vivaldi",
];

/// Returns the domain time spent on `url` is attributed to, or `None` if the page isn't tracked.
pub fn extract_domain(url: &str) -> Option<String> {
    let url = url.trim();
    let Some((scheme, rest)) = url.split_once(':') else {
        warn!("Ignoring url without scheme {url:?}");
        return None;
    };
    if !is_valid_scheme(scheme) {
        warn!("Ignoring url with malformed scheme {url:?}");
        return None;
    }

    let scheme = scheme.to_ascii_lowercase();
    if scheme == "file" {
        return Some(LOCAL_FILE_DOMAIN.to_string());
    }
    if UNTRACKED_SCHEMES.contains(&scheme.as_str()) {
        return None;
    }

    let Some(authority) = rest.strip_prefix("//") else {
        // data:, blob:, javascript: and similar have no host to attribute time to.
        return None;
    };
    let authority = authority
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);

    match parse_host(host) {
        Some(host) => Some(host),
        None => {
            warn!("Ignoring url with malformed host {url:?}");
            None
        }
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Strips the port and normalizes the host. IPv6 literals keep their brackets.
fn parse_host(host: &str) -> Option<String> {
    let host = if host.starts_with('[') {
        let end = host.find(']')?;
        let (literal, rest) = host.split_at(end + 1);
        if !(rest.is_empty() || valid_port(rest.strip_prefix(':')?)) {
            return None;
        }
        let address = &literal[1..literal.len() - 1];
        if address.is_empty()
            || !address
                .chars()
                .all(|c| c.is_ascii_hexdigit() || c == ':' || c == '.')
        {
            return None;
        }
        literal
    } else {
        let (name, port) = host.split_once(':').unwrap_or((host, ""));
        if !(port.is_empty() || valid_port(port)) {
            return None;
        }
        let name = name.strip_suffix('.').unwrap_or(name);
        if name.is_empty()
            || name.split('.').any(str::is_empty)
            || !name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return None;
        }
        name
    };
    Some(host.to_lowercase())
}

fn valid_port(port: &str) -> bool {
    port.is_empty() || port.parse::<u16>().is_ok()
}
