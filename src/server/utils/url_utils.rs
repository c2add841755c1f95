use url::Url;

/// SSRF guard for the ?url= relays. only lets a candidate through when its hostname is an
/// allow-listed entry or a dot-suffix subdomain of one, anything unparseable is refused
pub fn is_allowed_url(candidate: &str, allowed_hosts: &[String]) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };

    let Some(hostname) = url.host_str() else {
        return false;
    };

    allowed_hosts
        .iter()
        .any(|host| hostname == host || hostname.ends_with(&format!(".{}", host)))
}

/// resolve a playlist reference against the url it was fetched from. a reference that refuses
/// to resolve is handed back as-is so the rewriter leaves that line alone
pub fn to_absolute(base: &str, maybe_relative: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(maybe_relative))
        .map(|resolved| resolved.to_string())
        .unwrap_or_else(|_| maybe_relative.to_string())
}
