use relay::server::utils::url_utils::{is_allowed_url, to_absolute};

fn allow_list() -> Vec<String> {
    vec!["fremtv.lol".to_string(), "directfr.lat".to_string()]
}

#[test]
fn test_allows_exact_host() {
    assert!(is_allowed_url("https://fremtv.lol/live/abc.m3u8", &allow_list()));
    assert!(is_allowed_url("https://directfr.lat/embed/42", &allow_list()));
}

#[test]
fn test_allows_subdomains() {
    assert!(is_allowed_url("https://sub.fremtv.lol/x.ts", &allow_list()));
    assert!(is_allowed_url("https://cdn.edge.fremtv.lol/x.ts", &allow_list()));
}

#[test]
fn test_refuses_unlisted_hosts() {
    assert!(!is_allowed_url("https://evil.com/x.m3u8", &allow_list()));

    // suffix matching must not be fooled by lookalike registrations
    assert!(!is_allowed_url("https://notfremtv.lol/x.m3u8", &allow_list()));
    assert!(!is_allowed_url("https://fremtv.lol.evil.com/x.m3u8", &allow_list()));
}

#[test]
fn test_refuses_garbage() {
    // anything that doesn't parse or has no hostname fails closed
    assert!(!is_allowed_url("not a url at all", &allow_list()));
    assert!(!is_allowed_url("relative/path.ts", &allow_list()));
    assert!(!is_allowed_url("data:text/plain,hello", &allow_list()));
    assert!(!is_allowed_url("", &allow_list()));
}

#[test]
fn test_refuses_everything_on_empty_list() {
    assert!(!is_allowed_url("https://fremtv.lol/x.m3u8", &[]));
}

#[test]
fn test_resolves_relative_references() {
    let base = "https://fremtv.lol/live/stream/master.m3u8";

    assert_eq!(
        to_absolute(base, "chunk_001.ts"),
        "https://fremtv.lol/live/stream/chunk_001.ts"
    );
    assert_eq!(
        to_absolute(base, "/hls/other.ts"),
        "https://fremtv.lol/hls/other.ts"
    );
    assert_eq!(
        to_absolute(base, "../low/index.m3u8"),
        "https://fremtv.lol/live/low/index.m3u8"
    );
}

#[test]
fn test_keeps_absolute_references() {
    let base = "https://fremtv.lol/live/master.m3u8";

    assert_eq!(
        to_absolute(base, "https://cdn.example.com/seg.ts"),
        "https://cdn.example.com/seg.ts"
    );
}

#[test]
fn test_hands_back_unresolvable_references() {
    // a broken base can't anchor anything, the reference rides through untouched
    assert_eq!(to_absolute("not a base", "chunk_001.ts"), "chunk_001.ts");
}
