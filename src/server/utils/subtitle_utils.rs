use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static SRT_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}:\d{2}:\d{2}),(\d{3})").expect("Srt timestamp pattern should compile")
});

static CUE_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2})[.,](\d{3})").expect("Cue timestamp pattern should compile")
});

/// srt differs from webvtt by its header and the comma millisecond separator, so conversion
/// is a header prepend plus a timestamp sweep. cue numbering lines ride through unchanged,
/// players tolerate them as cue identifiers
pub fn srt_to_vtt(srt_text: &str) -> String {
    let swept = SRT_TIMESTAMP.replace_all(srt_text, "$1.$2");
    let normalized = swept.replace("\r\n", "\n").replace('\r', "\n");

    format!("WEBVTT\n\n{}", normalized)
}

/// shift every cue timestamp by a signed number of seconds, clamping at zero so a rewind
/// past the start can't produce negative times
pub fn apply_offset(content: &str, offset_seconds: f64) -> String {
    CUE_TIMESTAMP
        .replace_all(content, |caps: &Captures| {
            let hours: f64 = caps[1].parse().unwrap_or(0.0);
            let minutes: f64 = caps[2].parse().unwrap_or(0.0);
            let seconds: f64 = caps[3].parse().unwrap_or(0.0);
            let millis: f64 = caps[4].parse().unwrap_or(0.0);

            let total = hours * 3600.0 + minutes * 60.0 + seconds + millis / 1000.0;
            let shifted = (total + offset_seconds).max(0.0);

            let out_hours = (shifted / 3600.0).floor() as u64;
            let out_minutes = ((shifted % 3600.0) / 60.0).floor() as u64;
            let out_seconds = (shifted % 60.0).floor() as u64;
            let out_millis = ((shifted % 1.0) * 1000.0).round() as u64;

            format!(
                "{:02}:{:02}:{:02}.{:03}",
                out_hours, out_minutes, out_seconds, out_millis
            )
        })
        .to_string()
}
