use std::collections::HashMap;

use serde::Serialize;

/// what an embed page resolves to, the frontend hands `url` straight to the player along
/// with any `headers` the host's cdn checks before serving, `resolver` names which host
/// module produced it
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StreamSource {
    pub url: String,
    pub kind: MediaKind,
    pub resolver: &'static str,
    pub headers: HashMap<String, String>,
    pub quality_label: Option<String>,
}

impl StreamSource {
    pub fn new(url: String, kind: MediaKind, resolver: &'static str) -> Self {
        Self {
            url,
            kind,
            resolver,
            headers: HashMap::new(),
            quality_label: None,
        }
    }

    /// some hosts refuse playback unless the referer the embed was served under comes along
    pub fn with_referer(mut self, referer: &str) -> Self {
        self.headers
            .insert("Referer".to_string(), referer.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Hls,
    Mp4,
}
