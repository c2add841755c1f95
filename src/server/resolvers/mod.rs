pub mod packer;
pub mod streamwish;
pub mod vidmoly;
pub mod vidzy;
pub mod voe;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::server::dtos::source_dto::StreamSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionErrorKind {
    UnsupportedHost,
    FetchFailed,
    PatternNotFound,
    UnpackFailed,
}

/// structured failure that goes straight back to the frontend as json, `recoverable` tells it
/// whether retrying the same embed later can help
#[derive(Debug, Clone, Serialize, Error)]
#[error("{resolver} extraction failed: {hint}")]
pub struct ExtractionError {
    #[serde(rename = "code")]
    pub kind: ExtractionErrorKind,
    #[serde(rename = "source")]
    pub resolver: &'static str,
    pub hint: String,
    pub recoverable: bool,
}

impl ExtractionError {
    pub fn unsupported_host(hostname: &str) -> Self {
        Self {
            kind: ExtractionErrorKind::UnsupportedHost,
            resolver: "registry",
            hint: format!("no resolver registered for host: {}", hostname),
            recoverable: false,
        }
    }

    pub fn fetch_failed(resolver: &'static str, reason: impl std::fmt::Display) -> Self {
        Self {
            kind: ExtractionErrorKind::FetchFailed,
            resolver,
            hint: format!("embed page request failed: {}", reason),
            recoverable: true,
        }
    }

    pub fn pattern_not_found(resolver: &'static str, hint: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::PatternNotFound,
            resolver,
            hint: hint.into(),
            recoverable: false,
        }
    }

    pub fn unpack_failed(resolver: &'static str, hint: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::UnpackFailed,
            resolver,
            hint: hint.into(),
            recoverable: false,
        }
    }
}

#[async_trait]
pub trait SourceResolver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn extract(
        &self,
        page_url: &str,
        referer: Option<&str>,
    ) -> Result<StreamSource, ExtractionError>;
}

/// ordered hostname pattern -> resolver table. first match wins and there is no fallthrough
/// to a second resolver on failure, a host that matched but failed to extract reports its own
/// error instead of letting another resolver guess
pub struct ResolverRegistry {
    entries: Vec<(Regex, Box<dyn SourceResolver>)>,
}

impl ResolverRegistry {
    pub fn new(http: reqwest::Client) -> Self {
        let mut registry = Self {
            entries: Vec::new(),
        };

        registry.register(
            r"(?i)(streamwish|embedwish|wishembed|strwish|awish|playerwish|swish)",
            Box::new(streamwish::StreamwishResolver::new(http.clone())),
        );
        registry.register(
            r"(?i)vidmoly",
            Box::new(vidmoly::VidmolyResolver::new(http.clone())),
        );
        registry.register(
            r"(?i)(voe\.|vocancellario|ralphysuccessfull)",
            Box::new(voe::VoeResolver::new(http.clone())),
        );
        registry.register(r"(?i)vidzy", Box::new(vidzy::VidzyResolver::new(http)));

        registry
    }

    fn register(&mut self, host_pattern: &str, resolver: Box<dyn SourceResolver>) {
        match Regex::new(host_pattern) {
            Ok(pattern) => self.entries.push((pattern, resolver)),
            // static patterns, a failure here is a programming error caught by the tests
            Err(e) => warn!("skipping resolver with bad host pattern {}: {}", host_pattern, e),
        }
    }

    /// which resolver would handle this embed url, exposed on its own so callers can probe
    /// support without fetching anything
    pub fn resolver_for(&self, page_url: &str) -> Option<&dyn SourceResolver> {
        let parsed = Url::parse(page_url).ok()?;
        let hostname = parsed.host_str()?;

        self.entries
            .iter()
            .find(|(pattern, _)| pattern.is_match(hostname))
            .map(|(_, resolver)| resolver.as_ref())
    }

    pub async fn extract(
        &self,
        page_url: &str,
        referer: Option<&str>,
    ) -> Result<StreamSource, ExtractionError> {
        let hostname = Url::parse(page_url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(|host| host.to_string()))
            .unwrap_or_else(|| page_url.to_string());

        let Some(resolver) = self.resolver_for(page_url) else {
            return Err(ExtractionError::unsupported_host(&hostname));
        };

        info!("extracting {} via {} resolver", hostname, resolver.name());
        resolver.extract(page_url, referer).await
    }
}
