pub mod auth_services;
pub mod channel_services;
pub mod relay_services;

pub use auth_services::DynAuthResolver;
pub use channel_services::DynChannelService;
pub use relay_services::DynRelayService;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::AppConfig;
use crate::server::resolvers::ResolverRegistry;

use self::auth_services::AuthResolver;
use self::channel_services::ChannelService;
use self::relay_services::RelayService;

// what every upstream hop introduces itself as, resolvers override it per host
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36";

/// everything the handlers need, built once at startup and cloned per request
#[derive(Clone)]
pub struct AppServices {
    pub relay: DynRelayService,
    pub auth: DynAuthResolver,
    pub channels: DynChannelService,
    pub resolvers: Arc<ResolverRegistry>,
    pub http: reqwest::Client,
    pub config: Arc<AppConfig>,
}

impl AppServices {
    pub fn new(config: Arc<AppConfig>) -> Self {
        info!("starting relay services...");

        // shared upstream client, per-request headers layer the browser identity on top
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let relay = Arc::new(RelayService::new(http.clone(), config.clone())) as DynRelayService;

        let auth = Arc::new(AuthResolver::new(http.clone(), config.clone())) as DynAuthResolver;

        let channels = Arc::new(ChannelService::new(auth.clone(), http.clone(), config.clone()))
            as DynChannelService;

        let resolvers = Arc::new(ResolverRegistry::new(http.clone()));

        info!("relay services ok");

        Self {
            relay,
            auth,
            channels,
            resolvers,
            http,
            config,
        }
    }
}
