#[derive(clap::ValueEnum, Clone, Debug, Copy)]
pub enum CargoEnv {
    Development,
    Production,
}

#[derive(clap::Parser)]
pub struct AppConfig {
    // development or production, picks the log level and sink in logger.rs
    #[clap(long, env, value_enum)]
    pub cargo_env: CargoEnv,

    // port the listener binds on
    #[clap(long, env, default_value = "5000")]
    pub port: u16,

    // origin serving the tokened live playlists
    #[clap(long, env, default_value = "https://fremtv.lol")]
    pub upstream_origin: String,

    // embed page origin, goes out as Origin/Referer on every upstream request
    #[clap(long, env, default_value = "https://directfr.lat")]
    pub embed_origin: String,

    // hosts the ?url= relays are allowed to reach, exact or dot-suffix match.
    // everything else is refused before any fetch happens
    #[clap(
        long,
        env,
        value_delimiter = ',',
        default_value = "fremtv.lol,directfr.lat,viamotionhsi.netplus.ch"
    )]
    pub allowed_hosts: Vec<String>,

    // path secret inside the live playlist URL, rotate it when upstream does
    #[clap(long, env)]
    pub live_path_token: String,

    // upstream fetches give up after this many seconds
    #[clap(long, env, default_value = "15")]
    pub upstream_timeout_secs: u64,

    // either * to allow any origin, or a comma separated list of domains like
    // example.com,player.example.com
    #[clap(long, env)]
    pub cors_origin: String,

    // optional sentry integration
    #[clap(long, env)]
    pub sentry_dsn: Option<String>,
}

impl Default for AppConfig {
    // the binary always goes through clap, these exist for tests that build a config by hand
    fn default() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            port: 5000,
            upstream_origin: "https://fremtv.lol".to_string(),
            embed_origin: "https://directfr.lat".to_string(),
            allowed_hosts: vec![
                "fremtv.lol".to_string(),
                "directfr.lat".to_string(),
                "viamotionhsi.netplus.ch".to_string(),
            ],
            live_path_token: "default-live-path-token".to_string(),
            upstream_timeout_secs: 15,
            cors_origin: "*".to_string(),
            sentry_dsn: None,
        }
    }
}
