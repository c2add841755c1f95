/* Logger and sentry initialization */
use std::{panic, thread};

use tracing::{error, level_filters::LevelFilter};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::CargoEnv;

/// keep these alive for the lifetime of the process, dropping them cuts off log
/// flushing and the sentry connection
pub struct LoggerGuards {
    pub _appender: WorkerGuard,
    pub _sentry: Option<sentry::ClientInitGuard>,
}

pub struct Logger {}

impl Logger {
    pub fn init(cargo_env: CargoEnv, sentry_dsn: Option<String>) -> LoggerGuards {
        // dev stays at info on stdout, production writes debug to daily files so every
        // upstream hop is on disk when a channel dies mid-stream
        let (writer, appender_guard, max_level) = match cargo_env {
            CargoEnv::Development => {
                let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
                (writer, guard, LevelFilter::INFO)
            }
            CargoEnv::Production => {
                let daily = tracing_appender::rolling::daily("logs", "relay.log");
                let (writer, guard) = tracing_appender::non_blocking(daily);
                (writer, guard, LevelFilter::DEBUG)
            }
        };

        let sentry_guard = Self::init_sentry(cargo_env, sentry_dsn);

        let registry = tracing_subscriber::registry()
            .with(max_level)
            .with(tracing_subscriber::fmt::layer().with_writer(writer));

        if sentry_guard.is_some() {
            registry.with(sentry_tracing::layer()).init();
        } else {
            registry.init();
        }

        Self::hook_panics();

        LoggerGuards {
            _appender: appender_guard,
            _sentry: sentry_guard,
        }
    }

    fn init_sentry(cargo_env: CargoEnv, dsn: Option<String>) -> Option<sentry::ClientInitGuard> {
        let dsn = dsn?;

        let environment = match cargo_env {
            CargoEnv::Development => "development",
            CargoEnv::Production => "production",
        };
        let options = sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(environment.into()),
            attach_stacktrace: true,
            ..Default::default()
        };

        Some(sentry::init((dsn, options)))
    }

    // panics land in the same sink as everything else instead of bare stderr
    fn hook_panics() {
        panic::set_hook(Box::new(|info| {
            let current = thread::current();
            let thread_name = current.name().unwrap_or("unknown");

            let payload = info.payload();
            let msg = payload
                .downcast_ref::<&'static str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("non-string panic payload");

            let location = info
                .location()
                .map(|at| format!("{}:{}", at.file(), at.line()))
                .unwrap_or_else(|| "unknown location".to_string());

            error!(
                target: "panic", "thread '{}' panicked at '{}': {}\n{:?}",
                thread_name,
                msg,
                location,
                backtrace::Backtrace::new()
            );
        }));
    }
}
