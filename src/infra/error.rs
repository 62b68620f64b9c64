use std::net::SocketAddr;

use thiserror::Error;
use tracing_subscriber::util::TryInitError;

/// Startup failures of the process-level adapters.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("database url is not configured (set `database.url`, KONUT__DATABASE__URL or --database-url)")]
    MissingDatabaseUrl,
    #[error("could not connect to the database")]
    Connect(#[source] sqlx::Error),
    #[error("database migrations failed")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("could not bind listener on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to install tracing subscriber")]
    Telemetry(#[from] TryInitError),
}

impl InfraError {
    pub fn bind(addr: SocketAddr) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Bind { addr, source }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::io;

    use super::*;

    #[test]
    fn bind_failure_keeps_address_and_cause() {
        let addr: SocketAddr = "127.0.0.1:3000".parse().expect("addr");
        let err = InfraError::bind(addr)(io::Error::from(io::ErrorKind::AddrInUse));

        assert_eq!(err.to_string(), "could not bind listener on 127.0.0.1:3000");
        let cause = err.source().expect("io cause");
        assert_eq!(cause.to_string(), io::Error::from(io::ErrorKind::AddrInUse).to_string());
    }

    #[test]
    fn connect_failure_exposes_sqlx_cause() {
        let err = InfraError::Connect(sqlx::Error::PoolTimedOut);
        assert_eq!(err.to_string(), "could not connect to the database");
        assert!(err.source().is_some());
    }
}
