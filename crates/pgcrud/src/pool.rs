//! Connection pool construction.

use crate::config::ExecutorConfig;
use crate::error::{OrmError, OrmResult};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;
use tokio_postgres::Socket;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};

/// Create a `NoTls` pool sized by `config.max_pool_size`.
pub fn create_pool(config: &ExecutorConfig) -> OrmResult<Pool> {
    create_pool_with_tls(config, NoTls)
}

/// Create a pool using a custom TLS connector.
pub fn create_pool_with_tls<T>(config: &ExecutorConfig, tls: T) -> OrmResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let pg_config: tokio_postgres::Config = config
        .database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| OrmError::Connection(e.to_string()))?;

    let mgr = Manager::from_config(pg_config, tls, default_manager_config());
    Pool::builder(mgr)
        .max_size(config.max_pool_size)
        .build()
        .map_err(|e| OrmError::Pool(e.to_string()))
}

fn default_manager_config() -> ManagerConfig {
    ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_url_is_a_connection_error() {
        let err = create_pool(&ExecutorConfig::new("not a url ::")).unwrap_err();
        assert!(matches!(err, OrmError::Connection(_)));
    }
}
