//! Broker discovery and the connection that owns its resolution policy.
//!
//! [`DirectoryClient`] answers one question: which broker manager is
//! reachable right now? It never guesses between candidates and never
//! fails loudly; every problem degrades to [`Unavailable`].
//!
//! [`BrokerConnection`] decides how often that question is asked. Under
//! [`ConnectionPolicy::Fresh`] every operation re-queries the directory, so
//! a broker restart or failover is picked up on the next call. Under
//! [`ConnectionPolicy::Sticky`] the last handle is reused until a remote
//! fault is reported or the connection is invalidated.

use std::ptr;
use std::sync::{Arc, RwLock};

use herald_config::{Config, ConnectionPolicy};
use herald_core::{RemoteFault, Unavailable};
use tracing::{debug, info, warn};

use crate::capability::{BrokerManager, Directory};

/// Resolves the broker manager through the directory.
#[derive(Clone)]
pub struct DirectoryClient {
    directory: Arc<dyn Directory>,
    broker_type_id: String,
}

impl DirectoryClient {
    /// Create a client that looks for brokers advertising `broker_type_id`.
    pub fn new(directory: Arc<dyn Directory>, broker_type_id: impl Into<String>) -> Self {
        Self {
            directory,
            broker_type_id: broker_type_id.into(),
        }
    }

    /// Type id queried in the directory.
    #[must_use]
    pub fn broker_type_id(&self) -> &str {
        &self.broker_type_id
    }

    /// Resolve the single reachable broker manager.
    ///
    /// # Errors
    ///
    /// Returns [`Unavailable`] when the directory reports no candidate,
    /// more than one candidate, a candidate that is not a broker manager,
    /// or fails outright.
    pub async fn resolve_broker(&self) -> Result<Arc<dyn BrokerManager>, Unavailable> {
        let result = self.query().await;

        if let Err(reason) = &result {
            if reason.is_expected() {
                debug!(type_id = %self.broker_type_id, reason = %reason, "broker not reachable");
            } else {
                warn!(type_id = %self.broker_type_id, reason = %reason, "broker unavailable");
            }
        }

        result
    }

    async fn query(&self) -> Result<Arc<dyn BrokerManager>, Unavailable> {
        let mut candidates = self
            .directory
            .find_all_by_type(&self.broker_type_id)
            .await?;

        let candidate = match candidates.len() {
            0 => {
                return Err(Unavailable::NoCandidates {
                    type_id: self.broker_type_id.clone(),
                });
            },
            1 => candidates.swap_remove(0),
            count => {
                return Err(Unavailable::Ambiguous {
                    type_id: self.broker_type_id.clone(),
                    count,
                });
            },
        };

        self.directory
            .narrow_broker(&candidate)
            .await?
            .ok_or_else(|| Unavailable::NarrowFailed {
                identity: candidate.identity().to_owned(),
            })
    }
}

/// Owns the directory client and the broker handle resolution policy.
pub struct BrokerConnection {
    client: DirectoryClient,
    policy: ConnectionPolicy,
    cached: RwLock<Option<Arc<dyn BrokerManager>>>,
}

impl BrokerConnection {
    /// Create a connection with an explicit policy.
    #[must_use]
    pub fn new(client: DirectoryClient, policy: ConnectionPolicy) -> Self {
        Self {
            client,
            policy,
            cached: RwLock::new(None),
        }
    }

    /// Create a connection from the `[directory]` and `[connection]`
    /// config sections.
    #[must_use]
    pub fn from_config(directory: Arc<dyn Directory>, config: &Config) -> Self {
        Self::new(
            DirectoryClient::new(directory, config.directory.broker_type_id.clone()),
            config.connection.policy,
        )
    }

    /// Resolution policy in effect.
    #[must_use]
    pub fn policy(&self) -> ConnectionPolicy {
        self.policy
    }

    /// The underlying directory client.
    #[must_use]
    pub fn client(&self) -> &DirectoryClient {
        &self.client
    }

    /// Current broker manager handle.
    ///
    /// # Errors
    ///
    /// Returns [`Unavailable`] if the broker cannot be resolved.
    pub async fn broker(&self) -> Result<Arc<dyn BrokerManager>, Unavailable> {
        if self.policy == ConnectionPolicy::Sticky
            && let Some(broker) = self.cached_handle()
        {
            return Ok(broker);
        }

        let broker = self.client.resolve_broker().await?;

        if self.policy == ConnectionPolicy::Sticky
            && let Ok(mut cached) = self.cached.write()
        {
            *cached = Some(Arc::clone(&broker));
            debug!("cached broker handle");
        }

        Ok(broker)
    }

    /// Drop any cached handle so the next call re-queries the directory.
    pub fn invalidate(&self) {
        if let Ok(mut cached) = self.cached.write()
            && cached.take().is_some()
        {
            debug!("broker handle invalidated");
        }
    }

    /// Force a fresh resolution.
    ///
    /// # Errors
    ///
    /// Returns [`Unavailable`] if the broker cannot be resolved.
    pub async fn refresh(&self) -> Result<Arc<dyn BrokerManager>, Unavailable> {
        self.invalidate();
        self.broker().await
    }

    /// Report a remote fault seen while using `broker`.
    ///
    /// Under the sticky policy this discards the cached handle, but only if
    /// it is still `broker`. A late report about a handle that has since
    /// been replaced leaves the newer one alone.
    pub fn report_failure(&self, broker: &dyn BrokerManager, fault: &RemoteFault) {
        if self.policy != ConnectionPolicy::Sticky {
            return;
        }
        let Ok(mut cached) = self.cached.write() else {
            return;
        };

        let is_current = cached
            .as_ref()
            .is_some_and(|current| ptr::addr_eq(Arc::as_ptr(current), ptr::from_ref(broker)));
        if is_current {
            info!(error = %fault, "discarding broker handle after remote fault");
            *cached = None;
        } else {
            debug!(error = %fault, "fault reported for a stale broker handle");
        }
    }

    /// Whether a broker handle is currently cached.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cached.read().is_ok_and(|cached| cached.is_some())
    }

    fn cached_handle(&self) -> Option<Arc<dyn BrokerManager>> {
        self.cached.read().ok().and_then(|cached| cached.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BROKER_TYPE, FakeBroker, FakeDirectory};
    use std::sync::atomic::Ordering;

    fn client(directory: &Arc<FakeDirectory>) -> DirectoryClient {
        DirectoryClient::new(Arc::clone(directory) as Arc<dyn Directory>, BROKER_TYPE)
    }

    #[tokio::test]
    async fn test_single_candidate_resolves() {
        let directory = Arc::new(FakeDirectory::with_broker(Arc::new(FakeBroker::default())));
        assert!(client(&directory).resolve_broker().await.is_ok());
    }

    #[tokio::test]
    async fn test_no_candidates_is_unavailable() {
        let directory = Arc::new(FakeDirectory::with_candidates(0, None));
        let err = client(&directory).resolve_broker().await.err().unwrap();
        assert!(matches!(err, Unavailable::NoCandidates { .. }));
    }

    #[tokio::test]
    async fn test_two_candidates_is_ambiguous() {
        let broker = Arc::new(FakeBroker::default());
        let directory = Arc::new(FakeDirectory::with_candidates(2, Some(broker)));
        let err = client(&directory).resolve_broker().await.err().unwrap();
        assert!(matches!(err, Unavailable::Ambiguous { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_narrow_failure() {
        let directory = Arc::new(FakeDirectory::with_candidates(1, None));
        let err = client(&directory).resolve_broker().await.err().unwrap();
        assert!(matches!(err, Unavailable::NarrowFailed { identity } if identity == "broker-0"));
    }

    #[tokio::test]
    async fn test_directory_fault_degrades() {
        let directory = Arc::new(FakeDirectory::failing(RemoteFault::NoEndpoint));
        let err = client(&directory).resolve_broker().await.err().unwrap();
        assert_eq!(err, Unavailable::Fault(RemoteFault::NoEndpoint));
        assert!(err.is_expected());
    }

    #[tokio::test]
    async fn test_fresh_policy_queries_every_time() {
        let directory = Arc::new(FakeDirectory::with_broker(Arc::new(FakeBroker::default())));
        let connection = BrokerConnection::new(client(&directory), ConnectionPolicy::Fresh);

        connection.broker().await.unwrap();
        connection.broker().await.unwrap();

        assert_eq!(directory.queries.load(Ordering::SeqCst), 2);
        assert!(!connection.is_cached());
    }

    #[tokio::test]
    async fn test_sticky_policy_reuses_handle_until_failure() {
        let directory = Arc::new(FakeDirectory::with_broker(Arc::new(FakeBroker::default())));
        let connection = BrokerConnection::new(client(&directory), ConnectionPolicy::Sticky);

        connection.broker().await.unwrap();
        connection.broker().await.unwrap();
        assert_eq!(directory.queries.load(Ordering::SeqCst), 1);
        assert!(connection.is_cached());

        let broker = connection.broker().await.unwrap();
        connection.report_failure(broker.as_ref(), &RemoteFault::Timeout);
        assert!(!connection.is_cached());

        connection.broker().await.unwrap();
        assert_eq!(directory.queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_failure_keeps_refreshed_handle() {
        let directory = Arc::new(FakeDirectory::with_broker(Arc::new(FakeBroker::default())));
        let connection = BrokerConnection::new(client(&directory), ConnectionPolicy::Sticky);
        let old: Arc<dyn BrokerManager> = Arc::new(FakeBroker::default());

        let current = connection.broker().await.unwrap();
        connection.report_failure(old.as_ref(), &RemoteFault::Timeout);

        assert!(connection.is_cached());
        let again = connection.broker().await.unwrap();
        assert!(Arc::ptr_eq(&current, &again));
        assert_eq!(directory.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fresh_policy_ignores_failures() {
        let directory = Arc::new(FakeDirectory::with_broker(Arc::new(FakeBroker::default())));
        let connection = BrokerConnection::new(client(&directory), ConnectionPolicy::Fresh);

        let broker = connection.broker().await.unwrap();
        connection.report_failure(broker.as_ref(), &RemoteFault::Timeout);
        assert!(!connection.is_cached());
    }

    #[tokio::test]
    async fn test_refresh_requeries() {
        let directory = Arc::new(FakeDirectory::with_broker(Arc::new(FakeBroker::default())));
        let connection = BrokerConnection::new(client(&directory), ConnectionPolicy::Sticky);

        connection.broker().await.unwrap();
        connection.refresh().await.unwrap();
        assert_eq!(directory.queries.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_from_config_uses_sections() {
        let mut config = Config::default();
        config.connection.policy = ConnectionPolicy::Sticky;
        config.directory.broker_type_id = "::Demo::Broker".into();

        let directory = Arc::new(FakeDirectory::with_candidates(0, None));
        let connection = BrokerConnection::from_config(directory, &config);

        assert_eq!(connection.policy(), ConnectionPolicy::Sticky);
        assert_eq!(connection.client().broker_type_id(), "::Demo::Broker");
    }
}
