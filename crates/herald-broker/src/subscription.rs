//! Subscriber registration with failover-aware retries.
//!
//! A broker that is failing over answers subscribe calls with transient
//! faults for a while before the standby takes over. [`SubscriptionManager`]
//! rides through that window with bounded, jittered backoff under an overall
//! deadline, and gives up early on anything a retry cannot fix.

use std::sync::Arc;
use std::time::Duration;

use herald_config::RegistrationSection;
use herald_core::{ObjectRef, RetryOutcome, RetryPolicy, TopicName, Unavailable, retry};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::capability::{BrokerManager, Qos};
use crate::error::{RegisterError, RegisterResult, SubscribeFault};
use crate::topic::TopicRegistry;

/// Answers whether an interface type id is known locally.
///
/// Registration refuses endpoints whose type cannot be resolved, before
/// any network call.
pub trait SubscriberTypes: Send + Sync {
    /// Returns true if `type_id` names a registered interface.
    fn resolves(&self, type_id: &str) -> bool;
}

/// Retry, deadline and QoS settings for registration.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationPolicy {
    /// Backoff between subscribe attempts.
    pub retry: RetryPolicy,
    /// Overall deadline for one registration.
    pub timeout: Duration,
    /// QoS passed to the broker.
    pub qos: Qos,
    /// Strictness used by [`SubscriptionManager::register_default`].
    pub strict_default: bool,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self::from(&RegistrationSection::default())
    }
}

impl From<&RegistrationSection> for RegistrationPolicy {
    fn from(section: &RegistrationSection) -> Self {
        Self {
            retry: RetryPolicy::new(
                section.max_retries,
                Duration::from_millis(section.initial_delay_ms),
                Duration::from_millis(section.max_delay_ms),
                section.backoff_base,
            )
            .with_jitter(section.jitter),
            timeout: Duration::from_millis(section.timeout_ms),
            qos: section.qos.clone(),
            strict_default: section.strict_default,
        }
    }
}

/// A successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Subscribe attempts made, including the successful one.
    pub attempts: u32,
    /// The endpoint was already subscribed and strict mode was off.
    pub already_subscribed: bool,
    /// Publisher reference returned by the broker, if it returned one.
    pub publisher: Option<ObjectRef>,
}

/// Registers and unregisters remote endpoints on broker topics.
pub struct SubscriptionManager {
    topics: TopicRegistry,
    types: Arc<dyn SubscriberTypes>,
    policy: RegistrationPolicy,
}

impl SubscriptionManager {
    /// Create a manager.
    #[must_use]
    pub fn new(
        topics: TopicRegistry,
        types: Arc<dyn SubscriberTypes>,
        policy: RegistrationPolicy,
    ) -> Self {
        Self {
            topics,
            types,
            policy,
        }
    }

    /// Registration settings in effect.
    #[must_use]
    pub fn policy(&self) -> &RegistrationPolicy {
        &self.policy
    }

    /// Subscribe `endpoint` to `topic`.
    ///
    /// With `strict`, an endpoint that is already subscribed is an error;
    /// otherwise it counts as success.
    ///
    /// # Errors
    ///
    /// See [`RegisterError`].
    pub async fn register(
        &self,
        topic: &TopicName,
        endpoint: &ObjectRef,
        strict: bool,
    ) -> RegisterResult<Registration> {
        self.register_with_cancel(topic, endpoint, strict, &CancellationToken::new())
            .await
    }

    /// Subscribe using the configured default strictness.
    ///
    /// # Errors
    ///
    /// See [`RegisterError`].
    pub async fn register_default(
        &self,
        topic: &TopicName,
        endpoint: &ObjectRef,
    ) -> RegisterResult<Registration> {
        self.register(topic, endpoint, self.policy.strict_default)
            .await
    }

    /// Subscribe `endpoint` to `topic`, stopping when `cancel` fires.
    ///
    /// The deadline and the cancellation token cover the whole call,
    /// topic resolution included.
    ///
    /// # Errors
    ///
    /// See [`RegisterError`].
    pub async fn register_with_cancel(
        &self,
        topic: &TopicName,
        endpoint: &ObjectRef,
        strict: bool,
        cancel: &CancellationToken,
    ) -> RegisterResult<Registration> {
        if !self.types.resolves(endpoint.type_id()) {
            warn!(
                topic = %topic,
                endpoint = %endpoint,
                type_id = endpoint.type_id(),
                "refusing to register endpoint of unknown type"
            );
            return Err(RegisterError::UnknownSubscriberType {
                type_id: endpoint.type_id().to_owned(),
            });
        }

        let registration = self.subscribe(topic, endpoint, strict, cancel);
        let Ok(result) = tokio::time::timeout(self.policy.timeout, registration).await else {
            warn!(
                topic = %topic,
                endpoint = %endpoint,
                timeout = ?self.policy.timeout,
                "registration timed out"
            );
            return Err(RegisterError::Timeout {
                topic: topic.to_string(),
                after: self.policy.timeout,
            });
        };
        result
    }

    async fn subscribe(
        &self,
        topic: &TopicName,
        endpoint: &ObjectRef,
        strict: bool,
        cancel: &CancellationToken,
    ) -> RegisterResult<Registration> {
        let resolve = async {
            let broker = self.topics.connection().broker().await?;
            let handle = self.topics.get_or_create_on(broker.as_ref(), topic).await?;
            Ok::<_, RegisterError>((broker, handle))
        };
        let (broker, handle) = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!(topic = %topic, endpoint = %endpoint, "registration cancelled before subscribe");
                return Err(RegisterError::Cancelled {
                    topic: topic.to_string(),
                    attempts: 0,
                });
            }
            resolved = resolve => resolved?,
        };
        let qos = &self.policy.qos;

        let outcome = retry(
            &self.policy.retry,
            cancel,
            |attempt| {
                let handle = Arc::clone(&handle);
                async move {
                    if attempt > 0 {
                        debug!(topic = %topic, attempt, "retrying subscribe");
                    }
                    match handle.subscribe_and_get_publisher(qos, endpoint).await {
                        Ok(publisher) => Ok(Some(publisher)),
                        Err(SubscribeFault::AlreadySubscribed) if !strict => Ok(None),
                        Err(fault) => Err(fault),
                    }
                }
            },
            SubscribeFault::is_retryable,
        )
        .await;

        match outcome {
            RetryOutcome::Success { value, attempts } => {
                info!(topic = %topic, endpoint = %endpoint, attempts, "subscriber registered");
                Ok(Registration {
                    attempts,
                    already_subscribed: value.is_none(),
                    publisher: value,
                })
            },
            RetryOutcome::Aborted { attempts } => {
                info!(topic = %topic, endpoint = %endpoint, attempts, "registration cancelled");
                Err(RegisterError::Cancelled {
                    topic: topic.to_string(),
                    attempts,
                })
            },
            RetryOutcome::Exhausted { error, attempts } => {
                Err(self.classify(broker.as_ref(), topic, endpoint, error, attempts))
            },
        }
    }

    fn classify(
        &self,
        broker: &dyn BrokerManager,
        topic: &TopicName,
        endpoint: &ObjectRef,
        fault: SubscribeFault,
        attempts: u32,
    ) -> RegisterError {
        match fault {
            SubscribeFault::AlreadySubscribed => {
                debug!(topic = %topic, endpoint = %endpoint, "endpoint already subscribed");
                RegisterError::DuplicateSubscription {
                    topic: topic.to_string(),
                    endpoint: endpoint.to_string(),
                }
            },
            SubscribeFault::BadQos(reason) => {
                error!(topic = %topic, reason = %reason, qos = ?self.policy.qos, "broker rejected QoS");
                RegisterError::ConfigurationFault {
                    topic: topic.to_string(),
                    reason,
                }
            },
            SubscribeFault::TransientUnavailable | SubscribeFault::LegacyInvalidSubscriber => {
                warn!(topic = %topic, endpoint = %endpoint, attempts, "broker stayed unavailable");
                RegisterError::RetriesExhausted {
                    topic: topic.to_string(),
                    attempts,
                }
            },
            SubscribeFault::Remote(fault) => {
                if fault.is_expected() {
                    debug!(topic = %topic, error = %fault, "subscribe failed");
                } else {
                    warn!(topic = %topic, error = %fault, "subscribe failed");
                }
                self.topics.connection().report_failure(broker, &fault);
                RegisterError::Unavailable(Unavailable::Fault(fault))
            },
        }
    }

    /// Remove `endpoint` from `topic`.
    ///
    /// Never fails: a missing topic, an unreachable broker, a rejected
    /// unsubscribe or a broker that does not answer within the registration
    /// deadline is logged at warn and absorbed.
    pub async fn unregister(&self, topic: &TopicName, endpoint: &ObjectRef) {
        let removal = self.unsubscribe(topic, endpoint);
        if tokio::time::timeout(self.policy.timeout, removal).await.is_err() {
            warn!(
                topic = %topic,
                endpoint = %endpoint,
                timeout = ?self.policy.timeout,
                "unregister timed out"
            );
        }
    }

    async fn unsubscribe(&self, topic: &TopicName, endpoint: &ObjectRef) {
        let handle = match self.topics.lookup(topic).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                warn!(topic = %topic, endpoint = %endpoint, "cannot unregister: topic does not exist");
                return;
            },
            Err(e) => {
                warn!(topic = %topic, endpoint = %endpoint, error = %e, "cannot unregister: topic unavailable");
                return;
            },
        };

        match handle.unsubscribe(endpoint).await {
            Ok(()) => info!(topic = %topic, endpoint = %endpoint, "subscriber unregistered"),
            Err(e) => warn!(topic = %topic, endpoint = %endpoint, error = %e, "unsubscribe failed"),
        }
    }
}
