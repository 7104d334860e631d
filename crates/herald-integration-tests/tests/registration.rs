//! Integration tests for subscriber registration and removal.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use herald_broker::{RegisterError, RegistrationPolicy, SubscribeFault};
use herald_core::{ObjectRef, RetryPolicy, Unavailable};
use herald_test::{
    LISTENER_TYPE_ID, TEST_TOPIC, TestHerald, capture_logs, fast_registration_policy,
    test_endpoint, test_topic,
};
use tokio_util::sync::CancellationToken;
use tracing::Level;

#[tokio::test]
async fn strict_duplicate_is_rejected() {
    let herald = TestHerald::new();
    let endpoint = test_endpoint("listener-1");

    let first = herald
        .subscriptions
        .register(&test_topic(), &endpoint, true)
        .await
        .unwrap();
    assert_eq!(first.attempts, 1);
    assert!(!first.already_subscribed);
    assert!(first.publisher.is_some());

    let err = herald
        .subscriptions
        .register(&test_topic(), &endpoint, true)
        .await
        .unwrap_err();
    assert!(matches!(err, RegisterError::DuplicateSubscription { .. }));
    assert_eq!(herald.broker.topic(TEST_TOPIC).unwrap().subscriber_count(), 1);
}

#[tokio::test]
async fn lenient_duplicate_is_success() {
    let herald = TestHerald::new();
    let endpoint = test_endpoint("listener-1");

    herald
        .subscriptions
        .register(&test_topic(), &endpoint, false)
        .await
        .unwrap();
    let again = herald
        .subscriptions
        .register(&test_topic(), &endpoint, false)
        .await
        .unwrap();

    assert!(again.already_subscribed);
    assert!(again.publisher.is_none());
    assert_eq!(herald.broker.topic(TEST_TOPIC).unwrap().subscriber_count(), 1);
}

#[tokio::test]
async fn default_strictness_comes_from_policy() {
    let policy = RegistrationPolicy {
        strict_default: true,
        ..fast_registration_policy(0)
    };
    let herald = TestHerald::with_policy(policy);
    let endpoint = test_endpoint("listener-1");

    herald
        .subscriptions
        .register_default(&test_topic(), &endpoint)
        .await
        .unwrap();
    let err = herald
        .subscriptions
        .register_default(&test_topic(), &endpoint)
        .await
        .unwrap_err();

    assert!(matches!(err, RegisterError::DuplicateSubscription { .. }));
}

#[tokio::test]
async fn rides_through_failover() {
    let (herald, topic) = common::herald_with_script(
        TestHerald::new(),
        std::iter::repeat_n(SubscribeFault::TransientUnavailable, 4),
    );

    let registration = herald
        .subscriptions
        .register(&test_topic(), &test_endpoint("listener-1"), true)
        .await
        .unwrap();

    assert_eq!(registration.attempts, 5);
    assert_eq!(topic.attempts(), 5);
    assert!(topic.is_subscribed("listener-1"));
}

#[tokio::test]
async fn legacy_invalid_subscriber_is_retried() {
    let (herald, topic) = common::herald_with_script(
        TestHerald::new(),
        [
            SubscribeFault::LegacyInvalidSubscriber,
            SubscribeFault::TransientUnavailable,
        ],
    );

    let registration = herald
        .subscriptions
        .register(&test_topic(), &test_endpoint("listener-1"), true)
        .await
        .unwrap();

    assert_eq!(registration.attempts, 3);
    assert_eq!(topic.attempts(), 3);
}

#[tokio::test]
async fn retries_are_bounded() {
    let (herald, topic) = common::herald_with_script(
        TestHerald::with_policy(fast_registration_policy(2)),
        std::iter::repeat_n(SubscribeFault::TransientUnavailable, 10),
    );

    let err = herald
        .subscriptions
        .register(&test_topic(), &test_endpoint("listener-1"), true)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RegisterError::RetriesExhausted {
            topic: TEST_TOPIC.into(),
            attempts: 3,
        }
    );
    assert_eq!(topic.attempts(), 3);
    assert!(!topic.is_subscribed("listener-1"));
}

#[tokio::test]
async fn bad_qos_is_not_retried() {
    let (logs, _guard) = capture_logs();
    let (herald, topic) = common::herald_with_script(
        TestHerald::new(),
        [SubscribeFault::BadQos("reliability=bogus".into())],
    );

    let err = herald
        .subscriptions
        .register(&test_topic(), &test_endpoint("listener-1"), true)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RegisterError::ConfigurationFault {
            topic: TEST_TOPIC.into(),
            reason: "reliability=bogus".into(),
        }
    );
    assert_eq!(topic.attempts(), 1);
    assert!(logs.logged(Level::ERROR, "broker rejected QoS"));
}

#[tokio::test]
async fn qos_is_passed_verbatim() {
    let qos: BTreeMap<String, String> = [
        ("reliability".to_owned(), "ordered".to_owned()),
        ("retryCount".to_owned(), "3".to_owned()),
    ]
    .into_iter()
    .collect();
    let policy = RegistrationPolicy {
        qos: qos.clone(),
        ..fast_registration_policy(0)
    };
    let herald = TestHerald::with_policy(policy);

    herald
        .subscriptions
        .register(&test_topic(), &test_endpoint("listener-1"), true)
        .await
        .unwrap();

    let topic = herald.broker.topic(TEST_TOPIC).unwrap();
    assert_eq!(topic.last_qos(), Some(qos));
}

#[tokio::test]
async fn unknown_type_is_refused_before_any_remote_call() {
    let (logs, _guard) = capture_logs();
    let herald = TestHerald::new();
    let endpoint = ObjectRef::new("stranger", "::demo::Unknown");

    let err = herald
        .subscriptions
        .register(&test_topic(), &endpoint, true)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RegisterError::UnknownSubscriberType {
            type_id: "::demo::Unknown".into()
        }
    );
    assert_eq!(herald.directory.queries(), 0);
    assert_eq!(herald.broker.topic_count(), 0);
    assert!(logs.logged(Level::WARN, "unknown type"));
}

#[tokio::test]
async fn dotted_type_id_is_accepted() {
    let herald = TestHerald::new();
    let dotted = LISTENER_TYPE_ID.trim_start_matches("::").replace("::", ".");
    let endpoint = ObjectRef::new("listener-dotted", dotted);

    let registration = herald
        .subscriptions
        .register(&test_topic(), &endpoint, true)
        .await
        .unwrap();

    assert_eq!(registration.attempts, 1);
}

#[tokio::test]
async fn register_provisions_topic() {
    let herald = TestHerald::new();
    assert!(herald.broker.topic(TEST_TOPIC).is_none());

    herald
        .subscriptions
        .register(&test_topic(), &test_endpoint("listener-1"), true)
        .await
        .unwrap();

    assert_eq!(herald.broker.creates(), 1);
    assert!(
        herald
            .broker
            .topic(TEST_TOPIC)
            .unwrap()
            .is_subscribed("listener-1")
    );
}

#[tokio::test]
async fn unregister_removes_subscriber() {
    let herald = TestHerald::new();
    let endpoint = test_endpoint("listener-1");

    herald
        .subscriptions
        .register(&test_topic(), &endpoint, true)
        .await
        .unwrap();
    herald.subscriptions.unregister(&test_topic(), &endpoint).await;

    let topic = herald.broker.topic(TEST_TOPIC).unwrap();
    assert!(!topic.is_subscribed("listener-1"));

    // A fresh strict registration now succeeds.
    herald
        .subscriptions
        .register(&test_topic(), &endpoint, true)
        .await
        .unwrap();
}

#[tokio::test]
async fn unregister_missing_topic_warns_and_creates_nothing() {
    let (logs, _guard) = capture_logs();
    let herald = TestHerald::new();

    herald
        .subscriptions
        .unregister(&test_topic(), &test_endpoint("listener-1"))
        .await;

    assert!(logs.logged(Level::WARN, "topic does not exist"));
    assert_eq!(herald.broker.topic_count(), 0);
    assert_eq!(herald.broker.creates(), 0);
}

#[tokio::test]
async fn unregister_unknown_endpoint_warns() {
    let (logs, _guard) = capture_logs();
    let herald = TestHerald::new();
    herald.broker.ensure_topic(TEST_TOPIC);

    herald
        .subscriptions
        .unregister(&test_topic(), &test_endpoint("never-registered"))
        .await;

    assert!(logs.logged(Level::WARN, "unsubscribe failed"));
}

#[tokio::test]
async fn unregister_without_broker_is_absorbed() {
    let (logs, _guard) = capture_logs();
    let herald = TestHerald::new();
    common::remove_brokers(&herald);

    herald
        .subscriptions
        .unregister(&test_topic(), &test_endpoint("listener-1"))
        .await;

    assert!(logs.logged(Level::WARN, "topic unavailable"));
}

#[tokio::test]
async fn no_broker_is_unavailable() {
    let herald = TestHerald::new();
    common::remove_brokers(&herald);

    let err = herald
        .subscriptions
        .register(&test_topic(), &test_endpoint("listener-1"), true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RegisterError::Unavailable(Unavailable::NoCandidates { .. })
    ));
}

#[tokio::test]
async fn ambiguous_brokers_are_unavailable() {
    let herald = TestHerald::new();
    common::make_ambiguous(&herald);

    let err = herald
        .subscriptions
        .register(&test_topic(), &test_endpoint("listener-1"), true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RegisterError::Unavailable(Unavailable::Ambiguous { count: 2, .. })
    ));
}

#[tokio::test]
async fn vanishing_topic_is_race_violation() {
    let herald = TestHerald::new();
    herald.broker.simulate_vanishing_topic(TEST_TOPIC);

    let err = herald
        .subscriptions
        .register(&test_topic(), &test_endpoint("listener-1"), true)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RegisterError::RaceViolation {
            topic: TEST_TOPIC.into()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn deadline_stops_long_failover() {
    let policy = RegistrationPolicy {
        retry: RetryPolicy::new(
            100,
            Duration::from_secs(1),
            Duration::from_secs(1),
            1.0,
        ),
        timeout: Duration::from_secs(3),
        ..RegistrationPolicy::default()
    };
    let (herald, topic) = common::herald_with_script(
        TestHerald::with_policy(policy),
        std::iter::repeat_n(SubscribeFault::TransientUnavailable, 100),
    );

    let err = herald
        .subscriptions
        .register(&test_topic(), &test_endpoint("listener-1"), true)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RegisterError::Timeout {
            topic: TEST_TOPIC.into(),
            after: Duration::from_secs(3),
        }
    );
    assert!(topic.attempts() < 100);
}

#[tokio::test]
async fn cancellation_stops_retries() {
    let (herald, topic) = common::herald_with_script(
        TestHerald::new(),
        std::iter::repeat_n(SubscribeFault::TransientUnavailable, 100),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = herald
        .subscriptions
        .register_with_cancel(&test_topic(), &test_endpoint("listener-1"), true, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, RegisterError::Cancelled { .. }));
    assert!(topic.attempts() <= 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_covers_unresponsive_directory() {
    let policy = RegistrationPolicy {
        timeout: Duration::from_millis(50),
        ..fast_registration_policy(3)
    };
    let herald = TestHerald::with_policy(policy);
    herald.directory.set_hanging(true);

    let err = herald
        .subscriptions
        .register(&test_topic(), &test_endpoint("listener-1"), true)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RegisterError::Timeout {
            topic: TEST_TOPIC.into(),
            after: Duration::from_millis(50),
        }
    );
    assert_eq!(herald.broker.topic_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_reaches_topic_resolution() {
    let herald = TestHerald::new();
    herald.directory.set_hanging(true);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = herald
        .subscriptions
        .register_with_cancel(&test_topic(), &test_endpoint("listener-1"), true, &cancel)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RegisterError::Cancelled {
            topic: TEST_TOPIC.into(),
            attempts: 0,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn unregister_gives_up_on_unresponsive_directory() {
    let (logs, _guard) = capture_logs();
    let policy = RegistrationPolicy {
        timeout: Duration::from_millis(50),
        ..fast_registration_policy(3)
    };
    let herald = TestHerald::with_policy(policy);
    herald.directory.set_hanging(true);

    herald
        .subscriptions
        .unregister(&test_topic(), &test_endpoint("listener-1"))
        .await;

    assert!(logs.logged(Level::WARN, "unregister timed out"));
}
