//! Correlation and one-way delivery of events.
//!
//! Each [`DeliveryRequest`] goes through the same steps: resolve the
//! broker, resolve the topic's one-way publisher, bind the target stub to
//! it, find the one operation matching `(method, args.len())`, and invoke
//! it. A failure at any step drops the request with a log line; the
//! producer never hears about it.

use std::sync::Arc;

use herald_broker::{TopicError, TopicRegistry};
use herald_config::DispatchSection;
use herald_core::{RemoteFault, TopicName};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::TopicCatalog;
use crate::error::DropReason;
use crate::interface::{Correlation, InterfaceRegistry};
use crate::publisher::EventPublisher;
use crate::request::{DeliveryOutcome, DeliveryRequest};
use crate::transport::Transport;

/// Forwards delivery requests to topic publishers.
pub struct EventDispatcher {
    topics: TopicRegistry,
    interfaces: Arc<InterfaceRegistry>,
    transport: Arc<dyn Transport>,
}

impl EventDispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(
        topics: TopicRegistry,
        interfaces: Arc<InterfaceRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            topics,
            interfaces,
            transport,
        }
    }

    /// Deliver one request now.
    ///
    /// Every failure is logged here and reported in the outcome.
    pub async fn deliver(&self, request: DeliveryRequest) -> DeliveryOutcome {
        let topic = request.topic.clone();
        let method = request.method.clone();
        let source = request.source.clone();

        match self.try_deliver(request).await {
            Ok(()) => {
                debug!(topic = %topic, method = %method, source = %source, "event delivered");
                DeliveryOutcome::Delivered
            },
            Err(reason) => {
                log_drop(&topic, &method, &source, &reason);
                DeliveryOutcome::Dropped(reason)
            },
        }
    }

    async fn try_deliver(&self, request: DeliveryRequest) -> Result<(), DropReason> {
        let connection = self.topics.connection();
        let broker = connection
            .broker()
            .await
            .map_err(DropReason::BrokerUnavailable)?;

        let publisher = self
            .topics
            .publisher_on(broker.as_ref(), &request.topic)
            .await
            .map_err(|e| match e {
                TopicError::Unavailable(reason) => DropReason::TopicUnavailable {
                    topic: request.topic.to_string(),
                    reason,
                },
                TopicError::RaceViolation { topic } => DropReason::RaceViolation { topic },
            })?;

        let target = request.target.bind(publisher);
        let arity = request.args.len();

        let interface =
            self.interfaces
                .get(target.type_id())
                .ok_or_else(|| DropReason::UnknownInterface {
                    type_id: target.type_id().to_owned(),
                })?;

        let operation = match interface.correlate(&request.method, arity) {
            Correlation::Found(operation) => operation,
            Correlation::NotFound => {
                return Err(DropReason::NotFound {
                    type_id: interface.type_id().to_owned(),
                    method: request.method,
                    arity,
                });
            },
            Correlation::Ambiguous(candidates) => {
                return Err(DropReason::Ambiguous {
                    type_id: interface.type_id().to_owned(),
                    method: request.method,
                    arity,
                    candidates,
                });
            },
        };

        let args = operation
            .encode(request.args)
            .map_err(|reason| DropReason::InvalidArguments {
                method: operation.name().to_owned(),
                reason,
            })?;

        let Some(reference) = target.reference() else {
            return Err(DropReason::InvocationFailed(RemoteFault::NoEndpoint));
        };

        self.transport
            .invoke_oneway(reference, operation.name(), args)
            .await
            .map_err(|fault| {
                connection.report_failure(broker.as_ref(), &fault);
                DropReason::InvocationFailed(fault)
            })
    }

    /// Start the dispatcher task.
    ///
    /// Requests are queued on a channel of `config.queue_capacity` and
    /// delivered with at most `config.concurrency` in flight. With a
    /// concurrency of 1, each producer's requests go out in order.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(self, config: &DispatchSection, catalog: TopicCatalog) -> DispatcherHandle {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let dispatcher = Arc::new(self);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_dispatcher(
            Arc::clone(&dispatcher),
            rx,
            cancel.clone(),
            config.concurrency.max(1),
        ));

        info!(
            queue_capacity = config.queue_capacity,
            concurrency = config.concurrency,
            topics = catalog.len(),
            "dispatcher started"
        );

        DispatcherHandle {
            publisher: EventPublisher::new(tx, Arc::new(catalog)),
            dispatcher,
            cancel,
            task,
        }
    }
}

fn log_drop(topic: &TopicName, method: &str, source: &str, reason: &DropReason) {
    match reason {
        DropReason::BrokerUnavailable(unavailable)
        | DropReason::TopicUnavailable {
            reason: unavailable,
            ..
        } if unavailable.is_expected() => {
            debug!(topic = %topic, method, source, reason = %reason, "dropping event");
        },
        DropReason::BrokerUnavailable(_) | DropReason::TopicUnavailable { .. } => {
            warn!(topic = %topic, method, source, reason = %reason, "dropping event");
        },
        DropReason::InvocationFailed(fault) if fault.is_expected() => {
            debug!(topic = %topic, method, source, reason = %reason, "dropping event");
        },
        _ => {
            error!(topic = %topic, method, source, reason = %reason, "dropping event");
        },
    }
}

/// Owner of a running dispatcher task.
pub struct DispatcherHandle {
    publisher: EventPublisher,
    dispatcher: Arc<EventDispatcher>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// A producer handle feeding this dispatcher.
    #[must_use]
    pub fn publisher(&self) -> EventPublisher {
        self.publisher.clone()
    }

    /// Deliver one request directly, bypassing the queue.
    pub async fn deliver(&self, request: DeliveryRequest) -> DeliveryOutcome {
        self.dispatcher.deliver(request).await
    }

    /// Stop accepting requests, deliver what is already queued, and wait
    /// for the task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        drop(self.publisher);

        if let Err(e) = self.task.await {
            error!(error = %e, "dispatcher task failed");
        }
    }
}

async fn run_dispatcher(
    dispatcher: Arc<EventDispatcher>,
    mut rx: mpsc::Receiver<DeliveryRequest>,
    cancel: CancellationToken,
    concurrency: usize,
) {
    let permits = Arc::new(Semaphore::new(concurrency));
    let mut in_flight = JoinSet::new();

    loop {
        let request = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!("dispatcher shutting down");
                break;
            }
            request = rx.recv() => {
                if let Some(request) = request {
                    request
                } else {
                    info!("all publishers dropped, dispatcher exiting");
                    break;
                }
            }
        };

        start_delivery(&dispatcher, &permits, &mut in_flight, request).await;
        while let Some(result) = in_flight.try_join_next() {
            log_join(result);
        }
    }

    rx.close();
    let mut drained: usize = 0;
    while let Some(request) = rx.recv().await {
        start_delivery(&dispatcher, &permits, &mut in_flight, request).await;
        drained = drained.saturating_add(1);
    }
    while let Some(result) = in_flight.join_next().await {
        log_join(result);
    }

    info!(drained, "dispatcher stopped");
}

async fn start_delivery(
    dispatcher: &Arc<EventDispatcher>,
    permits: &Arc<Semaphore>,
    in_flight: &mut JoinSet<()>,
    request: DeliveryRequest,
) {
    let Ok(permit) = Arc::clone(permits).acquire_owned().await else {
        warn!(topic = %request.topic, "dispatcher permits closed, dropping request");
        return;
    };

    let dispatcher = Arc::clone(dispatcher);
    in_flight.spawn(async move {
        dispatcher.deliver(request).await;
        drop(permit);
    });
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "delivery task failed");
    }
}
