use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use futures::StreamExt;
use rdkafka::consumer::Consumer;
use rdkafka::consumer::StreamConsumer;
use rdkafka::producer::FutureProducer;
use rdkafka::producer::FutureRecord;
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;
use rdkafka::Message;

use super::dispatcher::MessageDispatcher;
use super::errors::MessageProcessingError;
use crate::config::Config;
use crate::domain::user::ports::AuthServicePort;

const REPLY_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Kafka request/reply endpoint for the auth service.
///
/// Up to `server.max_in_flight_requests` requests are handled concurrently, so
/// slow password hashing for one caller does not hold up the others while the
/// Argon2 memory footprint stays bounded. Replies are keyed by correlation id.
pub struct KafkaRequestConsumer<S: AuthServicePort> {
    consumer: StreamConsumer,
    producer: FutureProducer,
    dispatcher: Arc<MessageDispatcher<S>>,
    reply_topic: String,
    max_in_flight: usize,
}

impl<S: AuthServicePort> KafkaRequestConsumer<S> {
    /// Create the consumer and the reply producer.
    ///
    /// # Arguments
    /// * `config` - Application configuration
    /// * `dispatcher` - Request dispatcher bound to the auth service
    pub fn new(
        config: &Config,
        dispatcher: Arc<MessageDispatcher<S>>,
    ) -> Result<Self, anyhow::Error> {
        tracing::info!(
            "Initializing auth request consumer: brokers={}, group_id={}, topic={}",
            &config.kafka.brokers,
            &config.kafka.group_id,
            &config.kafka.request_topic
        );

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka.brokers)
            .set("group.id", &config.kafka.group_id)
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "5000")
            .set("auto.offset.reset", "latest") // Stale requests have no waiting caller
            .set("session.timeout.ms", "30000")
            .set("enable.partition.eof", "false")
            .create()?;

        consumer.subscribe(&[&config.kafka.request_topic])?;

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka.brokers)
            .set("message.timeout.ms", "30000")
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("retries", "10")
            .set("retry.backoff.ms", "100")
            .create()?;

        tracing::info!(
            "Auth request consumer subscribed to '{}', default reply topic '{}'",
            &config.kafka.request_topic,
            &config.kafka.reply_topic
        );

        Ok(Self {
            consumer,
            producer,
            dispatcher,
            reply_topic: config.kafka.reply_topic.clone(),
            max_in_flight: config.server.max_in_flight_requests,
        })
    }

    /// Start consuming requests from Kafka
    ///
    /// Runs until the stream ends or `shutdown` resolves. After shutdown no new
    /// requests are taken, but requests already in flight still get a reply.
    pub async fn start_consuming<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            max_in_flight = self.max_in_flight,
            "Starting auth request consumer loop"
        );

        let dispatcher = self.dispatcher.as_ref();
        let producer = &self.producer;
        let reply_topic = self.reply_topic.as_str();

        process_bounded(
            self.consumer.stream(),
            shutdown,
            self.max_in_flight,
            move |result| async move {
                let payload = match result {
                    Ok(message) => message.payload().map(<[u8]>::to_vec),
                    Err(error) => {
                        tracing::error!("Error receiving auth request: {}", error);

                        // Add backoff on Kafka errors to avoid tight error loops
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        return;
                    }
                };

                let Some(payload) = payload else {
                    tracing::warn!("{}", MessageProcessingError::NoPayload);
                    return;
                };

                if let Err(error) = respond(dispatcher, producer, reply_topic, &payload).await {
                    tracing::error!("Error processing auth request: {}", error);
                }
            },
        )
        .await;

        tracing::info!("Auth request consumer loop ended");
    }
}

/// Feed `requests` to `handle` with at most `limit` handlers running.
///
/// Intake stops once `shutdown` resolves; the returned future completes when
/// every handler already started has finished.
async fn process_bounded<St, Sh, H, Fut>(requests: St, shutdown: Sh, limit: usize, handle: H)
where
    St: Stream,
    Sh: Future<Output = ()>,
    H: FnMut(St::Item) -> Fut,
    Fut: Future<Output = ()>,
{
    requests
        .take_until(shutdown)
        .for_each_concurrent(limit, handle)
        .await;
}

/// Dispatch one request and publish its reply
async fn respond<S: AuthServicePort>(
    dispatcher: &MessageDispatcher<S>,
    producer: &FutureProducer,
    default_reply_topic: &str,
    payload: &[u8],
) -> Result<(), MessageProcessingError> {
    let reply = dispatcher.dispatch(payload).await?;
    let topic = reply.reply_to.as_deref().unwrap_or(default_reply_topic);
    let body = serde_json::to_string(&reply.envelope)?;

    let record = FutureRecord::to(topic)
        .key(reply.envelope.id.as_str())
        .payload(body.as_str());

    producer
        .send(record, Timeout::After(REPLY_SEND_TIMEOUT))
        .await
        .map_err(|(error, _)| MessageProcessingError::KafkaError(error))?;

    tracing::debug!(
        correlation_id = %reply.envelope.id,
        topic = %topic,
        "Reply published"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    use futures::channel::mpsc;
    use futures::channel::oneshot;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_requests_are_capped() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let handled = AtomicUsize::new(0);
        let (active, peak, handled) = (&active, &peak, &handled);

        process_bounded(
            futures::stream::iter(0..20),
            std::future::pending::<()>(),
            3,
            move |_| async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                handled.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;

        assert_eq!(handled.load(Ordering::SeqCst), 20);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_finishes_in_flight_and_stops_intake() {
        let (requests_tx, requests_rx) = mpsc::unbounded::<u32>();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let replied = Mutex::new(Vec::new());
        let replied_ref = &replied;

        requests_tx.unbounded_send(1).unwrap();

        let consumer = process_bounded(
            requests_rx,
            async {
                let _ = stop_rx.await;
            },
            4,
            move |id| async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                replied_ref.lock().unwrap().push(id);
            },
        );

        let signal = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            stop_tx.send(()).unwrap();
            requests_tx.unbounded_send(2).unwrap();
        };

        tokio::join!(consumer, signal);

        assert_eq!(*replied.lock().unwrap(), vec![1]);
    }
}
