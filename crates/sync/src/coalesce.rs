//! At most one in-flight resolution per key, shared by every caller asking
//! for that key while it runs.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use async_stream::stream;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinError;
use tracing::Instrument;

use crate::error::ErrorKind;
use crate::resource::{Failure, Resource, ResourceStream};

struct Flight<T> {
    latest: Option<Resource<T>>,
    subscribers: Vec<UnboundedSender<Resource<T>>>,
}
impl<T: Clone> Flight<T> {
    fn publish(&mut self, resource: Resource<T>) {
        // Subscribers that went away are dropped; the resolution carries on.
        self.subscribers.retain(|subscriber| subscriber.send(resource.clone()).is_ok());
        self.latest = Some(resource);
    }
}

type Flights<K, T> = Arc<Mutex<HashMap<K, Flight<T>>>>;

/// Deduplicates concurrent resolutions of the same key.
///
/// The first [`resolve`](Self::resolve) of a key spawns its work; callers
/// arriving while it runs are attached to the same execution and first
/// receive its most recent emission. The terminal emission retires the key,
/// so the next caller starts a fresh execution.
///
/// The work always runs to completion, even if every subscriber detaches:
/// what it persists is useful to whoever asks next.
pub struct Coalescer<K, T> {
    flights: Flights<K, T>,
}
impl<K, T> Default for Coalescer<K, T> {
    fn default() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}
impl<K, T> Coalescer<K, T>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    T: Clone + Send + 'static,
{
    /// Subscribe to the resolution of `key`, starting `work` if none is in
    /// flight.
    ///
    /// `work` receives an [`Emitter`] for its (single) loading emission and
    /// returns the terminal [`Resource`]. If it panics, subscribers receive
    /// [`ErrorKind::Aborted`] along with the data of its loading emission.
    pub async fn resolve<F, Fut>(&self, key: K, work: F) -> ResourceStream<T>
    where
        F: FnOnce(Emitter<K, T>) -> Fut,
        Fut: Future<Output = Resource<T>> + Send + 'static,
    {
        let (subscriber, receiver) = unbounded_channel();
        let mut flights = self.flights.lock().await;
        if let Some(flight) = flights.get_mut(&key) {
            tracing::debug!(?key, "joining in-flight resolution");
            if let Some(latest) = &flight.latest {
                _ = subscriber.send(latest.clone());
            }
            flight.subscribers.push(subscriber);
            return subscription(receiver);
        }
        flights.insert(
            key.clone(),
            Flight {
                latest: None,
                subscribers: vec![subscriber],
            },
        );
        drop(flights);

        tracing::debug!(?key, "starting resolution");
        let execution = tokio::spawn(
            work(Emitter {
                key: key.clone(),
                flights: Arc::clone(&self.flights),
                loading: false,
            })
            .in_current_span(),
        );
        let flights = Arc::clone(&self.flights);
        tokio::spawn(async move { retire(flights, key, execution.await).await });
        subscription(receiver)
    }

    /// Number of keys currently being resolved.
    pub async fn in_flight(&self) -> usize {
        self.flights.lock().await.len()
    }
}

/// Publishes the non-terminal emission of one execution.
pub struct Emitter<K, T> {
    key: K,
    flights: Flights<K, T>,
    loading: bool,
}
impl<K, T> Emitter<K, T>
where
    K: Eq + Hash,
    T: Clone,
{
    /// Publish [`Resource::Loading`] to every subscriber.
    ///
    /// Only the first call publishes anything; returns whether it did.
    pub async fn loading(&mut self, data: Option<T>) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        if let Some(flight) = self.flights.lock().await.get_mut(&self.key) {
            flight.publish(Resource::Loading(data));
        }
        true
    }
}

async fn retire<K, T>(flights: Flights<K, T>, key: K, outcome: Result<Resource<T>, JoinError>)
where
    K: Eq + Hash + Debug,
    T: Clone,
{
    let mut flights = flights.lock().await;
    let Some(mut flight) = flights.remove(&key) else {
        return;
    };
    let terminal = match outcome {
        Ok(terminal) => terminal,
        Err(err) => {
            tracing::error!(?key, error = %err, "resolution task died");
            let data = flight.latest.take().and_then(Resource::into_data);
            Resource::failed(Failure::new(ErrorKind::Aborted, err.to_string()), data)
        },
    };
    debug_assert!(terminal.is_terminal(), "resolutions must end with a terminal emission");
    tracing::debug!(?key, failed = terminal.failure().is_some(), "resolution retired");
    flight.publish(terminal);
}

fn subscription<T: Send + 'static>(mut receiver: UnboundedReceiver<Resource<T>>) -> ResourceStream<T> {
    Box::pin(stream! {
        while let Some(resource) = receiver.recv().await {
            let terminal = resource.is_terminal();
            yield resource;
            if terminal {
                break;
            }
        }
    })
}
