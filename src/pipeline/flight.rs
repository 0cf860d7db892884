use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

type FlightMap<T, E> = HashMap<String, watch::Receiver<Option<Result<T, E>>>>;

/// Collapses concurrent computations for the same key into one.
///
/// The first caller for a key becomes the leader and runs the
/// computation on a detached task; every later caller subscribes to the
/// leader's result. Because the task is detached it keeps running when
/// its callers go away, so a computation that started always gets the
/// chance to finish and persist.
pub struct FlightGroup<T, E> {
    in_flight: Arc<Mutex<FlightMap<T, E>>>,
}

impl<T, E> Clone for FlightGroup<T, E> {
    fn clone(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<T, E> Default for FlightGroup<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> FlightGroup<T, E> {
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Which side of a flight a caller landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRole {
    /// This caller started the computation.
    Leader,
    /// This caller joined a computation already in flight.
    Follower,
}

impl<T, E> FlightGroup<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Runs `compute` under `key`, or joins the run already in flight.
    ///
    /// Every caller of the same flight sees a clone of the same outcome.
    /// Returns `None` only when the computation task died without
    /// publishing a result.
    pub async fn run<F>(&self, key: &str, compute: F) -> (Option<Result<T, E>>, FlightRole)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (mut rx, role) = {
            let mut in_flight = self.in_flight.lock();
            if let Some(rx) = in_flight.get(key) {
                (rx.clone(), FlightRole::Follower)
            } else {
                let (tx, rx) = watch::channel(None);
                in_flight.insert(key.to_string(), rx.clone());

                let cleanup = FlightCleanup {
                    in_flight: Arc::clone(&self.in_flight),
                    key: key.to_string(),
                };
                tokio::spawn(async move {
                    let _cleanup = cleanup;
                    let outcome = compute.await;
                    // Publish before `_cleanup` drops: a caller either
                    // finds this flight in the map or finds its result
                    // already persisted.
                    let _ = tx.send(Some(outcome));
                });
                (rx, FlightRole::Leader)
            }
        };

        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        (outcome, role)
    }
}

/// Removes the flight entry when the leader task ends, even on panic.
struct FlightCleanup<T, E> {
    in_flight: Arc<Mutex<FlightMap<T, E>>>,
    key: String,
}

impl<T, E> Drop for FlightCleanup<T, E> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}
