//! Stateless pub-sub plumbing for the fulfillment hooks.
//!
//! Components subscribe to engine events and react to them. Handlers are stateless: they receive the
//! event payload and nothing else, though they may be async.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    inbox: mpsc::Receiver<E>,
    tx: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (tx, inbox) = mpsc::channel(buffer_size);
        Self { inbox, tx, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.tx.clone())
    }

    /// Consumes events until every producer has been dropped, then waits for the in-flight handler
    /// invocations to finish before returning.
    pub async fn start_handler(mut self) {
        debug!("📬️ Event handler running");
        // Our own sender must go first, otherwise the receive loop never ends.
        drop(self.tx);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.inbox.recv().await {
            trace!("📬️ Event received");
            let handler = Arc::clone(&self.handler);
            jobs.spawn(async move {
                (handler)(ev).await;
            });
        }
        while let Some(result) = jobs.join_next().await {
            if let Err(e) = result {
                warn!("📬️ An event handler task failed: {e}");
            }
        }
        debug!("📬️ Event handler stopped");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    tx: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(tx: mpsc::Sender<E>) -> Self {
        Self { tx }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.tx.send(event).await {
            error!("📬️ Could not publish event: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[tokio::test]
    async fn events_are_handled_until_producers_drop() {
        let _ = env_logger::try_init();
        let total = Arc::new(AtomicU64::new(0));
        let tally = total.clone();
        let handler = Arc::new(move |v: u64| {
            let total = total.clone();
            Box::pin(async move {
                total.fetch_add(v, Ordering::SeqCst);
                tokio::time::sleep(tokio::time::Duration::from_millis(25)).await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let event_handler = EventHandler::new(2, handler);
        let producer_a = event_handler.subscribe();
        let producer_b = event_handler.subscribe();
        tokio::spawn(async move {
            for v in [1u64, 3, 5] {
                producer_a.publish_event(v).await;
            }
        });
        tokio::spawn(async move {
            for v in [2u64, 4, 6] {
                producer_b.publish_event(v).await;
            }
        });
        event_handler.start_handler().await;
        assert_eq!(tally.load(Ordering::SeqCst), 21);
    }
}
