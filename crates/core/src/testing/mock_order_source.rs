//! Mock order source for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{oneshot, Notify, RwLock};

use crate::order::Order;
use crate::source::{OrderSource, OrderSourceError};

/// Mock implementation of the OrderSource trait.
///
/// Provides controllable behavior for testing:
/// - Return a configurable order list
/// - Count fetches for assertions
/// - Simulate a one-off failure
/// - Stall a fetch after it has read the list
///
/// # Example
///
/// ```rust,ignore
/// use orderwatch_core::testing::{MockOrderSource, fixtures};
///
/// let source = MockOrderSource::new();
/// source.set_orders(vec![fixtures::order_with_ticket("1", "20250601-0042", "9876543210")]).await;
///
/// let orders = source.fetch_orders().await?;
/// assert_eq!(orders.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockOrderSource {
    orders: Arc<RwLock<Vec<Order>>>,
    fetches: Arc<RwLock<usize>>,
    /// If set, the next fetch fails with this error.
    next_error: Arc<RwLock<Option<OrderSourceError>>>,
    held: Arc<RwLock<Option<HeldFetch>>>,
}

#[derive(Debug)]
struct HeldFetch {
    taken: Arc<Notify>,
    release: oneshot::Receiver<()>,
}

/// Handle on a fetch stalled by [`MockOrderSource::hold_next_fetch`].
#[derive(Debug)]
pub struct FetchHold {
    taken: Arc<Notify>,
    release: oneshot::Sender<()>,
}

impl FetchHold {
    /// Wait until the held fetch has copied the order list.
    pub async fn taken(&self) {
        self.taken.notified().await;
    }

    /// Let the held fetch return its copy.
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

impl Default for MockOrderSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOrderSource {
    /// Create a new mock with an empty order list.
    pub fn new() -> Self {
        Self {
            orders: Arc::new(RwLock::new(Vec::new())),
            fetches: Arc::new(RwLock::new(0)),
            next_error: Arc::new(RwLock::new(None)),
            held: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the order list.
    pub async fn set_orders(&self, orders: Vec<Order>) {
        *self.orders.write().await = orders;
    }

    /// Append an order.
    pub async fn add_order(&self, order: Order) {
        self.orders.write().await.push(order);
    }

    /// Replace the order with the same ID, or append it.
    pub async fn upsert_order(&self, order: Order) {
        let mut orders = self.orders.write().await;
        match orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order,
            None => orders.push(order),
        }
    }

    /// Current order list.
    pub async fn orders(&self) -> Vec<Order> {
        self.orders.read().await.clone()
    }

    /// Make the next fetch fail.
    pub async fn set_next_error(&self, error: OrderSourceError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make the next fetch copy the list, then wait for [`FetchHold::release`].
    pub async fn hold_next_fetch(&self) -> FetchHold {
        let taken = Arc::new(Notify::new());
        let (tx, rx) = oneshot::channel();
        *self.held.write().await = Some(HeldFetch {
            taken: Arc::clone(&taken),
            release: rx,
        });
        FetchHold { taken, release: tx }
    }

    /// Number of fetches performed.
    pub async fn fetch_count(&self) -> usize {
        *self.fetches.read().await
    }
}

#[async_trait]
impl OrderSource for MockOrderSource {
    async fn fetch_orders(&self) -> Result<Vec<Order>, OrderSourceError> {
        *self.fetches.write().await += 1;

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let orders = self.orders.read().await.clone();

        let held = self.held.write().await.take();
        if let Some(held) = held {
            held.taken.notify_one();
            let _ = held.release.await;
        }

        Ok(orders)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
