use std::sync::Arc;

use shared::domain::{Order, OrderFilters, Page};
use tokio::sync::{Mutex, MutexGuard};

/// What the order screens currently show.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderListState {
    pub orders: Vec<Order>,
    pub selected: Option<Order>,
    pub filters: OrderFilters,
    pub page: u32,
    pub page_count: u32,
}

impl Default for OrderListState {
    fn default() -> Self {
        Self {
            orders: Vec::new(),
            selected: None,
            filters: OrderFilters::default(),
            page: 1,
            page_count: 1,
        }
    }
}

impl OrderListState {
    pub fn current_page(&self) -> Page<Order> {
        Page {
            items: self.orders.clone(),
            page_count: self.page_count,
        }
    }
}

/// Session-scoped state shared by the listing and the order form. Created at
/// login, cleared at logout.
#[derive(Clone, Default)]
pub struct AppState {
    inner: Arc<Mutex<OrderListState>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> OrderListState {
        self.inner.lock().await.clone()
    }

    pub async fn selected(&self) -> Option<Order> {
        self.inner.lock().await.selected.clone()
    }

    pub async fn set_selected(&self, order: Option<Order>) {
        self.inner.lock().await.selected = order;
    }

    pub async fn clear(&self) {
        *self.inner.lock().await = OrderListState::default();
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, OrderListState> {
        self.inner.lock().await
    }
}
