use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::domain::{Order, OrderFilters, OrderId, Page, SearchCriteria};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    api::OrderApi, error::ClientError, notify, order_form::SubmitOutcome, state::AppState,
    ClientEvent, NoticeLevel,
};

const LIST_FAILED: &str = "Hubo un error al obtener las órdenes";
const ANULAR_OK: &str = "Orden anulada correctamente";
const ANULAR_FAILED: &str = "Hubo un error al anular la orden";

/// What the listing does after the order form saved something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSubmitAction {
    /// Put the new order at the top of the list already on screen.
    Prepend,
    /// Ask the backend for the current page again.
    Refetch,
}

/// A created order is shown immediately only on the first page; edits and
/// anything on later pages go back to the backend.
pub fn post_submit_action(outcome: &SubmitOutcome, current_page: u32) -> PostSubmitAction {
    match outcome {
        SubmitOutcome::Created(Some(_)) if current_page == 1 => PostSubmitAction::Prepend,
        _ => PostSubmitAction::Refetch,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnularOutcome {
    Cancelled,
    Anulada,
}

/// Search, filter and pagination over the order listing.
///
/// Every search takes a generation number. Results are written to the shared
/// state only while their generation is still the latest one issued, so a
/// slow response can never overwrite a newer page.
pub struct OrderListing {
    api: Arc<dyn OrderApi>,
    state: AppState,
    events: broadcast::Sender<ClientEvent>,
    generation: AtomicU64,
}

impl OrderListing {
    pub fn new(
        api: Arc<dyn OrderApi>,
        state: AppState,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            api,
            state,
            events,
            generation: AtomicU64::new(0),
        }
    }

    /// Runs a listing query. Never fails: backend errors leave an empty page
    /// and an error notice behind.
    pub async fn search(&self, criteria: SearchCriteria) -> Page<Order> {
        let generation = {
            let mut guard = self.state.lock().await;
            guard.filters = criteria.filters.clone();
            guard.page = criteria.page;
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        let result = self.api.list_orders(&criteria).await;

        let mut guard = self.state.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, page = criteria.page, "discarding stale order listing");
            return match result {
                Ok(page) => page,
                Err(_) => Page::empty(),
            };
        }

        let page = match result {
            Ok(page) => page,
            Err(error) => {
                warn!(%error, page = criteria.page, "order listing failed");
                notify(&self.events, NoticeLevel::Error, LIST_FAILED);
                Page::empty()
            }
        };

        guard.orders = page.items.clone();
        guard.page_count = page.page_count.max(1);
        let (current_page, page_count) = (guard.page, guard.page_count);
        drop(guard);

        let _ = self.events.send(ClientEvent::ListingUpdated {
            page: current_page,
            page_count,
            items: page.items.len(),
        });
        page
    }

    /// Makes every search still in flight stale.
    pub(crate) fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Replaces the filters and starts again from the first page.
    pub async fn set_filters(&self, filters: OrderFilters) -> Page<Order> {
        self.search(SearchCriteria::new(filters, 1)).await
    }

    /// Re-runs the current query.
    pub async fn refresh(&self) -> Page<Order> {
        let criteria = {
            let guard = self.state.lock().await;
            SearchCriteria::new(guard.filters.clone(), guard.page)
        };
        self.search(criteria).await
    }

    /// Moves to page `page`, clamped to `[1, page_count]`. Asking for the
    /// page already shown does nothing.
    pub async fn go_to_page(&self, page: u32) -> Page<Order> {
        let (target, criteria) = {
            let guard = self.state.lock().await;
            let target = page.clamp(1, guard.page_count.max(1));
            if target == guard.page {
                return guard.current_page();
            }
            (target, SearchCriteria::new(guard.filters.clone(), target))
        };
        debug!(requested = page, target, "changing order listing page");
        self.search(criteria).await
    }

    pub async fn next_page(&self) -> Page<Order> {
        let current = self.state.lock().await.page;
        self.go_to_page(current.saturating_add(1)).await
    }

    pub async fn previous_page(&self) -> Page<Order> {
        let current = self.state.lock().await.page;
        self.go_to_page(current.saturating_sub(1)).await
    }

    /// Brings the list up to date after the order form saved.
    pub async fn apply_submit(&self, outcome: &SubmitOutcome) -> PostSubmitAction {
        let current_page = self.state.lock().await.page;
        let action = post_submit_action(outcome, current_page);
        match (action, outcome) {
            (PostSubmitAction::Prepend, SubmitOutcome::Created(Some(order))) => {
                self.prepend(order.clone()).await;
            }
            _ => {
                self.refresh().await;
            }
        }
        action
    }

    async fn prepend(&self, order: Order) {
        let mut guard = self.state.lock().await;
        // Local writes also invalidate searches still in flight.
        self.generation.fetch_add(1, Ordering::SeqCst);
        guard.orders.insert(0, order);
        let (page, page_count, items) = (guard.page, guard.page_count, guard.orders.len());
        drop(guard);

        let _ = self.events.send(ClientEvent::ListingUpdated {
            page,
            page_count,
            items,
        });
    }

    /// Voids an order after `confirm` agrees to it, then goes back to the
    /// first page keeping the active filters.
    pub async fn anular<F>(&self, id: OrderId, confirm: F) -> Result<AnularOutcome, ClientError>
    where
        F: FnOnce(OrderId) -> bool + Send,
    {
        if !confirm(id) {
            debug!(order_id = id.0, "anulación cancelled");
            return Ok(AnularOutcome::Cancelled);
        }

        if let Err(error) = self.api.delete_order(id).await {
            warn!(order_id = id.0, %error, "failed to anular order");
            notify(&self.events, NoticeLevel::Error, ANULAR_FAILED);
            return Err(error);
        }

        info!(order_id = id.0, "order anulada");
        notify(&self.events, NoticeLevel::Success, ANULAR_OK);
        let filters = self.state.lock().await.filters.clone();
        self.search(SearchCriteria::new(filters, 1)).await;
        Ok(AnularOutcome::Anulada)
    }
}

#[cfg(test)]
#[path = "tests/listing_tests.rs"]
mod tests;
