use std::sync::Arc;

use shared::domain::{Order, OrderId};
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub mod api;
pub mod error;
pub mod listing;
pub mod order_form;
pub mod state;

pub use api::{HttpOrderApi, OrderApi};
pub use error::ClientError;
pub use listing::{post_submit_action, AnularOutcome, OrderListing, PostSubmitAction};
pub use order_form::{
    validate_draft, FieldError, FieldPath, FormError, FormMode, LineItemDraft, OrderDraft,
    OrderForm, SubmitOutcome,
};
pub use state::{AppState, OrderListState};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A short, non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Notice(Notice),
    ListingUpdated {
        page: u32,
        page_count: u32,
        items: usize,
    },
}

pub(crate) fn notify(
    events: &broadcast::Sender<ClientEvent>,
    level: NoticeLevel,
    message: impl Into<String>,
) {
    let _ = events.send(ClientEvent::Notice(Notice {
        level,
        message: message.into(),
    }));
}

/// One signed-in user's view of the orders backend: the shared state and the
/// controllers working on it.
pub struct OrdersSession {
    api: Arc<dyn OrderApi>,
    state: AppState,
    events: broadcast::Sender<ClientEvent>,
    listing: OrderListing,
    form: OrderForm,
}

impl OrdersSession {
    pub fn new(api: Arc<dyn OrderApi>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = AppState::new();
        Self {
            listing: OrderListing::new(Arc::clone(&api), state.clone(), events.clone()),
            form: OrderForm::new(Arc::clone(&api), state.clone(), events.clone()),
            api,
            state,
            events,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        match self.api.login(username, password).await {
            Ok(_) => {
                self.listing.invalidate();
                self.state.clear().await;
                self.form.reset_for_create().await;
                Ok(())
            }
            Err(error) => {
                warn!(%username, %error, "login failed");
                Err(error)
            }
        }
    }

    pub async fn logout(&self) {
        self.api.logout().await;
        self.listing.invalidate();
        self.state.clear().await;
        self.form.reset_for_create().await;
        debug!("orders session cleared");
    }

    pub fn listing(&self) -> &OrderListing {
        &self.listing
    }

    pub fn form(&self) -> &OrderForm {
        &self.form
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Looks up a single order without touching the form or the listing.
    pub async fn order(&self, id: OrderId) -> Result<Order, ClientError> {
        self.api.get_order(id).await
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Submits the order form and then refreshes or prepends to the listing.
    pub async fn submit_form(&self) -> Result<SubmitOutcome, FormError> {
        let outcome = self.form.submit().await?;
        self.listing.apply_submit(&outcome).await;
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
