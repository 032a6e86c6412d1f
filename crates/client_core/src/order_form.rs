use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use rust_decimal::Decimal;
use shared::{
    domain::{LineItem, Order, OrderId},
    protocol::{CreateOrderRequest, OrderPayload},
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{api::OrderApi, error::ClientError, notify, state::AppState, ClientEvent, NoticeLevel};

pub const CLIENTE_REQUIRED: &str = "Este campo es obligatorio";
pub const PRODUCTO_REQUIRED: &str = "Producto requerido";
pub const CANTIDAD_NOT_POSITIVE: &str = "Cantidad debe ser mayor que 0";
pub const PRECIO_NEGATIVE: &str = "Precio no puede ser negativo";
pub const EMPTY_ORDER: &str = "Debe agregar al menos un producto a la orden";

pub const QUANTITY_PRICE_INVALID: &str =
    "La cantidad debe ser mayor a 0 y el precio no puede ser negativo";

const CREATED_OK: &str = "Orden registrada correctamente";
const UPDATED_OK: &str = "Orden actualizada correctamente";
const SAVE_FAILED: &str = "Hubo un error al guardar la orden";

/// One editable product line. Fields hold whatever was typed, valid or not.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemDraft {
    pub producto: String,
    pub cantidad: i64,
    pub precio_unitario: Decimal,
}

impl Default for LineItemDraft {
    fn default() -> Self {
        Self {
            producto: String::new(),
            cantidad: 1,
            precio_unitario: Decimal::ZERO,
        }
    }
}

impl From<&LineItem> for LineItemDraft {
    fn from(item: &LineItem) -> Self {
        Self {
            producto: item.producto.clone(),
            cantidad: item.cantidad,
            precio_unitario: item.precio_unitario,
        }
    }
}

impl LineItemDraft {
    pub fn to_line_item(&self) -> LineItem {
        LineItem {
            producto: self.producto.clone(),
            cantidad: self.cantidad,
            precio_unitario: self.precio_unitario,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub cliente: String,
    pub detalles: Vec<LineItemDraft>,
}

impl Default for OrderDraft {
    fn default() -> Self {
        Self {
            cliente: String::new(),
            detalles: vec![LineItemDraft::default()],
        }
    }
}

impl OrderDraft {
    /// Copies an order into a draft; an order without lines gets one blank
    /// line to start from.
    pub fn from_order(order: &Order) -> Self {
        let mut detalles: Vec<LineItemDraft> =
            order.detalles.iter().map(LineItemDraft::from).collect();
        if detalles.is_empty() {
            detalles.push(LineItemDraft::default());
        }
        Self {
            cliente: order.cliente.clone(),
            detalles,
        }
    }

    pub fn to_payload(&self) -> OrderPayload {
        OrderPayload {
            cliente: self.cliente.clone(),
            detalles: self.detalles.iter().map(LineItemDraft::to_line_item).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(OrderId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPath {
    Cliente,
    Producto(usize),
    Cantidad(usize),
    PrecioUnitario(usize),
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cliente => write!(f, "cliente"),
            Self::Producto(index) => write!(f, "detalles[{index}].producto"),
            Self::Cantidad(index) => write!(f, "detalles[{index}].cantidad"),
            Self::PrecioUnitario(index) => write!(f, "detalles[{index}].precioUnitario"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FieldPath,
    pub message: &'static str,
}

impl FieldError {
    fn new(field: FieldPath, message: &'static str) -> Self {
        Self { field, message }
    }
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(Vec<FieldError>),
    #[error("{}", EMPTY_ORDER)]
    EmptyOrder,
    #[error("an order submission is already in flight")]
    SubmissionPending,
    #[error("{}: {}", SAVE_FAILED, .0)]
    Api(#[from] ClientError),
}

/// Checks the draft field by field, then as a whole. Field errors win over
/// the empty-order check.
pub fn validate_draft(draft: &OrderDraft) -> Result<(), FormError> {
    let mut errors = Vec::new();

    if draft.cliente.trim().is_empty() {
        errors.push(FieldError::new(FieldPath::Cliente, CLIENTE_REQUIRED));
    }

    for (index, item) in draft.detalles.iter().enumerate() {
        if item.producto.trim().is_empty() {
            errors.push(FieldError::new(FieldPath::Producto(index), PRODUCTO_REQUIRED));
        }
        if item.cantidad <= 0 {
            errors.push(FieldError::new(
                FieldPath::Cantidad(index),
                CANTIDAD_NOT_POSITIVE,
            ));
        }
        if item.precio_unitario < Decimal::ZERO {
            errors.push(FieldError::new(
                FieldPath::PrecioUnitario(index),
                PRECIO_NEGATIVE,
            ));
        }
    }

    if !errors.is_empty() {
        return Err(FormError::Invalid(errors));
    }
    if draft.detalles.is_empty() {
        return Err(FormError::EmptyOrder);
    }
    Ok(())
}

/// Result of a successful submit. The order is present when the backend
/// echoed it back.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(Option<Order>),
    Updated(Option<Order>),
}

struct FormState {
    draft: OrderDraft,
    mode: FormMode,
    errors: Vec<FieldError>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            draft: OrderDraft::default(),
            mode: FormMode::Create,
            errors: Vec::new(),
        }
    }
}

/// Releases the in-flight flag however the submit ends.
struct SubmitGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SubmitGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self { flag })
        }
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Create/edit form for a single order.
pub struct OrderForm {
    api: Arc<dyn OrderApi>,
    state: AppState,
    events: broadcast::Sender<ClientEvent>,
    inner: Mutex<FormState>,
    submitting: AtomicBool,
}

impl OrderForm {
    pub fn new(
        api: Arc<dyn OrderApi>,
        state: AppState,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            api,
            state,
            events,
            inner: Mutex::new(FormState::default()),
            submitting: AtomicBool::new(false),
        }
    }

    pub async fn draft(&self) -> OrderDraft {
        self.inner.lock().await.draft.clone()
    }

    pub async fn mode(&self) -> FormMode {
        self.inner.lock().await.mode
    }

    /// Field errors from the last validation or submit attempt.
    pub async fn field_errors(&self) -> Vec<FieldError> {
        self.inner.lock().await.errors.clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    pub async fn set_cliente(&self, cliente: impl Into<String>) {
        self.inner.lock().await.draft.cliente = cliente.into();
    }

    pub async fn add_line_item(&self) -> usize {
        let mut inner = self.inner.lock().await;
        inner.draft.detalles.push(LineItemDraft::default());
        inner.draft.detalles.len() - 1
    }

    /// Removing every line is allowed; submit reports the empty order.
    pub async fn remove_line_item(&self, index: usize) -> bool {
        let mut inner = self.inner.lock().await;
        if index >= inner.draft.detalles.len() {
            return false;
        }
        inner.draft.detalles.remove(index);
        true
    }

    pub async fn update_line_item(&self, index: usize, item: LineItemDraft) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.draft.detalles.get_mut(index) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    pub async fn load_for_edit(&self, order: Order) {
        {
            let mut inner = self.inner.lock().await;
            inner.draft = OrderDraft::from_order(&order);
            inner.mode = FormMode::Edit(order.orden_id);
            inner.errors.clear();
        }
        self.state.set_selected(Some(order)).await;
    }

    /// Fetches the latest copy of an order and opens it for editing.
    pub async fn load_for_edit_by_id(&self, id: OrderId) -> Result<(), ClientError> {
        let order = self.api.get_order(id).await?;
        self.load_for_edit(order).await;
        Ok(())
    }

    pub async fn reset_for_create(&self) {
        *self.inner.lock().await = FormState::default();
        self.state.set_selected(None).await;
    }

    pub async fn close(&self) {
        self.reset_for_create().await;
    }

    pub async fn validate(&self) -> Result<(), FormError> {
        let mut inner = self.inner.lock().await;
        let result = validate_draft(&inner.draft);
        inner.errors = match &result {
            Err(FormError::Invalid(errors)) => errors.clone(),
            _ => Vec::new(),
        };
        result
    }

    fn notify_invalid(&self, err: &FormError) {
        match err {
            FormError::EmptyOrder => notify(&self.events, NoticeLevel::Error, EMPTY_ORDER),
            FormError::Invalid(errors)
                if errors.iter().any(|e| {
                    matches!(e.field, FieldPath::Cantidad(_) | FieldPath::PrecioUnitario(_))
                }) =>
            {
                notify(&self.events, NoticeLevel::Error, QUANTITY_PRICE_INVALID)
            }
            _ => {}
        }
    }

    /// Validates and sends the draft. Only one submit runs at a time; a
    /// second call while one is pending returns
    /// [`FormError::SubmissionPending`] without touching the backend.
    pub async fn submit(&self) -> Result<SubmitOutcome, FormError> {
        let Some(_guard) = SubmitGuard::acquire(&self.submitting) else {
            debug!("ignoring order submit while another is in flight");
            return Err(FormError::SubmissionPending);
        };

        let (payload, mode) = {
            let mut inner = self.inner.lock().await;
            let checked = validate_draft(&inner.draft);
            inner.errors = match &checked {
                Err(FormError::Invalid(errors)) => errors.clone(),
                _ => Vec::new(),
            };
            if let Err(err) = checked {
                drop(inner);
                self.notify_invalid(&err);
                return Err(err);
            }
            (inner.draft.to_payload(), inner.mode)
        };

        let result = match mode {
            FormMode::Create => self
                .api
                .create_order(&CreateOrderRequest { orden: payload })
                .await
                .map(SubmitOutcome::Created),
            FormMode::Edit(id) => self
                .api
                .update_order(id, &payload)
                .await
                .map(SubmitOutcome::Updated),
        };

        match result {
            Ok(outcome) => {
                match mode {
                    FormMode::Create => {
                        self.inner.lock().await.draft = OrderDraft::default();
                        info!("order created");
                        notify(&self.events, NoticeLevel::Success, CREATED_OK);
                    }
                    FormMode::Edit(id) => {
                        info!(order_id = id.0, "order updated");
                        notify(&self.events, NoticeLevel::Success, UPDATED_OK);
                    }
                }
                self.state.set_selected(None).await;
                Ok(outcome)
            }
            Err(error) => {
                warn!(%error, ?mode, "failed to save order");
                notify(&self.events, NoticeLevel::Error, SAVE_FAILED);
                Err(FormError::Api(error))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/order_form_tests.rs"]
mod tests;
