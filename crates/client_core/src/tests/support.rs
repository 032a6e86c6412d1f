//! In-memory orders backend for controller tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{
    domain::{LineItem, Order, OrderId, Page, SearchCriteria},
    error::{ApiError, ApiException},
    protocol::{CreateOrderRequest, OrderPayload},
};
use tokio::sync::Notify;

use crate::{api::OrderApi, error::ClientError};

pub fn order(id: i64, cliente: &str) -> Order {
    Order {
        orden_id: OrderId(id),
        cliente: cliente.to_string(),
        fecha_creacion: None,
        total: Decimal::new(10, 0),
        detalles: vec![LineItem {
            producto: "Widget".into(),
            cantidad: 1,
            precio_unitario: Decimal::new(10, 0),
        }],
    }
}

pub fn page_of(ids: &[i64], page_count: u32) -> Page<Order> {
    Page {
        items: ids.iter().map(|id| order(*id, "Acme")).collect(),
        page_count,
    }
}

fn server_error() -> ClientError {
    ClientError::Api(ApiException::from(ApiError::from_status(500, "boom")))
}

#[derive(Default)]
pub struct FakeOrderApi {
    pub default_page: Mutex<Option<Page<Order>>>,
    pub pages: Mutex<HashMap<u32, Page<Order>>>,
    pub page_gates: Mutex<HashMap<u32, Arc<Notify>>>,
    pub list_calls: Mutex<Vec<SearchCriteria>>,
    pub fail_list: AtomicBool,

    pub created: Mutex<Vec<CreateOrderRequest>>,
    pub updated: Mutex<Vec<(OrderId, OrderPayload)>>,
    pub deleted: Mutex<Vec<OrderId>>,
    pub fail_writes: AtomicBool,
    pub echo_writes: AtomicBool,
    pub write_gate: Mutex<Option<Arc<Notify>>>,

    pub stored: Mutex<HashMap<i64, Order>>,
    pub logged_out: AtomicBool,
}

impl FakeOrderApi {
    pub fn new() -> Arc<Self> {
        let api = Self::default();
        api.echo_writes.store(true, Ordering::SeqCst);
        Arc::new(api)
    }

    pub fn with_page(page: Page<Order>) -> Arc<Self> {
        let api = Self::new();
        *api.default_page.lock().expect("lock") = Some(page);
        api
    }

    pub fn set_page(&self, number: u32, page: Page<Order>) {
        self.pages.lock().expect("lock").insert(number, page);
    }

    pub fn gate_page(&self, number: u32) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.page_gates
            .lock()
            .expect("lock")
            .insert(number, Arc::clone(&gate));
        gate
    }

    pub fn gate_writes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.write_gate.lock().expect("lock") = Some(Arc::clone(&gate));
        gate
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.lock().expect("lock").len()
    }

    pub fn last_list_call(&self) -> Option<SearchCriteria> {
        self.list_calls.lock().expect("lock").last().cloned()
    }

    pub fn write_count(&self) -> usize {
        self.created.lock().expect("lock").len() + self.updated.lock().expect("lock").len()
    }

    async fn wait_for_write_gate(&self) {
        let gate = self.write_gate.lock().expect("lock").clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn echoed(&self, id: i64, payload: &OrderPayload) -> Option<Order> {
        if !self.echo_writes.load(Ordering::SeqCst) {
            return None;
        }
        Some(Order {
            orden_id: OrderId(id),
            cliente: payload.cliente.clone(),
            fecha_creacion: None,
            total: payload.detalles.iter().map(LineItem::subtotal).sum(),
            detalles: payload.detalles.clone(),
        })
    }
}

#[async_trait]
impl OrderApi for FakeOrderApi {
    async fn login(&self, _username: &str, password: &str) -> Result<String, ClientError> {
        if password == "secret" {
            Ok("token".into())
        } else {
            Err(ClientError::InvalidCredentials)
        }
    }

    async fn logout(&self) {
        self.logged_out.store(true, Ordering::SeqCst);
    }

    async fn list_orders(&self, criteria: &SearchCriteria) -> Result<Page<Order>, ClientError> {
        self.list_calls.lock().expect("lock").push(criteria.clone());

        let gate = self
            .page_gates
            .lock()
            .expect("lock")
            .get(&criteria.page)
            .cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_list.load(Ordering::SeqCst) {
            return Err(server_error());
        }

        if let Some(page) = self.pages.lock().expect("lock").get(&criteria.page) {
            return Ok(page.clone());
        }
        Ok(self
            .default_page
            .lock()
            .expect("lock")
            .clone()
            .unwrap_or_else(Page::empty))
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, ClientError> {
        self.stored
            .lock()
            .expect("lock")
            .get(&id.0)
            .cloned()
            .ok_or_else(|| {
                ClientError::Api(ApiException::from(ApiError::from_status(404, "not found")))
            })
    }

    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<Option<Order>, ClientError> {
        self.created.lock().expect("lock").push(request.clone());
        self.wait_for_write_gate().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(self.echoed(100, &request.orden))
    }

    async fn update_order(
        &self,
        id: OrderId,
        payload: &OrderPayload,
    ) -> Result<Option<Order>, ClientError> {
        self.updated
            .lock()
            .expect("lock")
            .push((id, payload.clone()));
        self.wait_for_write_gate().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(self.echoed(id.0, payload))
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), ClientError> {
        self.deleted.lock().expect("lock").push(id);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(())
    }
}

/// Yields until `check` holds, so spawned tasks can reach their await points.
pub async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if check() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
