use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use shared::{
    domain::{Order, OrderId, Page, SearchCriteria},
    error::{ApiError, ApiException},
    protocol::{
        parse_listing, parse_order_body, CreateOrderRequest, ListOrdersQuery, LoginRequest,
        LoginResponse, OrderPayload,
    },
};
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::error::ClientError;

/// Calls the orders backend on behalf of the controllers.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// Authenticates and keeps the returned token for later calls.
    async fn login(&self, username: &str, password: &str) -> Result<String, ClientError>;
    async fn logout(&self);
    async fn list_orders(&self, criteria: &SearchCriteria) -> Result<Page<Order>, ClientError>;
    async fn get_order(&self, id: OrderId) -> Result<Order, ClientError>;
    /// Returns the stored order when the backend echoes one.
    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<Option<Order>, ClientError>;
    async fn update_order(
        &self,
        id: OrderId,
        payload: &OrderPayload,
    ) -> Result<Option<Order>, ClientError>;
    /// Voids ("anula") the order. The backend keeps the record.
    async fn delete_order(&self, id: OrderId) -> Result<(), ClientError>;
}

pub struct HttpOrderApi {
    http: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpOrderApi {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url.trim())?;
        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read().await.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiException::from(ApiError::from_status(status.as_u16(), body)).into())
}

#[async_trait]
impl OrderApi for HttpOrderApi {
    async fn login(&self, username: &str, password: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url("/Login/login"))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(ClientError::InvalidCredentials);
        }

        let body: LoginResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Decode(format!("login response: {e}")))?;

        self.set_token(body.token.clone()).await;
        info!(%username, "logged in to orders api");
        Ok(body.token)
    }

    async fn logout(&self) {
        *self.token.write().await = None;
    }

    async fn list_orders(&self, criteria: &SearchCriteria) -> Result<Page<Order>, ClientError> {
        let query = ListOrdersQuery::from(criteria);
        let request = self.http.get(self.url("/Ordenes/listado")).query(&query);
        let response = self.authorized(request).await.send().await?;
        let bytes = ensure_success(response).await?.bytes().await?;

        let body = serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null);
        let page = parse_listing(&body);
        debug!(
            page = criteria.page,
            pages = page.page_count,
            items = page.items.len(),
            "fetched order listing"
        );
        Ok(page)
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, ClientError> {
        let request = self.http.get(self.url(&format!("/Ordenes/{id}")));
        let response = self.authorized(request).await.send().await?;
        ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Decode(format!("order {id}: {e}")))
    }

    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<Option<Order>, ClientError> {
        let builder = self.http.post(self.url("/Ordenes")).json(request);
        let response = self.authorized(builder).await.send().await?;
        let bytes = ensure_success(response).await?.bytes().await?;
        Ok(parse_order_body(&bytes))
    }

    async fn update_order(
        &self,
        id: OrderId,
        payload: &OrderPayload,
    ) -> Result<Option<Order>, ClientError> {
        let builder = self
            .http
            .put(self.url(&format!("/Ordenes/{id}")))
            .json(payload);
        let response = self.authorized(builder).await.send().await?;
        let bytes = ensure_success(response).await?.bytes().await?;
        Ok(parse_order_body(&bytes))
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), ClientError> {
        let request = self.http.delete(self.url(&format!("/Ordenes/{id}")));
        let response = self.authorized(request).await.send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
