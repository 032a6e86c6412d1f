use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{format_calendar_date, LineItem, Order, Page, SearchCriteria, SortKey};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Query string for `GET /Ordenes/listado`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cliente: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desde: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hasta: Option<String>,
    pub ordenar_por: SortKey,
    pub page: u32,
    pub page_size: u32,
}

impl From<&SearchCriteria> for ListOrdersQuery {
    fn from(criteria: &SearchCriteria) -> Self {
        let filters = criteria.filters.clone().normalized();
        Self {
            cliente: filters.cliente,
            desde: filters.desde.map(format_calendar_date),
            hasta: filters.hasta.map(format_calendar_date),
            ordenar_por: filters.ordenar_por,
            page: criteria.page,
            page_size: criteria.page_size,
        }
    }
}

/// Body sent on update, and wrapped in [`CreateOrderRequest`] on create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPayload {
    pub cliente: String,
    pub detalles: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub orden: OrderPayload,
}

/// Reads a `{data:{items, pages}}` listing body.
///
/// The listing endpoint is not strict about its shape: a missing or
/// non-array `items` yields no orders and a missing, non-numeric or
/// non-positive `pages` yields a single page.
pub fn parse_listing(body: &Value) -> Page<Order> {
    let data = body.get("data");

    let items = data
        .and_then(|d| d.get("items"))
        .filter(|items| items.is_array())
        .and_then(|items| serde_json::from_value::<Vec<Order>>(items.clone()).ok())
        .unwrap_or_default();

    let page_count = data
        .and_then(|d| d.get("pages"))
        .and_then(Value::as_f64)
        .filter(|pages| pages.is_finite() && *pages >= 1.0)
        .map(|pages| pages.min(f64::from(u32::MAX)) as u32)
        .unwrap_or(1);

    Page { items, page_count }
}

/// Create and update answers are expected to echo the stored order, but a
/// bare status or an unrelated body is still a successful write.
pub fn parse_order_body(body: &[u8]) -> Option<Order> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice(body).ok()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::domain::{OrderFilters, OrderId};

    #[test]
    fn listing_query_uses_backend_names_and_plain_dates() {
        let criteria = SearchCriteria::new(
            OrderFilters {
                cliente: Some("Acme".into()),
                desde: NaiveDate::from_ymd_opt(2024, 1, 5),
                hasta: None,
                ordenar_por: SortKey::Cliente,
            },
            3,
        );
        let query = serde_json::to_value(ListOrdersQuery::from(&criteria)).expect("query");
        assert_eq!(
            query,
            json!({
                "cliente": "Acme",
                "desde": "2024-01-05",
                "ordenarPor": "Cliente",
                "page": 3,
                "pageSize": 10
            })
        );
    }

    #[test]
    fn create_request_wraps_order_in_envelope() {
        let request = CreateOrderRequest {
            orden: OrderPayload {
                cliente: "Acme".into(),
                detalles: vec![LineItem {
                    producto: "Widget".into(),
                    cantidad: 2,
                    precio_unitario: Decimal::new(95, 1),
                }],
            },
        };
        assert_eq!(
            serde_json::to_value(&request).expect("json"),
            json!({"orden": {"cliente": "Acme", "detalles": [
                {"producto": "Widget", "cantidad": 2, "precioUnitario": 9.5}
            ]}})
        );
    }

    #[test]
    fn listing_reads_items_and_pages() {
        let page = parse_listing(&json!({"data": {
            "items": [{"ordenId": 7, "cliente": "Acme", "total": 3, "detalles": []}],
            "pages": 4
        }}));
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].orden_id, OrderId(7));
        assert_eq!(page.page_count, 4);
    }

    #[test]
    fn malformed_listing_defaults_to_empty_single_page() {
        for body in [
            json!({}),
            json!({"data": null}),
            json!({"data": {"items": "nope", "pages": "many"}}),
            json!({"data": {"items": [], "pages": 0}}),
            json!({"data": {"items": [], "pages": -3}}),
        ] {
            let page = parse_listing(&body);
            assert!(page.items.is_empty(), "items for {body}");
            assert_eq!(page.page_count, 1, "pages for {body}");
        }
    }

    #[test]
    fn order_body_is_optional() {
        assert!(parse_order_body(b"").is_none());
        assert!(parse_order_body(b"{\"ok\":true}").is_none());
        assert!(parse_order_body(b"{\"ordenId\":1,\"cliente\":\"Acme\"}").is_some());
    }
}
