use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of orders the listing asks for per page.
pub const PAGE_SIZE: u32 = 10;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(OrderId);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub producto: String,
    pub cantidad: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub precio_unitario: Decimal,
}

impl LineItem {
    pub fn subtotal(&self) -> Decimal {
        Decimal::from(self.cantidad) * self.precio_unitario
    }
}

/// An order as the backend reports it. `total` is authoritative and is never
/// recomputed on this side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub orden_id: OrderId,
    pub cliente: String,
    #[serde(
        default,
        deserialize_with = "deserialize_calendar_date",
        serialize_with = "serialize_calendar_date"
    )]
    pub fecha_creacion: Option<NaiveDate>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default)]
    pub detalles: Vec<LineItem>,
}

impl Order {
    /// Sum of the line subtotals. Diagnostic only; `total` stays whatever the
    /// server sent.
    pub fn line_total_sum(&self) -> Decimal {
        self.detalles.iter().map(LineItem::subtotal).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    FechaCreacion,
    Cliente,
    OrdenId,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FechaCreacion => "FechaCreacion",
            Self::Cliente => "Cliente",
            Self::OrdenId => "OrdenId",
        }
    }
}

/// Filters and sort order chosen by the user. The page number is tracked
/// separately so that changing filters can reset it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilters {
    pub cliente: Option<String>,
    pub desde: Option<NaiveDate>,
    pub hasta: Option<NaiveDate>,
    pub ordenar_por: SortKey,
}

impl OrderFilters {
    /// Blank client filters are the same as no filter at all.
    pub fn normalized(mut self) -> Self {
        self.cliente = self
            .cliente
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub filters: OrderFilters,
    pub page: u32,
    pub page_size: u32,
}

impl SearchCriteria {
    pub fn new(filters: OrderFilters, page: u32) -> Self {
        Self {
            filters: filters.normalized(),
            page: page.max(1),
            page_size: PAGE_SIZE,
        }
    }
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self::new(OrderFilters::default(), 1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_count: u32,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            page_count: 1,
        }
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats a date filter the way the listing endpoint expects it.
pub fn format_calendar_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Reads the calendar date from either `YYYY-MM-DD` or a date-time such as
/// `2024-01-05T23:30:00-05:00`. The date is taken as written; no time-zone
/// conversion is applied.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10)?;
    let rest = &raw[10..];
    if !rest.is_empty() && !rest.starts_with(['T', 't', ' ']) {
        return None;
    }
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

fn deserialize_calendar_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_calendar_date))
}

fn serialize_calendar_date<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match date {
        Some(date) => serializer.serialize_some(&format_calendar_date(*date)),
        None => serializer.serialize_none(),
    }
}
