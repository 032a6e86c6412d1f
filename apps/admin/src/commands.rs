use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use client_core::{
    AnularOutcome, FormError, LineItemDraft, OrderForm, OrdersSession, SubmitOutcome,
};
use rust_decimal::Decimal;
use shared::domain::{
    format_calendar_date, parse_calendar_date, Order, OrderFilters, OrderId, Page,
    SearchCriteria, SortKey,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Fecha,
    Cliente,
    Id,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Fecha => SortKey::FechaCreacion,
            SortArg::Cliente => SortKey::Cliente,
            SortArg::Id => SortKey::OrdenId,
        }
    }
}

/// Parses `producto:cantidad:precio`. The product name may itself contain
/// colons; only the last two fields are split off.
pub fn parse_item(raw: &str) -> Result<LineItemDraft> {
    let mut parts = raw.rsplitn(3, ':');
    let (Some(precio), Some(cantidad), Some(producto)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("item inválido {raw:?}: se espera producto:cantidad:precio");
    };
    let cantidad: i64 = cantidad
        .trim()
        .parse()
        .with_context(|| format!("cantidad inválida en {raw:?}"))?;
    let precio_unitario: Decimal = precio
        .trim()
        .parse()
        .with_context(|| format!("precio inválido en {raw:?}"))?;
    Ok(LineItemDraft {
        producto: producto.to_string(),
        cantidad,
        precio_unitario,
    })
}

pub fn parse_date(raw: &str) -> Result<chrono::NaiveDate> {
    parse_calendar_date(raw).ok_or_else(|| anyhow!("fecha inválida {raw:?}: se espera AAAA-MM-DD"))
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "si" | "sí" | "y" | "yes"
    )
}

pub fn render_orders(page: &Page<Order>, current: u32) -> String {
    let mut out = format!("{:>8}  {:<30}  {:<10}  {:>12}\n", "ID", "CLIENTE", "FECHA", "TOTAL");
    for order in &page.items {
        out.push_str(&format!(
            "{:>8}  {:<30}  {:<10}  {:>12}\n",
            order.orden_id,
            order.cliente,
            order
                .fecha_creacion
                .map(format_calendar_date)
                .unwrap_or_default(),
            order.total,
        ));
    }
    if page.items.is_empty() {
        out.push_str("(sin órdenes)\n");
    }
    out.push_str(&format!("página {current} de {}\n", page.page_count));
    out
}

pub fn render_order(order: &Order) -> String {
    let mut out = format!("Orden {}\nCliente: {}\n", order.orden_id, order.cliente);
    if let Some(fecha) = order.fecha_creacion {
        out.push_str(&format!("Fecha: {}\n", format_calendar_date(fecha)));
    }
    for item in &order.detalles {
        out.push_str(&format!(
            "  {} x{} @ {} = {}\n",
            item.producto,
            item.cantidad,
            item.precio_unitario,
            item.subtotal()
        ));
    }
    out.push_str(&format!("Total: {}\n", order.total));
    out
}

pub async fn list(
    session: &OrdersSession,
    cliente: Option<String>,
    desde: Option<String>,
    hasta: Option<String>,
    sort: SortArg,
    page: u32,
) -> Result<()> {
    let filters = OrderFilters {
        cliente,
        desde: desde.as_deref().map(parse_date).transpose()?,
        hasta: hasta.as_deref().map(parse_date).transpose()?,
        ordenar_por: sort.into(),
    };
    let result = session
        .listing()
        .search(SearchCriteria::new(filters, page))
        .await;
    let current = session.state().snapshot().await.page;
    print!("{}", render_orders(&result, current));
    Ok(())
}

pub async fn show(session: &OrdersSession, id: i64) -> Result<()> {
    let order = session.order(OrderId(id)).await?;
    print!("{}", render_order(&order));
    Ok(())
}

pub async fn create(session: &OrdersSession, cliente: String, items: Vec<String>) -> Result<()> {
    let items = items
        .iter()
        .map(String::as_str)
        .map(parse_item)
        .collect::<Result<Vec<_>>>()?;
    let form = session.form();
    form.reset_for_create().await;
    form.set_cliente(cliente).await;
    replace_lines(form, items).await;
    submit(session).await
}

pub async fn update(
    session: &OrdersSession,
    id: i64,
    cliente: Option<String>,
    items: Vec<String>,
) -> Result<()> {
    let items = items
        .iter()
        .map(String::as_str)
        .map(parse_item)
        .collect::<Result<Vec<_>>>()?;
    let form = session.form();
    form.load_for_edit_by_id(OrderId(id)).await?;
    if let Some(cliente) = cliente {
        form.set_cliente(cliente).await;
    }
    if !items.is_empty() {
        replace_lines(form, items).await;
    }
    submit(session).await
}

pub async fn anular(session: &OrdersSession, id: i64, assume_yes: bool) -> Result<()> {
    let outcome = session
        .listing()
        .anular(OrderId(id), move |id| assume_yes || confirm_on_stdin(id))
        .await?;
    if outcome == AnularOutcome::Cancelled {
        println!("operación cancelada");
    }
    Ok(())
}

async fn replace_lines(form: &OrderForm, items: Vec<LineItemDraft>) {
    while form.remove_line_item(0).await {}
    for item in items {
        let index = form.add_line_item().await;
        form.update_line_item(index, item).await;
    }
}

async fn submit(session: &OrdersSession) -> Result<()> {
    match session.submit_form().await {
        Ok(SubmitOutcome::Created(Some(order))) | Ok(SubmitOutcome::Updated(Some(order))) => {
            print!("{}", render_order(&order));
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(FormError::Invalid(errors)) => {
            for error in &errors {
                eprintln!("{}: {}", error.field, error.message);
            }
            bail!("la orden tiene {} campo(s) inválido(s)", errors.len())
        }
        Err(other) => Err(other.into()),
    }
}

fn confirm_on_stdin(id: OrderId) -> bool {
    print!("¿Anular la orden {id}? [s/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => is_affirmative(&answer),
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
