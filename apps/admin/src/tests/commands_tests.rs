use super::*;

use chrono::NaiveDate;
use shared::domain::LineItem;

fn sample_order() -> Order {
    Order {
        orden_id: OrderId(7),
        cliente: "Acme".into(),
        fecha_creacion: NaiveDate::from_ymd_opt(2024, 1, 5),
        total: Decimal::new(190, 1),
        detalles: vec![LineItem {
            producto: "Widget".into(),
            cantidad: 2,
            precio_unitario: Decimal::new(95, 1),
        }],
    }
}

#[test]
fn item_argument_splits_from_the_right() {
    let item = parse_item("Cable: USB-C:3:4.25").expect("item");
    assert_eq!(item.producto, "Cable: USB-C");
    assert_eq!(item.cantidad, 3);
    assert_eq!(item.precio_unitario, Decimal::new(425, 2));
}

#[test]
fn item_argument_keeps_values_for_validation() {
    // Zero quantity and negative price parse fine; the form rejects them.
    let item = parse_item("Widget:0:-1").expect("item");
    assert_eq!(item.cantidad, 0);
    assert_eq!(item.precio_unitario, Decimal::new(-1, 0));
}

#[test]
fn malformed_item_arguments_are_rejected() {
    assert!(parse_item("Widget").is_err());
    assert!(parse_item("Widget:2").is_err());
    assert!(parse_item("Widget:dos:1.0").is_err());
    assert!(parse_item("Widget:2:gratis").is_err());
}

#[test]
fn dates_are_calendar_days() {
    assert_eq!(
        parse_date("2024-01-05").expect("date"),
        NaiveDate::from_ymd_opt(2024, 1, 5).expect("valid")
    );
    assert!(parse_date("05/01/2024").is_err());
}

#[test]
fn sort_arguments_map_to_backend_keys() {
    assert_eq!(SortKey::from(SortArg::Fecha), SortKey::FechaCreacion);
    assert_eq!(SortKey::from(SortArg::Cliente), SortKey::Cliente);
    assert_eq!(SortKey::from(SortArg::Id), SortKey::OrdenId);
}

#[test]
fn confirmation_answers() {
    assert!(is_affirmative("s\n"));
    assert!(is_affirmative(" Sí "));
    assert!(is_affirmative("yes"));
    assert!(!is_affirmative(""));
    assert!(!is_affirmative("n"));
}

#[test]
fn listing_table_shows_rows_and_page_footer() {
    let page = Page {
        items: vec![sample_order()],
        page_count: 4,
    };
    let out = render_orders(&page, 2);
    assert!(out.contains("Acme"));
    assert!(out.contains("2024-01-05"));
    assert!(out.contains("19.0"));
    assert!(out.ends_with("página 2 de 4\n"));

    let empty = render_orders(&Page::empty(), 1);
    assert!(empty.contains("(sin órdenes)"));
    assert!(empty.ends_with("página 1 de 1\n"));
}

#[test]
fn order_detail_lists_each_line() {
    let out = render_order(&sample_order());
    assert!(out.starts_with("Orden 7\nCliente: Acme\n"));
    assert!(out.contains("Widget x2 @ 9.5 = 19.0"));
    assert!(out.ends_with("Total: 19.0\n"));
}
