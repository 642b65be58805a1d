//! Printable order receipts
//!
//! The order travels as JSON in the `order` query parameter of `/print`.
//! The page renders a receipt with a Code 128 barcode of the order id and
//! opens the browser print dialog on load. Ids outside printable ASCII get a
//! receipt without a barcode.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono_tz::Tz;
use reqwest::Url;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::domain::{Money, Order};
use crate::{AdminError, Result};

pub const SHOP_NAME: &str = "SHOP";

// =============================================================================
// Payload
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PrintPayload {
    pub order: Order,
}

impl PrintPayload {
    pub fn new(order: Order) -> Self { Self { order } }

    pub fn from_json(raw: &str) -> Result<Self> {
        let order = serde_json::from_str(raw).map_err(|e| AdminError::InvalidResponse(format!("malformed order payload: {e}")))?;
        Ok(Self { order })
    }

    /// Decodes a raw (percent-encoded) query string such as `order=%7B...%7D`.
    pub fn from_query(query: &str) -> Result<Self> {
        let mut url = Url::parse("http://localhost/print").map_err(|e| AdminError::Config(e.to_string()))?;
        url.set_query(Some(query.trim_start_matches('?')));
        let raw = url
            .query_pairs()
            .find(|(key, _)| key == "order")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| AdminError::InvalidResponse("missing order parameter".to_string()))?;
        Self::from_json(&raw)
    }

    /// Link to the print page of `base` for this order.
    pub fn print_url(&self, base: &str) -> Result<String> {
        let base = Url::parse(base).map_err(|e| AdminError::Config(format!("invalid print base URL '{base}': {e}")))?;
        let mut url = base.join("print").map_err(|e| AdminError::Config(e.to_string()))?;
        url.query_pairs_mut().append_pair("order", &serde_json::to_string(&self.order)?);
        Ok(url.to_string())
    }
}

// =============================================================================
// Code 128
// =============================================================================

/// Bar/space widths in modules per symbol value, bar first. 103-105 are the
/// start codes and 106 is the stop pattern.
const CODE128: [&str; 107] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312",
    "132212", "221213", "221312", "231212", "112232", "122132", "122231", "113222",
    "123122", "123221", "223211", "221132", "221231", "213212", "223112", "312131",
    "311222", "321122", "321221", "312212", "322112", "322211", "212123", "212321",
    "232121", "111323", "131123", "131321", "112313", "132113", "132311", "211313",
    "231113", "231311", "112133", "112331", "132131", "113123", "113321", "133121",
    "313121", "211331", "231131", "213113", "213311", "213131", "311123", "311321",
    "331121", "312113", "312311", "332111", "314111", "221411", "431111", "111224",
    "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111",
    "111242", "121142", "121241", "114212", "124112", "124211", "411212", "421112",
    "421211", "212141", "214121", "412121", "111143", "111341", "131141", "114113",
    "114311", "411113", "411311", "113141", "114131", "311141", "411131", "211412",
    "211214", "211232", "2331112",
];

const START_B: usize = 104;
const STOP: usize = 106;
const MODULE: u32 = 2;
const QUIET_ZONE: u32 = 10 * MODULE;
const BAR_HEIGHT: u32 = 60;

/// Element widths of `data` in code set B (printable ASCII) with start,
/// checksum and stop symbols, bar first.
pub fn code128(data: &str) -> Result<Vec<u32>> {
    if let Some(bad) = data.chars().find(|c| !(' '..='~').contains(c)) {
        return Err(AdminError::InvalidResponse(format!("'{bad}' cannot be encoded in Code 128")));
    }
    let values: Vec<usize> = data.bytes().map(|b| usize::from(b - b' ')).collect();
    let checksum = values.iter().enumerate().fold(START_B, |sum, (i, v)| sum + (i + 1) * v) % 103;
    let symbols = std::iter::once(START_B).chain(values).chain([checksum, STOP]);
    Ok(symbols.flat_map(|s| CODE128[s].bytes().map(|b| u32::from(b - b'0') * MODULE)).collect())
}

/// Inline SVG of the Code 128 barcode.
pub fn barcode_svg(data: &str) -> Result<String> {
    let widths = code128(data)?;
    let total = widths.iter().sum::<u32>() + 2 * QUIET_ZONE;
    let mut x = QUIET_ZONE;
    let mut rects = String::new();
    // even positions are bars
    for (i, w) in widths.iter().enumerate() {
        if i % 2 == 0 {
            rects.push_str(&format!(r#"<rect x="{x}" y="0" width="{w}" height="{BAR_HEIGHT}"/>"#));
        }
        x += w;
    }
    Ok(format!(r#"<svg xmlns="http://www.w3.org/2000/svg" width="{total}" height="{BAR_HEIGHT}" viewBox="0 0 {total} {BAR_HEIGHT}" fill="black">{rects}</svg>"#))
}

// =============================================================================
// Receipt
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLine {
    pub name: String,
    pub variant: String,
    pub quantity: u32,
    pub unit_price: String,
    pub total: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub order_id: String,
    pub placed_at: Option<String>,
    pub customer: String,
    pub address: String,
    pub phone: String,
    pub lines: Vec<ReceiptLine>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub total: String,
    pub paid: bool,
    pub barcode_svg: Option<String>,
}

pub fn render_receipt(order: &Order, tz: Tz) -> Receipt {
    let discount = order.discount();
    let barcode_svg = match barcode_svg(&order.id) {
        Ok(svg) => Some(svg),
        Err(e) => {
            tracing::warn!(order_id = %order.id, error = %e, "Printing receipt without barcode");
            None
        }
    };
    Receipt {
        order_id: order.id.clone(),
        placed_at: order.created_at.map(|at| at.with_timezone(&tz).format("%d/%m/%Y %H:%M").to_string()),
        customer: order.customer_name.clone().unwrap_or_else(|| order.user_id.clone()),
        address: order.shipping_address.address.clone(),
        phone: order.shipping_address.phone.clone(),
        lines: order
            .items
            .iter()
            .map(|i| ReceiptLine {
                name: i.product_name.clone(),
                variant: format!("{}/{}", i.size, i.color),
                quantity: i.quantity,
                unit_price: i.price.format(),
                total: i.line_total().format(),
            })
            .collect(),
        subtotal: order.total_price.format(),
        discount: (discount > Money::zero()).then(|| discount.format()),
        total: order.final_price.format(),
        paid: order.is_paid(),
        barcode_svg,
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;").replace('\'', "&#39;")
}

impl Receipt {
    /// Plain-text rendering for terminals.
    pub fn to_text(&self) -> String {
        let mut out = format!("{SHOP_NAME}\nOrder {}\n", self.order_id);
        if let Some(at) = &self.placed_at {
            out.push_str(&format!("Placed {at}\n"));
        }
        out.push_str(&format!("{}\n{}\n{}\n\n", self.customer, self.address, self.phone));
        for l in &self.lines {
            out.push_str(&format!("{} ({}) x{} @ {} = {}\n", l.name, l.variant, l.quantity, l.unit_price, l.total));
        }
        out.push_str(&format!("\nSubtotal: {}\n", self.subtotal));
        if let Some(d) = &self.discount {
            out.push_str(&format!("Discount: -{d}\n"));
        }
        out.push_str(&format!("Total: {} ({})\n", self.total, if self.paid { "paid" } else { "cash on delivery" }));
        out
    }

    pub fn to_html(&self) -> String {
        let rows: String = self
            .lines
            .iter()
            .map(|l| {
                format!(
                    "<tr><td>{}<br><small>{}</small></td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    escape(&l.name), escape(&l.variant), l.quantity, l.unit_price, l.total
                )
            })
            .collect();
        let placed = self.placed_at.as_deref().map(|at| format!("<p>Placed {at}</p>")).unwrap_or_default();
        let discount = self.discount.as_deref().map(|d| format!("<p>Discount: -{d}</p>")).unwrap_or_default();
        format!(
            r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Order {id}</title>
<style>body{{font-family:monospace;width:80mm;margin:0 auto}}table{{width:100%;border-collapse:collapse}}td{{padding:2px 0}}</style>
</head><body>
<h2>{shop}</h2>
<div class="barcode">{barcode}</div>
<p>Order {id}</p>{placed}
<p>{customer}<br>{address}<br>{phone}</p>
<table><tr><th>Item</th><th>Qty</th><th>Price</th><th>Total</th></tr>{rows}</table>
<p>Subtotal: {subtotal}</p>{discount}
<p><strong>Total: {total}</strong> ({payment})</p>
<script>window.onload = function () {{ window.print(); }};</script>
</body></html>"#,
            shop = SHOP_NAME,
            id = escape(&self.order_id),
            barcode = self.barcode_svg.as_deref().unwrap_or_default(),
            customer = escape(&self.customer),
            address = escape(&self.address),
            phone = escape(&self.phone),
            subtotal = self.subtotal,
            total = self.total,
            payment = if self.paid { "paid" } else { "cash on delivery" },
        )
    }
}

// =============================================================================
// Server
// =============================================================================

#[derive(Clone)]
struct PrintState { tz: Tz }

pub fn router(tz: Tz) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "shop-admin-print"})) }))
        .route("/print", get(print_order))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(PrintState { tz })
}

async fn print_order(State(s): State<PrintState>, Query(params): Query<HashMap<String, String>>) -> Response {
    let receipt = params
        .get("order")
        .ok_or_else(|| AdminError::InvalidResponse("missing order parameter".to_string()))
        .and_then(|raw| PrintPayload::from_json(raw))
        .map(|payload| render_receipt(&payload.order, s.tz));
    match receipt {
        Ok(receipt) => Html(receipt.to_html()).into_response(),
        Err(e) => {
            tracing::warn!("Rejected print request: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

pub async fn serve(addr: SocketAddr, tz: Tz) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Print server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(tz)).await?;
    Ok(())
}
