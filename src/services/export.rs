//! Spreadsheet-style export of a single estimate.
//!
//! An estimate exports as up to two sheets (the estimate summary, then the
//! AI pricing research when present), rendered as RFC 4180 CSV.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::estimates::EstimateResponse;

/// Which sheets to include.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportSection {
    Estimate,
    AiPricing,
    #[default]
    All,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub section: ExportSection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Money(f64),
    Empty,
}

impl Cell {
    fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    fn render(&self) -> String {
        match self {
            Self::Text(s) => neutralize_formula(s),
            Self::Number(n) => format_number(*n),
            Self::Money(n) => format_currency(*n),
            Self::Empty => String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: &'static str,
    pub rows: Vec<Vec<Cell>>,
}

/// Build the sheets for `section`. Empty when only AI pricing is requested
/// and the estimate has none.
pub fn build_sheets(estimate: &EstimateResponse, section: ExportSection) -> Vec<Sheet> {
    let mut sheets = Vec::new();

    if section != ExportSection::AiPricing {
        sheets.push(estimate_sheet(estimate));
    }
    if section != ExportSection::Estimate {
        if let Some(sheet) = ai_pricing_sheet(estimate) {
            sheets.push(sheet);
        }
    }

    sheets
}

fn estimate_sheet(estimate: &EstimateResponse) -> Sheet {
    let pricing = &estimate.pricing;
    let or_empty = |v: &Option<String>| Cell::text(v.clone().unwrap_or_default());

    let mut rows = vec![
        vec![Cell::text("ELECTRICAL ESTIMATE")],
        vec![],
        vec![Cell::text("Client Information")],
        vec![Cell::text("Name"), Cell::text(&estimate.client_name)],
        vec![Cell::text("Phone"), or_empty(&estimate.client_phone)],
        vec![Cell::text("Email"), or_empty(&estimate.client_email)],
        vec![],
        vec![Cell::text("Project Information")],
        vec![Cell::text("Address"), Cell::text(&estimate.project_address)],
        vec![Cell::text("City"), Cell::text(&estimate.city)],
        vec![Cell::text("State"), or_empty(&estimate.state)],
        vec![Cell::text("Work Type"), Cell::text(estimate.work_type.label())],
        vec![Cell::text("Date"), Cell::text(format_date(estimate.created_at.date_naive()))],
        vec![Cell::text("Status"), Cell::text(estimate.status.as_str().to_uppercase())],
        vec![],
        vec![Cell::text("Scope of Work")],
        vec![Cell::text(&estimate.scope_of_work)],
        vec![],
        vec![Cell::text("Pricing Breakdown")],
        ["Category", "Description", "Quantity", "Rate", "Amount"]
            .into_iter()
            .map(Cell::text)
            .collect(),
        vec![
            Cell::text("Labor"),
            Cell::text(format!("{} hours", format_number(pricing.labor.hours))),
            Cell::Number(pricing.labor.hours),
            Cell::Money(pricing.labor.hourly_rate),
            Cell::Money(pricing.labor.total),
        ],
    ];

    for item in &pricing.materials.items {
        let description = if item.description.trim().is_empty() {
            "Material"
        } else {
            item.description.as_str()
        };
        rows.push(vec![
            Cell::text("Material"),
            Cell::text(description),
            Cell::Number(item.quantity),
            Cell::Money(item.unit_cost),
            Cell::Money(item.total),
        ]);
    }

    let summary = |label: String, amount: f64| {
        vec![Cell::Empty, Cell::Empty, Cell::Empty, Cell::Text(label), Cell::Money(amount)]
    };
    rows.push(vec![]);
    rows.push(summary("Subtotal".to_string(), pricing.subtotal));
    rows.push(summary(
        format!("Markup ({}%)", format_number(pricing.markup_percentage)),
        pricing.markup_amount,
    ));
    rows.push(summary("TOTAL".to_string(), pricing.total));

    Sheet {
        name: "Estimate",
        rows,
    }
}

fn ai_pricing_sheet(estimate: &EstimateResponse) -> Option<Sheet> {
    let ai = estimate.ai_pricing.as_ref()?;

    let mut rows = vec![
        vec![Cell::text("AI PRICING RESEARCH")],
        vec![],
        vec![Cell::text("Search Query"), Cell::text(&ai.search_query)],
        vec![Cell::text("Last Updated"), Cell::text(format_date(ai.last_updated.date_naive()))],
        vec![Cell::text("Confidence"), Cell::text(ai.confidence.as_str().to_uppercase())],
        vec![],
        vec![Cell::text("Average Price"), Cell::Money(ai.average_price)],
        vec![Cell::text("Price Range Min"), Cell::Money(ai.price_range.min)],
        vec![Cell::text("Price Range Max"), Cell::Money(ai.price_range.max)],
        vec![],
        vec![Cell::text("Sources")],
        ["Source", "Price", "Description", "URL"]
            .into_iter()
            .map(Cell::text)
            .collect(),
    ];

    rows.extend(ai.sources.iter().map(|s| {
        vec![
            Cell::text(&s.source),
            Cell::Money(s.price),
            Cell::text(&s.description),
            Cell::text(s.url.clone().unwrap_or_default()),
        ]
    }));

    Some(Sheet {
        name: "AI Pricing",
        rows,
    })
}

/// Render sheets as CSV, one blank line between sheets.
pub fn render_csv(sheets: &[Sheet]) -> String {
    let mut out = String::new();

    for (i, sheet) in sheets.iter().enumerate() {
        if i > 0 {
            out.push_str("\r\n");
        }
        for row in &sheet.rows {
            let line: Vec<String> = row.iter().map(|c| escape_field(&c.render())).collect();
            out.push_str(&line.join(","));
            out.push_str("\r\n");
        }
    }

    out
}

/// Text starting with a formula trigger is prefixed with `'` so spreadsheets
/// show it literally.
fn neutralize_formula(text: &str) -> String {
    if text.starts_with(['=', '+', '-', '@', '\t', '\r']) {
        format!("'{}", text)
    } else {
        text.to_string()
    }
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// `estimate-{client-slug}-{yyyy-mm-dd}.csv`
pub fn export_filename(client_name: &str, date: NaiveDate) -> String {
    let mut slug = String::new();
    for c in client_name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "client" } else { slug };

    format!("estimate-{}-{}.csv", slug, date.format("%Y-%m-%d"))
}

/// US dollar formatting with thousands separators, e.g. `$1,234.56`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let dollars = (cents / 100).to_string();

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, c) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        let s = format!("{:.4}", n);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}
