//! Quotation document rendering.
//!
//! Renders the economic proposal from a completed record using HTML
//! templates, converting to PDF via wkhtmltopdf when the binary is
//! available and falling back to browser-printable HTML when it is not.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use chrono::{Datelike, Utc};
use cotiza_core::catalog::Catalog;
use cotiza_core::config::DocumentsConfig;
use cotiza_core::domain::record::QuotationRecord;
use cotiza_core::pricing::{format_cop, survey_record_areas};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::process::Stdio;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

/// Register custom Tera filters used by the quotation template.
///
/// - `cop`: Colombian peso formatting, e.g. `costos.total | cop`
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("cop", tera_cop_filter);
}

/// Formats an amount as Colombian pesos. Accepts the string form that
/// `Decimal` serializes to as well as plain JSON numbers.
fn tera_cop_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let amount = match value {
        tera::Value::String(text) => text.parse::<Decimal>().map_err(|_| {
            tera::Error::msg(format!("cop filter could not parse '{text}' as an amount"))
        })?,
        tera::Value::Number(number) => {
            let float = number
                .as_f64()
                .ok_or_else(|| tera::Error::msg("cop filter expects a finite number"))?;
            Decimal::try_from(float)
                .map_err(|e| tera::Error::msg(format!("cop filter conversion failed: {e}")))?
        }
        tera::Value::Null => Decimal::ZERO,
        other => {
            return Err(tera::Error::msg(format!(
                "cop filter expects an amount, got {other}"
            )))
        }
    };
    Ok(tera::Value::String(format_cop(amount)))
}

/// Document generation error types
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("quotation record has no computed costs")]
    Incomplete,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of a proposal stage table.
#[derive(Clone, Debug, Serialize)]
struct StageRow {
    concepto: &'static str,
    valor: Decimal,
}

/// Renders quotation documents from completed records.
#[derive(Clone, Debug)]
pub struct DocumentGenerator {
    tera: Tera,
    wkhtmltopdf_path: Option<String>,
    company_name: String,
}

impl DocumentGenerator {
    /// Build a generator with the embedded quotation template and the
    /// configured (or probed) wkhtmltopdf binary.
    pub fn new(config: &DocumentsConfig) -> Self {
        let mut tera = Tera::default();
        register_template_filters(&mut tera);

        tera.add_raw_template(
            "cotizacion.html.tera",
            include_str!("../../../templates/cotizacion/cotizacion.html.tera"),
        )
        .expect("Failed to load cotizacion.html.tera template");

        let wkhtmltopdf_path = resolve_wkhtmltopdf(config.wkhtmltopdf_path.as_deref());
        match &wkhtmltopdf_path {
            Some(path) => info!(path = %path, "wkhtmltopdf found, quotations render as PDF"),
            None => warn!("wkhtmltopdf not found in PATH, quotations render as HTML"),
        }

        Self {
            tera,
            wkhtmltopdf_path,
            company_name: config.company_name.clone(),
        }
    }

    pub fn pdf_available(&self) -> bool {
        self.wkhtmltopdf_path.is_some()
    }

    pub fn has_templates(&self) -> bool {
        self.tera.get_template_names().next().is_some()
    }

    /// Render the economic proposal for a completed record.
    ///
    /// Returns PDF bytes when wkhtmltopdf is available and conversion
    /// succeeds, otherwise the rendered HTML for browser printing.
    pub async fn generate(&self, record: &QuotationRecord) -> Result<DocumentResult, DocumentError> {
        let context = self.build_context(record)?;
        let html = self
            .tera
            .render("cotizacion.html.tera", &context)
            .map_err(|e| DocumentError::Template(e.to_string()))?;

        if let Some(ref wkhtmltopdf) = self.wkhtmltopdf_path {
            match convert_html_to_pdf(&html, wkhtmltopdf).await {
                Ok(pdf_bytes) => return Ok(DocumentResult::Pdf(pdf_bytes)),
                Err(e) => {
                    warn!(error = %e, "PDF conversion failed, falling back to HTML");
                }
            }
        }

        Ok(DocumentResult::Html(html))
    }

    fn build_context(&self, record: &QuotationRecord) -> Result<Context, DocumentError> {
        let costs = record.costs.as_ref().ok_or(DocumentError::Incomplete)?;
        let areas = survey_record_areas(record);
        let catalog = Catalog::global();

        let mut context = Context::new();
        context.insert("company_name", &self.company_name);
        context.insert("fecha", &format_date_es());
        context.insert(
            "cliente",
            &json!({
                "nombre": record.client_name.clone().unwrap_or_else(|| "Cliente".to_string()),
                "edad": record.client_age,
            }),
        );
        context.insert(
            "proyecto",
            &json!({
                "tipo": record.project_type,
                "area_m2": record.area_m2,
                "acabados": record.finish_tier.map(|tier| tier.label()),
                "duracion": record.duration_estimate,
                "presupuesto": record.budget_estimate,
                "tiene_lote": record.has_lot,
            }),
        );

        let habitaciones: Vec<_> = record
            .rooms
            .iter()
            .enumerate()
            .map(|(index, room)| {
                let titulo = if index == 0 {
                    "Habitación principal".to_string()
                } else {
                    format!("Habitación adicional {index}")
                };
                json!({
                    "titulo": titulo,
                    "cama": room.bed_size,
                    "bano": room.has_bathroom,
                    "area_m2": catalog.bed_area_m2(&room.bed_size),
                })
            })
            .collect();
        context.insert("habitaciones", &habitaciones);

        let amenidades: Vec<_> = record
            .amenities
            .iter()
            .map(|name| {
                json!({
                    "nombre": name,
                    "area_m2": catalog.amenity_area_m2(name),
                })
            })
            .collect();
        context.insert("amenidades", &amenidades);

        context.insert(
            "areas",
            &json!({
                "habitaciones_m2": areas.rooms_m2,
                "banos_m2": areas.bathrooms_m2,
                "amenidades_m2": areas.amenities_m2,
                "total_m2": areas.total(),
            }),
        );
        context.insert(
            "costos",
            &json!({
                "construccion": costs.construction_cost,
                "diseno": costs.design_cost,
                "total": costs.total_cost,
            }),
        );

        let etapa1 = stage_one_rows(costs.total_cost);
        let etapa2 = stage_two_rows(costs.total_cost);
        context.insert("subtotal1", &stage_subtotal(&etapa1));
        context.insert("subtotal2", &stage_subtotal(&etapa2));
        context.insert("etapa1", &etapa1);
        context.insert("etapa2", &etapa2);

        let total_pesos = round_peso(costs.total_cost).to_u64().unwrap_or(0);
        context.insert("total_en_letras", &amount_in_words(total_pesos));

        Ok(context)
    }
}

/// Result of document generation
pub enum DocumentResult {
    Pdf(Vec<u8>),
    Html(String),
}

impl DocumentResult {
    /// Convert to an Axum response
    pub fn into_response(self, filename: &str) -> Response {
        match self {
            DocumentResult::Pdf(bytes) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/pdf")
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                )
                .body(Body::from(bytes))
                .unwrap(),
            DocumentResult::Html(html) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
                .body(Body::from(html))
                .unwrap(),
        }
    }
}

fn resolve_wkhtmltopdf(configured: Option<&str>) -> Option<String> {
    if let Some(path) = configured {
        if std::path::Path::new(path).exists() {
            return Some(path.to_string());
        }
        warn!(path, "configured wkhtmltopdf path does not exist, probing PATH");
    }
    which::which("wkhtmltopdf")
        .ok()
        .map(|p| p.to_string_lossy().to_string())
}

/// Convert HTML to PDF using wkhtmltopdf
async fn convert_html_to_pdf(html: &str, wkhtmltopdf_path: &str) -> Result<Vec<u8>, DocumentError> {
    let temp_dir = std::env::temp_dir();
    let html_path = temp_dir.join(format!("cotizacion_{}.html", uuid::Uuid::new_v4()));
    let pdf_path = temp_dir.join(format!("cotizacion_{}.pdf", uuid::Uuid::new_v4()));

    tokio::fs::write(&html_path, html).await?;

    let output = Command::new(wkhtmltopdf_path)
        .arg("--page-size")
        .arg("A4")
        .arg("--margin-top")
        .arg("10mm")
        .arg("--margin-bottom")
        .arg("10mm")
        .arg("--margin-left")
        .arg("10mm")
        .arg("--margin-right")
        .arg("10mm")
        .arg("--encoding")
        .arg("utf-8")
        .arg("--enable-local-file-access")
        .arg(&html_path)
        .arg(&pdf_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(stderr = %stderr, "wkhtmltopdf failed");
        return Err(DocumentError::Conversion(stderr.to_string()));
    }

    let pdf_bytes = tokio::fs::read(&pdf_path).await?;

    let _ = tokio::fs::remove_file(&html_path).await;
    let _ = tokio::fs::remove_file(&pdf_path).await;

    info!(size = pdf_bytes.len(), "PDF generated successfully");

    Ok(pdf_bytes)
}

// Stage shares follow the firm's published proposal structure. Row
// values are rounded to whole pesos; the closing TOTAL row always
// prints the computed project total rather than the stage sum.
fn stage_one_rows(total: Decimal) -> Vec<StageRow> {
    [
        ("Diseño Arquitectónico", Decimal::new(25, 2)),
        ("Diseño y Cálculo Estructural", Decimal::new(27, 2)),
        ("Acompañamiento en Licencia y Permisos", Decimal::new(15, 3)),
    ]
    .into_iter()
    .map(|(concepto, share)| StageRow {
        concepto,
        valor: round_peso(total * share),
    })
    .collect()
}

fn stage_two_rows(total: Decimal) -> Vec<StageRow> {
    [
        ("Diseño y Cálculo Eléctrico", Decimal::new(22, 2)),
        ("Diseño Hidráulico y Sanitario", Decimal::new(19, 2)),
        ("Presupuesto del Proyecto", Decimal::new(35, 3)),
    ]
    .into_iter()
    .map(|(concepto, share)| StageRow {
        concepto,
        valor: round_peso(total * share),
    })
    .collect()
}

fn stage_subtotal(rows: &[StageRow]) -> Decimal {
    rows.iter().map(|row| row.valor).sum()
}

fn round_peso(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

const MONTHS_ES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

fn format_date_es() -> String {
    let today = Utc::now().date_naive();
    format!(
        "{} {} de {}",
        MONTHS_ES[today.month0() as usize],
        today.day(),
        today.year()
    )
}

const UNIT_WORDS: [&str; 10] = [
    "", "UN", "DOS", "TRES", "CUATRO", "CINCO", "SEIS", "SIETE", "OCHO", "NUEVE",
];
const TENS_WORDS: [&str; 10] = [
    "", "DIEZ", "VEINTE", "TREINTA", "CUARENTA", "CINCUENTA", "SESENTA", "SETENTA", "OCHENTA",
    "NOVENTA",
];
const HUNDREDS_WORDS: [&str; 10] = [
    "",
    "CIENTO",
    "DOSCIENTOS",
    "TRESCIENTOS",
    "CUATROCIENTOS",
    "QUINIENTOS",
    "SEISCIENTOS",
    "SETECIENTOS",
    "OCHOCIENTOS",
    "NOVECIENTOS",
];

/// Spell out a peso amount in uppercase Spanish for the proposal's
/// closing line. Amounts of a billion pesos or more collapse to the
/// ceiling phrase, matching the firm's proposal format.
fn amount_in_words(amount: u64) -> String {
    if amount == 0 {
        return "CERO".to_string();
    }
    if amount >= 1_000_000_000 {
        return "MIL MILLONES".to_string();
    }

    let mut remaining = amount;
    let mut words = String::new();

    if remaining >= 1_000_000 {
        let millions = remaining / 1_000_000;
        if millions == 1 {
            words.push_str("UN MILLÓN ");
        } else {
            words.push_str(&amount_in_words(millions));
            words.push_str(" MILLONES ");
        }
        remaining %= 1_000_000;
    }

    if remaining >= 1_000 {
        let thousands = remaining / 1_000;
        if thousands == 1 {
            words.push_str("MIL ");
        } else {
            words.push_str(&amount_in_words(thousands));
            words.push_str(" MIL ");
        }
        remaining %= 1_000;
    }

    if remaining >= 100 {
        words.push_str(HUNDREDS_WORDS[(remaining / 100) as usize]);
        words.push(' ');
        remaining %= 100;
    }

    if remaining > 0 {
        if remaining < 10 {
            words.push_str(UNIT_WORDS[remaining as usize]);
        } else {
            let tens = remaining / 10;
            let units = remaining % 10;
            if units == 0 {
                words.push_str(TENS_WORDS[tens as usize]);
            } else {
                words.push_str(TENS_WORDS[tens as usize]);
                words.push_str(" Y ");
                words.push_str(UNIT_WORDS[units as usize]);
            }
        }
    }

    words.trim().to_string()
}
