//! Invoice rendering for a single order.
//!
//! The HTML template is converted with `wkhtmltopdf` when the binary is on `PATH` and
//! enabled in configuration. Otherwise, or when the conversion fails, the plain-text
//! template is laid out into a minimal single-font PDF so callers always get a PDF.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use rust_decimal::Decimal;
use serde::Serialize;
use storefront_core::config::InvoiceConfig;
use storefront_core::Order;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

const HTML_TEMPLATE: &str = "invoice.html";
const TEXT_TEMPLATE: &str = "invoice.txt";
const INVOICE_TITLE: &str = "Invoice / Order";

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvoiceLine {
    pub index: usize,
    pub name: String,
    pub size: String,
    pub color: String,
    pub quantity: u32,
    pub unit_price: String,
}

/// Template context for one invoice; every value is preformatted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvoiceView {
    pub title: String,
    pub company_name: String,
    pub order_id: String,
    pub created_at: String,
    pub customer_name: String,
    pub customer_email: String,
    pub phone: String,
    pub shipping_address: String,
    pub status: String,
    pub lines: Vec<InvoiceLine>,
    pub total: String,
}

#[derive(Clone, Debug)]
pub struct InvoiceRenderer {
    tera: Tera,
    wkhtmltopdf_path: Option<PathBuf>,
    company_name: String,
    currency: String,
}

impl InvoiceRenderer {
    pub fn new(config: &InvoiceConfig) -> Result<Self, PdfError> {
        let tera = match &config.template_dir {
            Some(dir) => load_templates(dir)?,
            None => embedded_templates()?,
        };

        let wkhtmltopdf_path =
            if config.wkhtmltopdf_enabled { which::which("wkhtmltopdf").ok() } else { None };

        match &wkhtmltopdf_path {
            Some(path) => info!(
                event_name = "system.invoice.converter_found",
                correlation_id = "bootstrap",
                path = %path.display(),
                "wkhtmltopdf found"
            ),
            None => warn!(
                event_name = "system.invoice.converter_missing",
                correlation_id = "bootstrap",
                enabled = config.wkhtmltopdf_enabled,
                "wkhtmltopdf unavailable; invoices use the built-in PDF layout"
            ),
        }

        Ok(Self {
            tera,
            wkhtmltopdf_path,
            company_name: config.company_name.clone(),
            currency: config.currency.clone(),
        })
    }

    pub fn view(&self, order: &Order) -> InvoiceView {
        InvoiceView {
            title: INVOICE_TITLE.to_string(),
            company_name: self.company_name.clone(),
            order_id: order.id.0.clone(),
            created_at: order.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            phone: order.phone.clone(),
            shipping_address: order.shipping_address.clone(),
            status: order.status.as_str().to_string(),
            lines: order
                .items
                .iter()
                .enumerate()
                .map(|(position, item)| InvoiceLine {
                    index: position + 1,
                    name: item.name.clone(),
                    size: item.size.clone(),
                    color: item.color.clone(),
                    quantity: item.quantity,
                    unit_price: format_amount(item.price, &self.currency),
                })
                .collect(),
            total: format_amount(order.total_amount, &self.currency),
        }
    }

    pub fn render_text(&self, view: &InvoiceView) -> Result<String, PdfError> {
        self.render_template(TEXT_TEMPLATE, view)
    }

    pub fn render_html(&self, view: &InvoiceView) -> Result<String, PdfError> {
        self.render_template(HTML_TEMPLATE, view)
    }

    /// Renders the invoice as PDF bytes.
    pub async fn render(&self, order: &Order) -> Result<Vec<u8>, PdfError> {
        let view = self.view(order);

        if let Some(wkhtmltopdf) = &self.wkhtmltopdf_path {
            let html = self.render_html(&view)?;
            match convert_html_to_pdf(&html, wkhtmltopdf).await {
                Ok(bytes) => return Ok(bytes),
                Err(conversion_error) => warn!(
                    event_name = "invoice.conversion_failed",
                    order_id = %order.id,
                    error = %conversion_error,
                    "wkhtmltopdf conversion failed, using built-in layout"
                ),
            }
        }

        let text = self.render_text(&view)?;
        Ok(layout_text_pdf(&text))
    }

    fn render_template(&self, name: &str, view: &InvoiceView) -> Result<String, PdfError> {
        let context =
            Context::from_serialize(view).map_err(|e| PdfError::Template(e.to_string()))?;
        self.tera.render(name, &context).map_err(|e| PdfError::Template(e.to_string()))
    }
}

fn load_templates(dir: &Path) -> Result<Tera, PdfError> {
    let glob = format!("{}/**/*", dir.display());
    let tera = Tera::new(&glob).map_err(|e| PdfError::Template(e.to_string()))?;
    for required in [HTML_TEMPLATE, TEXT_TEMPLATE] {
        if !tera.get_template_names().any(|name| name == required) {
            return Err(PdfError::Template(format!(
                "template `{required}` not found in `{}`",
                dir.display()
            )));
        }
    }
    Ok(tera)
}

fn embedded_templates() -> Result<Tera, PdfError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (HTML_TEMPLATE, include_str!("../../../templates/orders/invoice.html")),
        (TEXT_TEMPLATE, include_str!("../../../templates/orders/invoice.txt")),
    ])
    .map_err(|e| PdfError::Template(e.to_string()))?;
    Ok(tera)
}

/// `12.5` with currency `TND` becomes `12.500 TND`.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    format!("{:.3} {currency}", amount.round_dp(3))
}

async fn convert_html_to_pdf(html: &str, wkhtmltopdf: &Path) -> Result<Vec<u8>, PdfError> {
    let temp_dir = std::env::temp_dir();
    let stem = format!("invoice_{}", uuid::Uuid::new_v4());
    let html_path = temp_dir.join(format!("{stem}.html"));
    let pdf_path = temp_dir.join(format!("{stem}.pdf"));

    tokio::fs::write(&html_path, html).await?;

    let result = run_wkhtmltopdf(wkhtmltopdf, &html_path, &pdf_path).await;

    let _ = tokio::fs::remove_file(&html_path).await;
    let _ = tokio::fs::remove_file(&pdf_path).await;

    result
}

async fn run_wkhtmltopdf(
    wkhtmltopdf: &Path,
    html_path: &Path,
    pdf_path: &Path,
) -> Result<Vec<u8>, PdfError> {
    let output = Command::new(wkhtmltopdf)
        .args(["--quiet", "--page-size", "A4", "--encoding", "utf-8"])
        .args(["--margin-top", "10mm", "--margin-bottom", "10mm"])
        .args(["--margin-left", "10mm", "--margin-right", "10mm"])
        .arg(html_path)
        .arg(pdf_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(stderr = %stderr, "wkhtmltopdf failed");
        return Err(PdfError::Conversion(stderr.to_string()));
    }

    Ok(tokio::fs::read(pdf_path).await?)
}

// A4 portrait, in points.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const BODY_SIZE: f32 = 11.0;
const HEADING_SIZE: f32 = 14.0;
const TITLE_SIZE: f32 = 20.0;

struct TextLine {
    size: f32,
    text: String,
}

/// Lays out text as Helvetica lines. `# ` marks the title and `## ` a heading.
pub fn layout_text_pdf(text: &str) -> Vec<u8> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let (size, content) = if let Some(rest) = raw.strip_prefix("# ") {
            (TITLE_SIZE, rest)
        } else if let Some(rest) = raw.strip_prefix("## ") {
            (HEADING_SIZE, rest)
        } else {
            (BODY_SIZE, raw)
        };
        for wrapped in wrap(content.trim_end(), max_chars(size)) {
            lines.push(TextLine { size, text: wrapped });
        }
    }

    let mut pages: Vec<Vec<u8>> = Vec::new();
    let mut stream = Vec::new();
    let mut cursor = PAGE_HEIGHT - MARGIN;
    for line in &lines {
        let advance = line.size * 1.5;
        if cursor - advance < MARGIN {
            pages.push(std::mem::take(&mut stream));
            cursor = PAGE_HEIGHT - MARGIN;
        }
        cursor -= advance;
        if line.text.is_empty() {
            continue;
        }
        stream.extend_from_slice(
            format!("BT /F1 {} Tf {} {} Td (", line.size, MARGIN, cursor).as_bytes(),
        );
        stream.extend(encode_pdf_text(&line.text));
        stream.extend_from_slice(b") Tj ET\n");
    }
    pages.push(stream);

    write_pdf(&pages)
}

fn max_chars(size: f32) -> usize {
    // Helvetica averages about half an em per glyph.
    ((PAGE_WIDTH - 2.0 * MARGIN) / (size * 0.5)) as usize
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    if text.chars().count() <= width {
        return vec![text.to_string()];
    }

    let mut wrapped = Vec::new();
    let mut current = String::new();
    for word in text.split(' ') {
        let needed = current.chars().count() + word.chars().count() + 1;
        if !current.is_empty() && needed > width {
            wrapped.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    wrapped.push(current);
    wrapped
}

/// WinAnsi bytes with string delimiters escaped; characters outside Latin-1 become `?`.
fn encode_pdf_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(ch as u8);
            }
            ' '..='~' => out.push(ch as u8),
            '\u{a0}'..='\u{ff}' => out.push(ch as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

fn write_pdf(pages: &[Vec<u8>]) -> Vec<u8> {
    // Objects: 1 catalog, 2 page tree, 3 font, then a page and its content per page.
    let object_count = 3 + pages.len() * 2;
    let mut out: Vec<u8> = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(object_count);

    let kids = (0..pages.len())
        .map(|page| format!("{} 0 R", 4 + page * 2))
        .collect::<Vec<_>>()
        .join(" ");

    let mut push_object = |out: &mut Vec<u8>, body: &[u8]| {
        offsets.push(out.len());
        let number = offsets.len();
        out.extend_from_slice(format!("{number} 0 obj\n").as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    };

    push_object(&mut out, b"<< /Type /Catalog /Pages 2 0 R >>");
    push_object(
        &mut out,
        format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()).as_bytes(),
    );
    push_object(
        &mut out,
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );
    for (page, content) in pages.iter().enumerate() {
        let content_object = 5 + page * 2;
        push_object(
            &mut out,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {content_object} 0 R >>"
            )
            .as_bytes(),
        );
        let mut body = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(b"\nendstream");
        push_object(&mut out, &body);
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", object_count + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            object_count + 1
        )
        .as_bytes(),
    );
    out
}
