//! Fixed-layout quotation document renderer.
//!
//! Draws a single Letter-size page with absolute coordinate regions:
//! header band (logo + caption), static issuer block, dynamic metadata
//! block, a one-row item table with computed extension, totals at the
//! fixed 16% IVA rate, boilerplate notes carrying the lead time, and
//! the issuer footer. Output is a complete in-memory PDF byte
//! sequence; any unrecoverable failure surfaces as a single
//! [`RenderError`] and no partial document is ever returned.

use chrono::{DateTime, Utc};
use printpdf::image_crate::codecs::jpeg::JpegDecoder;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfLayerReference, Rect, Rgb,
};
use thiserror::Error;
use tracing::warn;

use cotiza_core::money::{format_usd, QuoteTotals};
use cotiza_core::QuotationDocumentContext;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("document construction failed: {0}")]
    Document(String),
}

impl From<printpdf::Error> for RenderError {
    fn from(error: printpdf::Error) -> Self {
        Self::Document(error.to_string())
    }
}

// Layout constants are in PDF points on a Letter page (612x792),
// origin bottom-left, matching the commercial template this document
// reproduces.
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;

const DARK_BLUE: Color = Color::Rgb(Rgb { r: 0.0, g: 0.1, b: 0.4, icc_profile: None });
const WHITE: Color = Color::Rgb(Rgb { r: 1.0, g: 1.0, b: 1.0, icc_profile: None });
const BLACK: Color = Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None });
const LINK_BLUE: Color = Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.8, icc_profile: None });

const ISSUER_LINES: &[&str] = &[
    "Aljibe 6910",
    "Riveras de la Silla",
    "Guadalupe, NL",
    "Mexico, CP 671167",
    "RFC: GNH190304P84",
];
const ISSUER_NAME: &str = "Grupo NSR HVAC y Control S.A. de C.V.";

const FOOTER_NAME: &str = "ZIEHL-ABEGG, INC.";
const FOOTER_LINES: &[&str] = &["Alan Cruz", "Project Engineer", "Móvil +52 81 2036 4745"];
const FOOTER_LINKS: &[&str] = &["alan.cruz@ziehl-abegg.us", "https://www.ziehl-abegg.com/en-us/"];

fn pt(value: f32) -> Mm {
    Mm(value * 25.4 / 72.0)
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

fn placeholder(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "N/A".to_string())
}

/// Label/value pairs of the dynamic metadata block, with `N/A`
/// substituted for schema-optional fields that are missing.
fn metadata_rows(context: &QuotationDocumentContext) -> Vec<(&'static str, String)> {
    vec![
        ("Fecha:", format_date(context.issued_at)),
        ("Expiración:", format_date(context.expires_at)),
        ("Cotización:", context.id.short_ref()),
        ("Cliente:", placeholder(&context.customer_company_name)),
        ("Atención:", placeholder(&context.customer_full_name)),
    ]
}

/// Renders quotation documents. Construct once at bootstrap with the
/// optional logo asset and share across attempts.
pub struct QuotationRenderer {
    logo_jpeg: Option<Vec<u8>>,
}

impl QuotationRenderer {
    pub fn new(logo_jpeg: Option<Vec<u8>>) -> Self {
        Self { logo_jpeg }
    }

    pub fn render(&self, context: &QuotationDocumentContext) -> Result<Vec<u8>, RenderError> {
        let (document, page, layer) =
            PdfDocument::new("Cotización", pt(PAGE_WIDTH), pt(PAGE_HEIGHT), "page");
        let layer = document.get_page(page).get_layer(layer);

        let regular = document.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = document.add_builtin_font(BuiltinFont::HelveticaBold)?;

        self.draw_logo(&layer);
        layer.set_fill_color(BLACK);
        layer.use_text("COTIZACIÓN", 18.0, pt(PAGE_WIDTH - 150.0), pt(PAGE_HEIGHT - 50.0), &bold);

        draw_issuer_block(&layer, &regular, &bold);
        draw_metadata_block(&layer, &regular, &bold, context);

        let totals = QuoteTotals::compute(context.quantity, context.unit_price);
        draw_item_table(&layer, &regular, &bold, context, &totals);
        let notes_top = draw_totals_block(&layer, &regular, &bold, &totals);
        let footer_top = draw_notes_block(&layer, &regular, &bold, &context.lead_time, notes_top);
        draw_footer_block(&layer, &regular, &bold, footer_top);

        document.save_to_bytes().map_err(RenderError::from)
    }

    // Best-effort: a missing or undecodable logo asset never fails the
    // document.
    fn draw_logo(&self, layer: &PdfLayerReference) {
        let Some(bytes) = self.logo_jpeg.as_deref() else {
            return;
        };

        let mut reader = std::io::Cursor::new(bytes);
        let image = JpegDecoder::new(&mut reader)
            .map_err(|error| error.to_string())
            .and_then(|decoder| Image::try_from(decoder).map_err(|error| error.to_string()));

        match image {
            Ok(image) => {
                image.add_to_layer(
                    layer.clone(),
                    ImageTransform {
                        translate_x: Some(pt(50.0)),
                        translate_y: Some(pt(PAGE_HEIGHT - 80.0)),
                        scale_x: Some(0.15),
                        scale_y: Some(0.15),
                        ..ImageTransform::default()
                    },
                );
            }
            Err(error) => {
                warn!(
                    event_name = "pdf.logo.skipped",
                    error = %error,
                    "logo asset could not be embedded, rendering without it"
                );
            }
        }
    }
}

fn draw_issuer_block(
    layer: &PdfLayerReference,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    let x = 50.0;
    let mut y = PAGE_HEIGHT - 130.0;
    let line_height = 14.0;

    layer.use_text(ISSUER_NAME, 10.0, pt(x), pt(y), bold);
    for line in ISSUER_LINES {
        y -= line_height;
        layer.use_text(*line, 10.0, pt(x), pt(y), regular);
    }
}

fn draw_metadata_block(
    layer: &PdfLayerReference,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
    context: &QuotationDocumentContext,
) {
    let label_x = PAGE_WIDTH - 200.0;
    let value_x = label_x + 65.0;
    let mut y = PAGE_HEIGHT - 70.0;
    let line_height = 14.0;

    for (label, value) in metadata_rows(context) {
        layer.use_text(label, 10.0, pt(label_x), pt(y), bold);
        layer.use_text(value, 10.0, pt(value_x), pt(y), regular);
        y -= line_height;
    }
}

fn draw_item_table(
    layer: &PdfLayerReference,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
    context: &QuotationDocumentContext,
    totals: &QuoteTotals,
) {
    let table_top = PAGE_HEIGHT - 250.0;
    let table_x = 40.0;
    let table_width = PAGE_WIDTH - table_x * 2.0;
    let header_y = table_top - 15.0;
    let row_y = header_y - 25.0;

    let col_article = table_x + 5.0;
    let col_model = table_x + 120.0;
    let col_quantity = table_x + 300.0;
    let col_unit_price = table_x + 370.0;
    let col_extension = table_x + 460.0;

    layer.set_fill_color(DARK_BLUE);
    layer.add_rect(
        Rect::new(pt(table_x), pt(table_top - 25.0), pt(table_x + table_width), pt(table_top))
            .with_mode(PaintMode::Fill),
    );

    layer.set_fill_color(WHITE);
    layer.use_text("Art Num", 10.0, pt(col_article), pt(header_y), bold);
    layer.use_text("Modelo", 10.0, pt(col_model), pt(header_y), bold);
    layer.use_text("Cantidad", 10.0, pt(col_quantity), pt(header_y), bold);
    layer.use_text("Unit Price", 10.0, pt(col_unit_price), pt(header_y), bold);
    layer.use_text("Extension", 10.0, pt(col_extension), pt(header_y), bold);

    layer.set_fill_color(BLACK);
    layer.use_text(&context.article_number, 10.0, pt(col_article), pt(row_y), regular);
    layer.use_text(&context.model, 10.0, pt(col_model), pt(row_y), regular);
    layer.use_text(
        context.quantity.to_string(),
        10.0,
        pt(col_quantity + 20.0),
        pt(row_y),
        regular,
    );
    layer.use_text(format_usd(context.unit_price), 10.0, pt(col_unit_price), pt(row_y), regular);
    layer.use_text(format_usd(totals.extension), 10.0, pt(col_extension), pt(row_y), regular);
}

fn totals_rows(totals: &QuoteTotals) -> [(&'static str, String); 3] {
    [
        ("SubTotal", format_usd(totals.subtotal)),
        ("IVA", format_usd(totals.iva)),
        ("TOTAL USD", format_usd(totals.total)),
    ]
}

/// Returns the y position where the notes block starts.
fn draw_totals_block(
    layer: &PdfLayerReference,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
    totals: &QuoteTotals,
) -> f32 {
    let label_x = PAGE_WIDTH - 150.0;
    let value_x = PAGE_WIDTH - 90.0;
    let table_bottom = PAGE_HEIGHT - 450.0;
    let mut y = table_bottom - 20.0;
    let line_height = 15.0;

    for (label, amount) in totals_rows(totals) {
        layer.use_text(label, 10.0, pt(label_x), pt(y), bold);
        layer.use_text(amount, 10.0, pt(value_x), pt(y), regular);
        y -= line_height;
    }

    y - 15.0
}

/// Returns the y position where the footer block starts.
fn draw_notes_block(
    layer: &PdfLayerReference,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
    lead_time: &str,
    notes_top: f32,
) -> f32 {
    let x = 40.0;
    let width = PAGE_WIDTH - x * 2.0;
    let header_y = notes_top - 15.0;

    layer.set_fill_color(DARK_BLUE);
    layer.add_rect(
        Rect::new(pt(x), pt(notes_top - 25.0), pt(x + width), pt(notes_top))
            .with_mode(PaintMode::Fill),
    );
    layer.set_fill_color(WHITE);
    layer.use_text("Notas o Instrucciones", 10.0, pt(x + 5.0), pt(header_y), bold);

    layer.set_fill_color(BLACK);
    let mut y = header_y - 20.0;
    let line_height = 12.0;

    let lines = [
        "* Precios en Dólares Americanos".to_string(),
        format!("* Tiempo de entrega: {lead_time}"),
        "* Entrega en sus instalaciones".to_string(),
        "* Incluye:".to_string(),
    ];
    for line in &lines {
        layer.use_text(line, 9.0, pt(x + 10.0), pt(y), regular);
        y -= line_height;
    }

    let sub_lines = [
        "- Flete a Mexico.",
        "- Impuestos e importación.",
        "- Flete local con entrega en sus instalaciones.",
    ];
    for line in sub_lines {
        layer.use_text(line, 9.0, pt(x + 15.0), pt(y), regular);
        y -= line_height;
    }

    y -= line_height * 0.5;
    layer.use_text(
        "NOTA: Antes de hacer efectiva una compra, favor de confirmar tiempo de entrega.",
        9.0,
        pt(x + 10.0),
        pt(y),
        bold,
    );

    y - 40.0
}

fn draw_footer_block(
    layer: &PdfLayerReference,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
    footer_top: f32,
) {
    let x = 40.0;
    let mut y = footer_top;
    let line_height = 12.0;

    layer.use_text(FOOTER_NAME, 9.0, pt(x), pt(y), bold);
    for line in FOOTER_LINES {
        y -= line_height;
        layer.use_text(*line, 9.0, pt(x), pt(y), regular);
    }

    layer.set_fill_color(LINK_BLUE);
    for link in FOOTER_LINKS {
        y -= line_height;
        layer.use_text(*link, 9.0, pt(x), pt(y), regular);
    }
    layer.set_fill_color(BLACK);
}
