//! HTML bodies for the two outbound messages, rendered from embedded
//! tera templates.

use tera::{Context, Tera};

use cotiza_core::domain::quotation::{QuotationId, QuotationRequest};
use cotiza_core::CustomerProfile;

pub struct EmailTemplates {
    tera: Tera,
}

impl EmailTemplates {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template(
            "quotation_ready.html.tera",
            include_str!("../../../templates/email/quotation_ready.html.tera"),
        )?;
        tera.add_raw_template(
            "new_request.html.tera",
            include_str!("../../../templates/email/new_request.html.tera"),
        )?;
        Ok(Self { tera })
    }

    /// Customer-facing body accompanying the quotation document.
    pub fn quotation_ready(
        &self,
        customer_name: Option<&str>,
        reference: &QuotationId,
    ) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("customer_name", customer_name.unwrap_or("Customer"));
        context.insert("reference", &reference.to_string());
        self.tera.render("quotation_ready.html.tera", &context)
    }

    /// Operator notification for freshly created requests. Embeds the
    /// literal reply template the reply parser expects back verbatim.
    pub fn new_request(
        &self,
        profile: &CustomerProfile,
        email: &str,
        requests: &[QuotationRequest],
    ) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("full_name", profile.full_name.as_deref().unwrap_or("N/A"));
        context.insert("company_name", profile.company_name.as_deref().unwrap_or("N/A"));
        context.insert("email", email);
        context.insert("requests", requests);
        self.tera.render("new_request.html.tera", &context)
    }
}
