//! Submission pipeline: contact validation, payload building, and the
//! outbound intake/status clients.
//!
//! Attached files are converted to base64 for transport; the intake
//! endpoint owns reference-id assignment, timestamping, and the ledger
//! append. There is no retry anywhere: a failed submission surfaces to the
//! caller and the basket is left untouched.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::domain::aggregates::ledger::QuoteStatus;
use crate::domain::aggregates::quote::{Attachment, Customization, QuoteItem};
use crate::domain::value_objects::{
    ColorChoice, ReferenceId, ReferenceIdError, SizeQuantities, SubmissionKind,
};

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct ContactInfo {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub delivery: Option<String>,
    #[serde(default)]
    pub payment: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// File made text-transportable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedFile {
    pub filename: String,
    pub content_type: String,
    pub data: String,
}

impl EncodedFile {
    pub fn from_attachment(attachment: &Attachment) -> Self {
        Self {
            filename: attachment.filename.clone(),
            content_type: attachment.content_type.clone(),
            data: BASE64.encode(&attachment.bytes),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PayloadItem {
    pub product_id: String,
    pub product_name: String,
    pub color: Option<ColorChoice>,
    pub size_quantities: SizeQuantities,
    pub unit_price: Decimal,
    pub print_locations: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub logo_data: Option<EncodedFile>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub design_data: Option<EncodedFile>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub customizations: Vec<Customization>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub contact: ContactInfo,
    #[serde(rename = "type")]
    pub kind: SubmissionKind,
    pub items: Vec<PayloadItem>,
}

/// Build the intake payload from basket items. Rows that would not render
/// are skipped rather than submitted half-formed.
pub fn build_payload(
    items: &[QuoteItem],
    contact: ContactInfo,
    kind: SubmissionKind,
) -> SubmissionPayload {
    let items = items
        .iter()
        .filter(|i| i.is_renderable())
        .map(|i| PayloadItem {
            product_id: i.product.as_ref().map(|p| p.id.clone()).unwrap_or_default(),
            product_name: i.product.as_ref().map(|p| p.name.clone()).unwrap_or_default(),
            color: i.color.clone(),
            size_quantities: i.sizes.clone(),
            unit_price: i.unit_price.unwrap_or_default(),
            print_locations: i.print_locations,
            logo_data: i.logo.as_ref().map(EncodedFile::from_attachment),
            design_data: i.design.as_ref().map(EncodedFile::from_attachment),
            customizations: i.customizations.clone(),
        })
        .collect();
    SubmissionPayload { contact, kind, items }
}

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("invalid contact information: {0}")]
    InvalidContact(#[from] validator::ValidationErrors),

    #[error("intake request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("intake rejected the submission with HTTP {status}")]
    Rejected { status: reqwest::StatusCode },

    #[error("intake response carried no usable reference id: {0}")]
    Reference(#[from] ReferenceIdError),

    #[error("status updates require ADMIN_TOKEN to be configured")]
    MissingAdminToken,
}

#[derive(Debug, Deserialize)]
struct IntakeResponse {
    reference: String,
}

/// Client for the external order-intake service.
pub struct IntakeClient {
    http: reqwest::Client,
    intake_url: String,
    admin_token: Option<String>,
}

impl IntakeClient {
    pub fn new(intake_url: impl Into<String>, admin_token: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), intake_url: intake_url.into(), admin_token }
    }

    /// Submit a payload; on success the intake returns the reference id it
    /// assigned to the appended ledger row.
    pub async fn submit(&self, payload: &SubmissionPayload) -> Result<ReferenceId, SubmissionError> {
        payload.contact.validate()?;
        let response = self.http.post(&self.intake_url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(SubmissionError::Rejected { status: response.status() });
        }
        let body: IntakeResponse = response.json().await?;
        Ok(ReferenceId::parse(&body.reference)?)
    }

    /// Authenticated admin call mutating only one ledger row's status.
    pub async fn update_status(
        &self,
        quote_id: &ReferenceId,
        status: QuoteStatus,
    ) -> Result<(), SubmissionError> {
        let token = self.admin_token.as_deref().ok_or(SubmissionError::MissingAdminToken)?;
        let url = format!("{}/status", self.intake_url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "quoteId": quote_id, "status": status }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SubmissionError::Rejected { status: response.status() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::CatalogProduct;

    fn contact() -> ContactInfo {
        ContactInfo {
            name: "Ada Apparel".into(),
            email: "ada@example.com".into(),
            phone: "0123456789".into(),
            address: Some("1 High St".into()),
            delivery: None,
            payment: None,
            company: Some("Ada Ltd".into()),
            message: None,
        }
    }

    fn item_with_logo() -> QuoteItem {
        QuoteItem {
            id: "p1-Blue-loc1".into(),
            product: Some(CatalogProduct {
                id: "p1".into(),
                name: "Jersey".into(),
                collection_group: Some("Performance".into()),
                price: Decimal::from(100),
                colors: vec![],
                sizes: vec![],
                customizable: true,
                moq: None,
            }),
            color: Some(ColorChoice { name: "Blue".into(), hex: "#0000ff".into() }),
            sizes: SizeQuantities::of(&[("M", 2)]),
            unit_price: Some(Decimal::from(100)),
            print_locations: 1,
            logo: Some(Attachment {
                filename: "logo.png".into(),
                content_type: "image/png".into(),
                bytes: vec![0x01, 0x02, 0x03],
            }),
            design: None,
            customizations: vec![],
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload = build_payload(&[item_with_logo()], contact(), SubmissionKind::DirectOrder);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "direct_order");
        assert_eq!(json["items"][0]["product_id"], "p1");
        assert_eq!(json["items"][0]["size_quantities"]["M"], 2);
        assert_eq!(json["items"][0]["logo_data"]["data"], BASE64.encode([0x01, 0x02, 0x03]));
        assert!(json["items"][0].get("design_data").is_none());
        assert!(json["items"][0].get("customizations").is_none());
        assert_eq!(json["contact"]["email"], "ada@example.com");
    }

    #[test]
    fn test_payload_skips_unrenderable_rows() {
        let mut broken = item_with_logo();
        broken.color = None;
        let payload = build_payload(
            &[item_with_logo(), broken],
            contact(),
            SubmissionKind::QuoteRequest,
        );
        assert_eq!(payload.items.len(), 1);
    }

    #[test]
    fn test_contact_validation() {
        assert!(contact().validate().is_ok());
        let mut bad = contact();
        bad.email = "not-an-email".into();
        assert!(bad.validate().is_err());
        let mut short = contact();
        short.phone = "123".into();
        assert!(short.validate().is_err());
    }
}
