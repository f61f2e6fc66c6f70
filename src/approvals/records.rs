//! Beverage order and NDA request records

use crate::approvals::status::{NdaStatus, OrderStatus, StatusTrail};
use crate::catalog;
use crate::error::PortalError;
use crate::signature::NdaRecipient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ORDER_SUBMITTED_NOTE: &str = "Order submitted, awaiting approval";
pub const NDA_SUBMITTED_NOTE: &str = "Request submitted, awaiting approval";

/// A requested product line, as entered by the submitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub category: String,
    pub brand_id: String,
    pub flavor: String,
    pub quantity: u32,
}

/// A product line resolved against the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub category: String,
    pub brand_id: String,
    pub brand: String,
    pub flavor: String,
    pub quantity: u32,
}

impl OrderItem {
    /// Resolve a line against the catalog
    pub fn resolve(line: &OrderLine) -> Result<Self, PortalError> {
        if line.quantity == 0 {
            return Err(PortalError::InvalidField {
                field: "quantity".to_string(),
                reason: format!("{} - {} must be ordered at least once", line.brand_id, line.flavor),
            });
        }

        let entry = catalog::find(&line.category, &line.brand_id, &line.flavor).ok_or_else(|| {
            PortalError::InvalidField {
                field: "items".to_string(),
                reason: format!(
                    "unknown product {}/{}/{}",
                    line.category, line.brand_id, line.flavor
                ),
            }
        })?;

        Ok(Self {
            category: entry.category.key.to_string(),
            brand_id: entry.brand.id.to_string(),
            brand: entry.brand.name.to_string(),
            flavor: entry.flavor.to_string(),
            quantity: line.quantity,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeverageOrder {
    pub id: String,
    pub submitted_by: String,
    pub items: Vec<OrderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub trail: StatusTrail<OrderStatus>,
}

impl BeverageOrder {
    /// Validate and build a pending order
    pub fn new(
        submitted_by: &str,
        lines: &[OrderLine],
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Self, PortalError> {
        if submitted_by.trim().is_empty() {
            return Err(PortalError::MissingField("submitted_by".to_string()));
        }
        if lines.is_empty() {
            return Err(PortalError::MissingField("items".to_string()));
        }

        let items = lines
            .iter()
            .map(OrderItem::resolve)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            submitted_by: submitted_by.trim().to_string(),
            items,
            notes: notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            created_at: at,
            trail: StatusTrail::pending(ORDER_SUBMITTED_NOTE, at),
        })
    }

    pub fn status(&self) -> OrderStatus {
        self.trail.current()
    }

    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdaRequest {
    pub id: String,
    #[serde(flatten)]
    pub recipient: NdaRecipient,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_request_id: Option<String>,
    #[serde(flatten)]
    pub trail: StatusTrail<NdaStatus>,
}

impl NdaRequest {
    /// Validate and build a pending request. Surrounding whitespace is trimmed
    /// and blank optional fields are dropped.
    pub fn new(recipient: NdaRecipient, at: DateTime<Utc>) -> Result<Self, PortalError> {
        let recipient = normalize(recipient);
        recipient.validate()?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            recipient,
            created_at: at,
            signature_request_id: None,
            trail: StatusTrail::pending(NDA_SUBMITTED_NOTE, at),
        })
    }

    pub fn status(&self) -> NdaStatus {
        self.trail.current()
    }
}

fn normalize(recipient: NdaRecipient) -> NdaRecipient {
    let optional = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    NdaRecipient {
        company_name: recipient.company_name.trim().to_string(),
        first_name: recipient.first_name.trim().to_string(),
        last_name: recipient.last_name.trim().to_string(),
        email: recipient.email.trim().to_string(),
        title: optional(recipient.title),
        phone: optional(recipient.phone),
        address_line1: optional(recipient.address_line1),
        address_line2: optional(recipient.address_line2),
        address_line3: optional(recipient.address_line3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line(category: &str, brand_id: &str, flavor: &str, quantity: u32) -> OrderLine {
        OrderLine {
            category: category.to_string(),
            brand_id: brand_id.to_string(),
            flavor: flavor.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_order_resolves_catalog_names() {
        let order = BeverageOrder::new(
            "Sam",
            &[line("kombucha", "gts", "trilogy", 2), line("cold_brew", "cwj", "NITRO Coffee (Medium Blend)", 1)],
            Some("  ".to_string()),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(order.items[0].brand, "GT's Kombucha");
        assert_eq!(order.items[0].flavor, "Trilogy");
        assert_eq!(order.total_quantity(), 3);
        assert_eq!(order.notes, None);
        assert_eq!(order.status(), OrderStatus::PendingApproval);
        assert_eq!(order.trail.history().len(), 1);
    }

    #[test]
    fn test_order_validation() {
        let now = Utc::now();
        assert!(matches!(
            BeverageOrder::new("Sam", &[], None, now),
            Err(PortalError::MissingField(_))
        ));
        assert!(matches!(
            BeverageOrder::new("Sam", &[line("kombucha", "gts", "Trilogy", 0)], None, now),
            Err(PortalError::InvalidField { .. })
        ));
        assert!(matches!(
            BeverageOrder::new("Sam", &[line("kombucha", "gts", "Root Beer", 1)], None, now),
            Err(PortalError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_nda_record_json_shape() {
        let request = NdaRequest::new(
            NdaRecipient {
                company_name: " Acme ".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@acme.bio".to_string(),
                phone: Some(String::new()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["company_name"], "Acme");
        assert_eq!(value["status"], "pending_approval");
        assert_eq!(value["status_history"][0]["note"], NDA_SUBMITTED_NOTE);
        assert!(value["phone"].is_null());

        let back: NdaRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back, request);
    }
}
