//! Approval links and mail composition
//!
//! Approvals happen by a human clicking a link inside an email. This module
//! builds those links, parses them back, and composes the `mailto:` URLs for
//! the approver and vendor emails. Nothing here sends mail.

use crate::approvals::records::{BeverageOrder, NdaRequest};
use crate::catalog::VENDOR_PHONE;
use crate::config::PortalConfig;
use crate::error::PortalError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where approval links point and who receives the emails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    pub origin: String,
    pub approver_email: String,
    pub vendor_email: String,
}

impl LinkSettings {
    pub fn from_config(config: &PortalConfig) -> Self {
        Self {
            origin: config.origin.clone(),
            approver_email: config.approver_email.clone(),
            vendor_email: config.vendor_email.clone(),
        }
    }
}

/// Which approval page a link targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalResource {
    Beverage,
    Nda,
}

impl ApprovalResource {
    pub fn path(self) -> &'static str {
        match self {
            ApprovalResource::Beverage => "/beverage-approve",
            ApprovalResource::Nda => "/nda-approve",
        }
    }

    fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/beverage-approve" => Some(ApprovalResource::Beverage),
            "/nda-approve" => Some(ApprovalResource::Nda),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approve,
    Deny,
}

impl ApprovalAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalAction::Approve => "approve",
            ApprovalAction::Deny => "deny",
        }
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalAction {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "approve" => Ok(ApprovalAction::Approve),
            "deny" => Ok(ApprovalAction::Deny),
            other => Err(PortalError::InvalidLink(format!("unknown action {other:?}"))),
        }
    }
}

/// A decoded approval link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLink {
    pub resource: ApprovalResource,
    pub id: String,
    pub action: ApprovalAction,
}

impl ApprovalLink {
    /// `<origin>/<resource>-approve?id=<id>&action=<action>`
    pub fn to_url(&self, origin: &str) -> String {
        format!(
            "{}{}?id={}&action={}",
            origin.trim_end_matches('/'),
            self.resource.path(),
            urlencoding::encode(&self.id),
            self.action
        )
    }

    /// Parse a full URL or a bare path-and-query. The origin is not checked.
    pub fn parse(link: &str) -> Result<Self, PortalError> {
        let link = link.trim();
        let without_scheme = match link.find("://") {
            Some(pos) => {
                let rest = &link[pos + 3..];
                rest.find('/').map(|slash| &rest[slash..]).unwrap_or("")
            }
            None => link,
        };

        let (path, query) = without_scheme
            .split_once('?')
            .ok_or_else(|| PortalError::InvalidLink(format!("no query string in {link:?}")))?;
        let query = query.split('#').next().unwrap_or_default();

        let resource = ApprovalResource::from_path(path)
            .ok_or_else(|| PortalError::InvalidLink(format!("unknown approval page {path:?}")))?;

        let mut id = None;
        let mut action = None;
        for pair in query.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(value)
                .map_err(|e| PortalError::InvalidLink(e.to_string()))?
                .into_owned();
            match key {
                "id" => id = Some(value),
                "action" => action = Some(value.parse::<ApprovalAction>()?),
                _ => {}
            }
        }

        let id = id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PortalError::InvalidLink("missing id".to_string()))?;
        let action = action.ok_or_else(|| PortalError::InvalidLink("missing action".to_string()))?;

        Ok(Self {
            resource,
            id,
            action,
        })
    }
}

/// `mailto:<to>?subject=<enc>&body=<enc>`
pub fn mailto(to: &str, subject: &str, body: &str) -> String {
    format!(
        "mailto:{to}?subject={}&body={}",
        urlencoding::encode(subject),
        urlencoding::encode(body)
    )
}

fn link_pair(settings: &LinkSettings, resource: ApprovalResource, id: &str) -> (String, String) {
    let link = |action| {
        ApprovalLink {
            resource,
            id: id.to_string(),
            action,
        }
        .to_url(&settings.origin)
    };
    (link(ApprovalAction::Approve), link(ApprovalAction::Deny))
}

/// Approver email for a new NDA request
pub fn nda_approval_mailto(settings: &LinkSettings, request: &NdaRequest) -> String {
    let r = &request.recipient;
    let (approve, deny) = link_pair(settings, ApprovalResource::Nda, &request.id);

    let subject = format!("NDA Request: {} - {}", r.company_name, r.full_name());
    let body = format!(
        "Hi,\n\n\
         A new NDA request has been submitted and requires your approval.\n\n\
         Details:\n\
         - Company: {}\n\
         - Name: {}\n\
         - Email: {}\n\n\
         To APPROVE this request and send the NDA:\n{approve}\n\n\
         To DENY this request:\n{deny}\n\n\
         Thanks,\nLuna Intranet",
        r.company_name,
        r.full_name(),
        r.email
    );

    mailto(&settings.approver_email, &subject, &body)
}

fn item_lines(order: &BeverageOrder) -> String {
    order
        .items
        .iter()
        .map(|item| format!("• {}x {} - {}\n", item.quantity, item.brand, item.flavor))
        .collect()
}

/// Approver email for a new beverage order
pub fn order_approval_mailto(settings: &LinkSettings, order: &BeverageOrder) -> String {
    let (approve, deny) = link_pair(settings, ApprovalResource::Beverage, &order.id);
    let notes = order
        .notes
        .as_deref()
        .map(|n| format!("\nNotes: {n}\n"))
        .unwrap_or_default();

    let subject = format!("Beverage Order Request from {}", order.submitted_by);
    let body = format!(
        "Hi,\n\n\
         {} has requested a beverage order and it needs your approval.\n\n\
         Items:\n{}{notes}\n\
         To APPROVE this order:\n{approve}\n\n\
         To DENY this order:\n{deny}\n\n\
         Thanks,\nLuna Intranet",
        order.submitted_by,
        item_lines(order)
    );

    mailto(&settings.approver_email, &subject, &body)
}

/// Order email to the vendor, composed once an order is approved
pub fn vendor_order_mailto(settings: &LinkSettings, order: &BeverageOrder) -> String {
    let notes = order
        .notes
        .as_deref()
        .map(|n| format!("A quick note: {n}\n"))
        .unwrap_or_default();

    let body = format!(
        "Hi there!\n\n\
         This is Luna Health. Hope you're having a great day!\n\n\
         We're running low on beverages and would love to place an order when you get a chance:\n\n\
         {}\n{notes}\n\
         Thanks so much for always taking great care of us! We really appreciate the partnership.\n\n\
         Best,\nLuna Health\n\n\
         (Vendor line: {VENDOR_PHONE})",
        item_lines(order)
    );

    mailto(&settings.vendor_email, "Beverage Order from Luna Health", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approvals::records::OrderLine;
    use crate::signature::NdaRecipient;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn settings() -> LinkSettings {
        LinkSettings {
            origin: "https://intranet.example.com".to_string(),
            approver_email: "approver@example.com".to_string(),
            vendor_email: "orders@kegjoy.com".to_string(),
        }
    }

    fn decode_body(mailto: &str) -> String {
        let body = mailto.split("&body=").nth(1).unwrap();
        urlencoding::decode(body).unwrap().into_owned()
    }

    #[test]
    fn test_link_format() {
        let link = ApprovalLink {
            resource: ApprovalResource::Nda,
            id: "abc-123".to_string(),
            action: ApprovalAction::Deny,
        };
        assert_eq!(
            link.to_url("https://intranet.example.com/"),
            "https://intranet.example.com/nda-approve?id=abc-123&action=deny"
        );
    }

    #[test]
    fn test_parse_link() {
        let link = ApprovalLink::parse(
            "http://localhost:3000/beverage-approve?id=a%20b&action=APPROVE#top",
        )
        .unwrap();
        assert_eq!(
            link,
            ApprovalLink {
                resource: ApprovalResource::Beverage,
                id: "a b".to_string(),
                action: ApprovalAction::Approve,
            }
        );

        let path_only = ApprovalLink::parse("/nda-approve?action=deny&id=42").unwrap();
        assert_eq!(path_only.resource, ApprovalResource::Nda);
        assert_eq!(path_only.id, "42");
    }

    #[test]
    fn test_parse_rejects_bad_links() {
        for bad in [
            "https://x.io/nda-approve",
            "https://x.io/other?id=1&action=approve",
            "https://x.io/nda-approve?id=1&action=maybe",
            "https://x.io/nda-approve?action=approve",
            "https://x.io/nda-approve?id=&action=approve",
        ] {
            assert!(
                matches!(ApprovalLink::parse(bad), Err(PortalError::InvalidLink(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_mailto_encoding() {
        assert_eq!(
            mailto("a@b.co", "Hi & bye", "line 1\nline 2"),
            "mailto:a@b.co?subject=Hi%20%26%20bye&body=line%201%0Aline%202"
        );
    }

    #[test]
    fn test_nda_approval_email() {
        let request = NdaRequest::new(
            NdaRecipient {
                company_name: "Acme".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@acme.bio".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

        let mailto = nda_approval_mailto(&settings(), &request);
        assert!(mailto.starts_with("mailto:approver@example.com?subject=NDA%20Request%3A%20Acme"));

        let body = decode_body(&mailto);
        let approve = format!(
            "https://intranet.example.com/nda-approve?id={}&action=approve",
            request.id
        );
        assert!(body.contains(&approve));
        assert!(body.contains("- Email: ada@acme.bio"));

        // every link in the email parses back to the same record
        let parsed = ApprovalLink::parse(&approve).unwrap();
        assert_eq!(parsed.id, request.id);
    }

    #[test]
    fn test_order_emails() {
        let order = BeverageOrder::new(
            "Sam",
            &[OrderLine {
                category: "kombucha".to_string(),
                brand_id: "gts".to_string(),
                flavor: "Trilogy".to_string(),
                quantity: 2,
            }],
            Some("Extra cold please".to_string()),
            Utc::now(),
        )
        .unwrap();

        let approver = decode_body(&order_approval_mailto(&settings(), &order));
        assert!(approver.contains("• 2x GT's Kombucha - Trilogy"));
        assert!(approver.contains("/beverage-approve?id="));

        let vendor_link = vendor_order_mailto(&settings(), &order);
        assert!(vendor_link.starts_with("mailto:orders@kegjoy.com?subject=Beverage%20Order%20from%20Luna%20Health"));
        let vendor = decode_body(&vendor_link);
        assert!(vendor.contains("A quick note: Extra cold please"));
        assert!(vendor.contains("• 2x GT's Kombucha - Trilogy"));
    }
}
