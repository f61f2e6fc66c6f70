//! Provider request model
//!
//! Builds the `send_with_template` body from an NDA recipient, a template and
//! a custom-field mapping.

use crate::error::PortalError;
use serde::{Deserialize, Serialize};

/// Role name of the single signer on the NDA template
pub const SIGNER_ROLE: &str = "recipient_signer";

/// Body of a `send_with_template` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub template_ids: Vec<String>,
    pub subject: String,
    pub message: String,
    pub signers: Vec<Signer>,
    pub custom_fields: Vec<CustomField>,
    pub test_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub role: String,
    pub email_address: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub name: String,
    pub value: String,
}

/// Template the NDA is sent from
#[derive(Debug, Clone, PartialEq)]
pub struct NdaTemplate {
    pub template_id: String,
    pub test_mode: bool,
    pub field_mapping: FieldMapping,
}

/// Person and company the NDA goes to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdaRecipient {
    pub company_name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub address_line3: Option<String>,
}

impl NdaRecipient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Check the required fields. Email must look like `local@domain.tld`.
    pub fn validate(&self) -> Result<(), PortalError> {
        let required = [
            ("company_name", &self.company_name),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(PortalError::MissingField(field.to_string()));
            }
        }

        if !is_valid_email(&self.email) {
            return Err(PortalError::InvalidField {
                field: "email".to_string(),
                reason: "Please enter a valid email address".to_string(),
            });
        }

        Ok(())
    }
}

/// Loose email shape check: one `@`, no whitespace, a dot in the domain with
/// text on both sides.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Maps logical NDA fields onto the template's custom field names.
///
/// A logical field may feed several provider fields (the current template has
/// duplicate address fields) or none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default)]
    pub company: Vec<String>,
    #[serde(default)]
    pub full_name: Vec<String>,
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default)]
    pub address_line1: Vec<String>,
    #[serde(default)]
    pub address_line2: Vec<String>,
    #[serde(default)]
    pub address_line3: Vec<String>,
    #[serde(default)]
    pub phone: Vec<String>,
    #[serde(default)]
    pub email: Vec<String>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }

        Self {
            company: names(&["Company"]),
            full_name: names(&["Full name"]),
            title: names(&["Title"]),
            address_line1: names(&["Recipient AddressL1", "Recipient_AddressL1"]),
            address_line2: names(&["Recipient AddressL2", "Recipient_AddressL2"]),
            address_line3: Vec::new(),
            phone: names(&["Recipient Phone"]),
            email: names(&["Email address"]),
        }
    }
}

impl FieldMapping {
    /// Parse a mapping file. Logical fields left out map to nothing.
    pub fn from_json(json: &str) -> Result<Self, PortalError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Custom fields for a recipient, in mapping order. Missing optional
    /// values are sent as empty strings.
    pub fn custom_fields(&self, recipient: &NdaRecipient) -> Vec<CustomField> {
        let optional = |value: &Option<String>| value.clone().unwrap_or_default();
        let full_name = recipient.full_name();

        let pairs: [(&Vec<String>, String); 8] = [
            (&self.company, recipient.company_name.clone()),
            (&self.full_name, full_name),
            (&self.title, optional(&recipient.title)),
            (&self.address_line1, optional(&recipient.address_line1)),
            (&self.address_line2, optional(&recipient.address_line2)),
            (&self.address_line3, optional(&recipient.address_line3)),
            (&self.phone, optional(&recipient.phone)),
            (&self.email, recipient.email.clone()),
        ];

        pairs
            .iter()
            .flat_map(|(names, value)| {
                names.iter().map(move |name| CustomField {
                    name: name.clone(),
                    value: value.clone(),
                })
            })
            .collect()
    }
}

impl SignatureRequest {
    /// Build the NDA request for one recipient
    pub fn for_nda(template: &NdaTemplate, recipient: &NdaRecipient) -> Result<Self, PortalError> {
        recipient.validate()?;

        let company = &recipient.company_name;
        Ok(Self {
            template_ids: vec![template.template_id.clone()],
            subject: format!("NDA - {company}"),
            message: format!("Please review and sign the Non-Disclosure Agreement for {company}."),
            signers: vec![Signer {
                role: SIGNER_ROLE.to_string(),
                email_address: recipient.email.clone(),
                name: recipient.full_name(),
            }],
            custom_fields: template.field_mapping.custom_fields(recipient),
            test_mode: template.test_mode,
        })
    }
}
