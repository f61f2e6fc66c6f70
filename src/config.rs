//! Portal configuration
//!
//! Settings come from environment variables. Secrets (signature API key, NDA
//! template id, site password) are only checked for presence, and only when
//! the operation that needs them runs; the missing names are reported together.

use crate::catalog::VENDOR_EMAIL;
use crate::error::PortalError;
use crate::signature::{FieldMapping, NdaTemplate};
use chrono::{FixedOffset, Local, Offset};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_SIGNATURE_API_KEY: &str = "SIGNATURE_API_KEY";
pub const ENV_NDA_TEMPLATE_ID: &str = "NDA_TEMPLATE_ID";
pub const ENV_SITE_PASSWORD: &str = "SITE_PASSWORD";
pub const ENV_SIGNATURE_API_BASE: &str = "SIGNATURE_API_BASE";
pub const ENV_SIGNATURE_TEST_MODE: &str = "SIGNATURE_TEST_MODE";
pub const ENV_SIGNATURE_FIELD_MAP: &str = "SIGNATURE_FIELD_MAP";
pub const ENV_SIGNATURE_TIMEOUT_SECS: &str = "SIGNATURE_TIMEOUT_SECS";
pub const ENV_PORTAL_ORIGIN: &str = "PORTAL_ORIGIN";
pub const ENV_APPROVER_EMAIL: &str = "APPROVER_EMAIL";
pub const ENV_VENDOR_EMAIL: &str = "VENDOR_EMAIL";
pub const ENV_UTC_OFFSET_MINUTES: &str = "PORTAL_UTC_OFFSET_MINUTES";

pub const DEFAULT_SIGNATURE_API_BASE: &str = "https://api.hellosign.com";
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_APPROVER_EMAIL: &str = "jb@lunadiabetes.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Portal settings
#[derive(Clone)]
pub struct PortalConfig {
    pub signature_api_key: Option<String>,
    pub nda_template_id: Option<String>,
    pub site_password: Option<String>,
    pub signature_api_base: String,
    pub signature_test_mode: bool,
    pub field_map_path: Option<PathBuf>,
    pub request_timeout: Duration,
    /// Scheme and host used to build approval links
    pub origin: String,
    pub approver_email: String,
    pub vendor_email: String,
    /// Offset used for wall-clock hours on the clinical dashboard
    pub site_offset: FixedOffset,
}

/// Site offset alone, for commands that need nothing else from the environment
pub fn site_offset_from_env() -> Result<FixedOffset, PortalError> {
    site_offset_from_lookup(|name| std::env::var(name).ok())
}

/// Site offset through a variable lookup; unset means the local offset
pub fn site_offset_from_lookup<F>(lookup: F) -> Result<FixedOffset, PortalError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(ENV_UTC_OFFSET_MINUTES).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(v) => v
            .parse::<i32>()
            .ok()
            .and_then(|minutes| minutes.checked_mul(60))
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| PortalError::InvalidConfig(format!("{ENV_UTC_OFFSET_MINUTES} is not a valid offset: {v:?}"))),
        None => Ok(Local::now().offset().fix()),
    }
}

/// Everything the signature client needs, with secrets known to be present
#[derive(Clone)]
pub struct SignatureSettings {
    pub api_base: String,
    pub api_key: String,
    pub template_id: String,
    pub test_mode: bool,
    pub timeout: Duration,
    pub field_mapping: FieldMapping,
}

impl PortalConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, PortalError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PortalError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let signature_test_mode = match get(ENV_SIGNATURE_TEST_MODE) {
            Some(v) => parse_bool(&v).ok_or_else(|| {
                PortalError::InvalidConfig(format!("{ENV_SIGNATURE_TEST_MODE} must be true or false, got {v:?}"))
            })?,
            None => true,
        };

        let timeout_secs = match get(ENV_SIGNATURE_TIMEOUT_SECS) {
            Some(v) => v.parse::<u64>().map_err(|_| {
                PortalError::InvalidConfig(format!("{ENV_SIGNATURE_TIMEOUT_SECS} must be a whole number of seconds, got {v:?}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let site_offset = site_offset_from_lookup(&lookup)?;

        Ok(Self {
            signature_api_key: get(ENV_SIGNATURE_API_KEY),
            nda_template_id: get(ENV_NDA_TEMPLATE_ID),
            site_password: get(ENV_SITE_PASSWORD),
            signature_api_base: get(ENV_SIGNATURE_API_BASE)
                .unwrap_or_else(|| DEFAULT_SIGNATURE_API_BASE.to_string()),
            signature_test_mode,
            field_map_path: get(ENV_SIGNATURE_FIELD_MAP).map(PathBuf::from),
            request_timeout: Duration::from_secs(timeout_secs),
            origin: get(ENV_PORTAL_ORIGIN)
                .map(|o| o.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
            approver_email: get(ENV_APPROVER_EMAIL)
                .unwrap_or_else(|| DEFAULT_APPROVER_EMAIL.to_string()),
            vendor_email: get(ENV_VENDOR_EMAIL).unwrap_or_else(|| VENDOR_EMAIL.to_string()),
            site_offset,
        })
    }

    /// Names of required secrets that are not set
    pub fn missing(&self) -> Vec<String> {
        [
            (ENV_SIGNATURE_API_KEY, self.signature_api_key.is_none()),
            (ENV_NDA_TEMPLATE_ID, self.nda_template_id.is_none()),
            (ENV_SITE_PASSWORD, self.site_password.is_none()),
        ]
        .into_iter()
        .filter(|(_, missing)| *missing)
        .map(|(name, _)| name.to_string())
        .collect()
    }

    /// Settings for the signature provider, failing with every missing name
    pub fn signature_settings(&self) -> Result<SignatureSettings, PortalError> {
        let (api_key, template_id) = match (&self.signature_api_key, &self.nda_template_id) {
            (Some(key), Some(template)) => (key.clone(), template.clone()),
            (key, template) => {
                let mut missing = Vec::new();
                if key.is_none() {
                    missing.push(ENV_SIGNATURE_API_KEY.to_string());
                }
                if template.is_none() {
                    missing.push(ENV_NDA_TEMPLATE_ID.to_string());
                }
                log::error!("Missing environment variables: {}", missing.join(", "));
                return Err(PortalError::MissingConfig(missing));
            }
        };

        Ok(SignatureSettings {
            api_base: self.signature_api_base.trim_end_matches('/').to_string(),
            api_key,
            template_id,
            test_mode: self.signature_test_mode,
            timeout: self.request_timeout,
            field_mapping: self.load_field_mapping()?,
        })
    }

    /// Field mapping from `SIGNATURE_FIELD_MAP`, or the built-in template mapping
    pub fn load_field_mapping(&self) -> Result<FieldMapping, PortalError> {
        match &self.field_map_path {
            Some(path) => {
                let json = fs::read_to_string(path).map_err(|e| {
                    PortalError::InvalidConfig(format!("cannot read field map {}: {e}", path.display()))
                })?;
                FieldMapping::from_json(&json)
            }
            None => Ok(FieldMapping::default()),
        }
    }

    /// Shared-password gate. Fails when no password is configured.
    pub fn check_site_password(&self, candidate: &str) -> Result<bool, PortalError> {
        match &self.site_password {
            Some(password) => Ok(password == candidate),
            None => Err(PortalError::MissingConfig(vec![ENV_SITE_PASSWORD.to_string()])),
        }
    }
}

impl SignatureSettings {
    /// The NDA template these settings send from
    pub fn template(&self) -> NdaTemplate {
        NdaTemplate {
            template_id: self.template_id.clone(),
            test_mode: self.test_mode,
            field_mapping: self.field_mapping.clone(),
        }
    }
}

impl fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalConfig")
            .field("signature_api_key", &redact(&self.signature_api_key))
            .field("nda_template_id", &self.nda_template_id)
            .field("site_password", &redact(&self.site_password))
            .field("signature_api_base", &self.signature_api_base)
            .field("signature_test_mode", &self.signature_test_mode)
            .field("field_map_path", &self.field_map_path)
            .field("request_timeout", &self.request_timeout)
            .field("origin", &self.origin)
            .field("approver_email", &self.approver_email)
            .field("vendor_email", &self.vendor_email)
            .field("site_offset", &self.site_offset)
            .finish()
    }
}

impl fmt::Debug for SignatureSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureSettings")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .field("template_id", &self.template_id)
            .field("test_mode", &self.test_mode)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    if secret.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
