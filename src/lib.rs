//! Luna Portal - intranet workflows and clinical-trial dashboard data
//!
//! Two independent halves:
//!
//! - **Clinical**: seeded mock data for the clinical-trial dashboard (CGM
//!   trace, insulin deliveries, glycemic metrics, sessions, sleep, roster)
//! - **Approvals**: beverage orders and NDA requests moving through an
//!   approve/deny workflow, with NDAs dispatched to an e-signature provider
//!
//! State lives in a local key/value store; emails are composed as `mailto:`
//! links and never sent by the crate.

pub mod approvals;
pub mod catalog;
pub mod clinical;
pub mod config;
pub mod error;
pub mod signature;

pub use approvals::{ApprovalAction, ApprovalDesk, DecisionOutcome, LinkSettings, NdaSigner};
pub use clinical::{ClinicalProcessor, MetricsCalculator};
pub use config::PortalConfig;
pub use error::PortalError;
pub use signature::{HttpSignatureClient, SignatureProvider};

/// Portal version, reported by the CLI
pub const PORTAL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for exported reports
pub const PRODUCER_NAME: &str = "luna-portal";
