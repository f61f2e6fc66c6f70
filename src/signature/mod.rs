//! E-signature dispatch
//!
//! Request model, custom-field mapping and the HTTP client for the hosted
//! signature provider.

pub mod client;
pub mod request;

pub use client::{parse_response, HttpSignatureClient, SignatureProvider, SignatureReceipt};
pub use request::{
    is_valid_email, CustomField, FieldMapping, NdaRecipient, NdaTemplate, SignatureRequest, Signer,
};
