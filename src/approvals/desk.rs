//! Approval desk
//!
//! Entry point for the two approval workflows. Submissions are validated,
//! stored as pending and answered with the approver email; decisions arrive
//! through the approve/deny links and move records along their status trail.
//!
//! NDA approval is two-phase: `approved` is committed before the signature
//! provider is called, and the dispatch result is appended afterwards as
//! `sent` or `error`. The approval itself is never rolled back.

use crate::approvals::links::{
    nda_approval_mailto, order_approval_mailto, vendor_order_mailto, ApprovalAction, ApprovalLink,
    ApprovalResource, LinkSettings,
};
use crate::approvals::records::{BeverageOrder, NdaRequest, OrderLine};
use crate::approvals::status::{NdaStatus, OrderStatus, WorkflowStatus};
use crate::approvals::store::{KeyValueStore, BEVERAGE_ORDERS, NDA_REQUESTS};
use crate::error::PortalError;
use crate::signature::{NdaRecipient, NdaTemplate, SignatureProvider, SignatureRequest};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A stored submission plus the email that asks for its approval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission<T> {
    pub record: T,
    pub approver_mailto: String,
}

/// Result of acting on a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Denied,
    /// Order approved; the vendor email is ready to send
    OrderApproved { vendor_mailto: String },
    Sent { signature_request_id: Option<String> },
    /// Approval stands, but the provider call failed
    DispatchFailed { message: String },
    /// The record had already left `pending_approval`; nothing changed
    AlreadyProcessed { status: String },
}

/// Signature provider paired with the template it sends
pub struct NdaSigner<P> {
    provider: P,
    template: NdaTemplate,
}

impl<P: SignatureProvider> NdaSigner<P> {
    pub fn new(provider: P, template: NdaTemplate) -> Self {
        Self { provider, template }
    }

    fn send(&self, recipient: &NdaRecipient) -> Result<Option<String>, PortalError> {
        let request = SignatureRequest::for_nda(&self.template, recipient)?;
        let receipt = self.provider.send_with_template(&request)?;
        Ok(receipt.signature_request_id)
    }
}

pub struct ApprovalDesk<S, P> {
    store: S,
    links: LinkSettings,
    /// Missing configuration names when no signer could be built
    signer: Result<NdaSigner<P>, Vec<String>>,
}

impl<S, P> ApprovalDesk<S, P>
where
    S: KeyValueStore,
    P: SignatureProvider,
{
    pub fn new(store: S, links: LinkSettings, signer: NdaSigner<P>) -> Self {
        Self {
            store,
            links,
            signer: Ok(signer),
        }
    }

    /// A desk whose NDA dispatches fail with a configuration error naming
    /// `missing`. Everything else works normally.
    pub fn without_signer(store: S, links: LinkSettings, missing: Vec<String>) -> Self {
        Self {
            store,
            links,
            signer: Err(missing),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn submit_order(
        &mut self,
        submitted_by: &str,
        lines: &[OrderLine],
        notes: Option<String>,
    ) -> Result<Submission<BeverageOrder>, PortalError> {
        let order = BeverageOrder::new(submitted_by, lines, notes, Utc::now())?;
        BEVERAGE_ORDERS.append(&mut self.store, order.clone())?;
        log::info!(
            "Beverage order {} submitted by {} ({} items)",
            order.id,
            order.submitted_by,
            order.total_quantity()
        );

        let approver_mailto = order_approval_mailto(&self.links, &order);
        Ok(Submission {
            record: order,
            approver_mailto,
        })
    }

    pub fn submit_nda(&mut self, recipient: NdaRecipient) -> Result<Submission<NdaRequest>, PortalError> {
        let request = NdaRequest::new(recipient, Utc::now())?;
        NDA_REQUESTS.append(&mut self.store, request.clone())?;
        log::info!(
            "NDA request {} submitted for {}",
            request.id,
            request.recipient.company_name
        );

        let approver_mailto = nda_approval_mailto(&self.links, &request);
        Ok(Submission {
            record: request,
            approver_mailto,
        })
    }

    pub fn decide_order(&mut self, id: &str, action: ApprovalAction) -> Result<DecisionOutcome, PortalError> {
        let links = &self.links;
        let now = Utc::now();

        BEVERAGE_ORDERS.update(&mut self.store, id, |order| {
            if !order.trail.is_pending() {
                log::info!("Order {id} already {}; ignoring {action}", order.status());
                return Ok(already_processed(order.status()));
            }

            match action {
                ApprovalAction::Deny => {
                    order
                        .trail
                        .advance(id, OrderStatus::Denied, "Order denied by approver", now)?;
                    log::info!("Order {id} denied");
                    Ok(DecisionOutcome::Denied)
                }
                ApprovalAction::Approve => {
                    order
                        .trail
                        .advance(id, OrderStatus::Approved, "Order approved by approver", now)?;
                    log::info!("Order {id} approved");
                    Ok(DecisionOutcome::OrderApproved {
                        vendor_mailto: vendor_order_mailto(links, order),
                    })
                }
            }
        })
    }

    pub fn decide_nda(&mut self, id: &str, action: ApprovalAction) -> Result<DecisionOutcome, PortalError> {
        let now = Utc::now();

        let approved = NDA_REQUESTS.update(&mut self.store, id, |request| {
            if !request.trail.is_pending() {
                log::info!("NDA request {id} already {}; ignoring {action}", request.status());
                return Ok(Err(already_processed(request.status())));
            }

            match action {
                ApprovalAction::Deny => {
                    request
                        .trail
                        .advance(id, NdaStatus::Denied, "Request denied by approver", now)?;
                    log::info!("NDA request {id} denied");
                    Ok(Err(DecisionOutcome::Denied))
                }
                ApprovalAction::Approve => {
                    request
                        .trail
                        .advance(id, NdaStatus::Approved, "Request approved", now)?;
                    log::info!("NDA request {id} approved");
                    Ok(Ok(request.recipient.clone()))
                }
            }
        })?;

        match approved {
            Ok(recipient) => self.dispatch(id, &recipient),
            Err(outcome) => Ok(outcome),
        }
    }

    /// Send the NDA again after a failed (or never attempted) dispatch
    pub fn retry_nda(&mut self, id: &str) -> Result<DecisionOutcome, PortalError> {
        let request = NDA_REQUESTS
            .get(&self.store, id)?
            .ok_or_else(|| PortalError::NotFound(id.to_string()))?;

        match request.status() {
            NdaStatus::Approved | NdaStatus::Error => {
                log::info!("Retrying NDA dispatch for {id}");
                self.dispatch(id, &request.recipient)
            }
            status => Err(PortalError::InvalidTransition {
                record: id.to_string(),
                from: status.as_str(),
                to: NdaStatus::Sent.as_str(),
            }),
        }
    }

    fn dispatch(&mut self, id: &str, recipient: &NdaRecipient) -> Result<DecisionOutcome, PortalError> {
        let result = match &self.signer {
            Ok(signer) => signer.send(recipient),
            Err(missing) => Err(PortalError::MissingConfig(missing.clone())),
        };
        let now = Utc::now();

        NDA_REQUESTS.update(&mut self.store, id, |request| match result {
            Ok(signature_request_id) => {
                let note = match &signature_request_id {
                    Some(sig) => format!("NDA sent for signature (request {sig})"),
                    None => "NDA sent for signature (provider returned no request id)".to_string(),
                };
                request.trail.advance(id, NdaStatus::Sent, note, now)?;
                request.signature_request_id = signature_request_id.clone();
                log::info!("NDA request {id} sent as {signature_request_id:?}");
                Ok(DecisionOutcome::Sent {
                    signature_request_id,
                })
            }
            Err(e) => {
                let message = match e {
                    PortalError::Provider { message, .. } => message,
                    other => other.to_string(),
                };
                request
                    .trail
                    .advance(id, NdaStatus::Error, message.clone(), now)?;
                log::error!("NDA request {id} dispatch failed: {message}");
                Ok(DecisionOutcome::DispatchFailed { message })
            }
        })
    }

    /// Record that the approved order email went out to the vendor
    pub fn mark_order_sent(&mut self, id: &str) -> Result<BeverageOrder, PortalError> {
        let now = Utc::now();
        BEVERAGE_ORDERS.update(&mut self.store, id, |order| {
            order
                .trail
                .advance(id, OrderStatus::Sent, "Order emailed to vendor", now)?;
            Ok(order.clone())
        })
    }

    /// Record that the signed NDA came back
    pub fn mark_nda_signed(&mut self, id: &str) -> Result<NdaRequest, PortalError> {
        let now = Utc::now();
        NDA_REQUESTS.update(&mut self.store, id, |request| {
            request
                .trail
                .advance(id, NdaStatus::Signed, "Signed NDA received", now)?;
            Ok(request.clone())
        })
    }

    /// Act on an approve/deny link as if it had been clicked
    pub fn follow(&mut self, link: &str) -> Result<DecisionOutcome, PortalError> {
        let link = ApprovalLink::parse(link)?;
        match link.resource {
            ApprovalResource::Beverage => self.decide_order(&link.id, link.action),
            ApprovalResource::Nda => self.decide_nda(&link.id, link.action),
        }
    }

    /// Beverage orders, newest first
    pub fn order_history(&self) -> Result<Vec<BeverageOrder>, PortalError> {
        let mut orders = BEVERAGE_ORDERS.load(&self.store)?;
        orders.reverse();
        Ok(orders)
    }

    /// NDA requests, newest first
    pub fn nda_history(&self) -> Result<Vec<NdaRequest>, PortalError> {
        let mut requests = NDA_REQUESTS.load(&self.store)?;
        requests.reverse();
        Ok(requests)
    }

    pub fn clear_orders(&mut self) -> Result<(), PortalError> {
        BEVERAGE_ORDERS.clear(&mut self.store)
    }

    pub fn clear_ndas(&mut self) -> Result<(), PortalError> {
        NDA_REQUESTS.clear(&mut self.store)
    }
}

fn already_processed<S: WorkflowStatus>(status: S) -> DecisionOutcome {
    DecisionOutcome::AlreadyProcessed {
        status: status.as_str().to_string(),
    }
}
