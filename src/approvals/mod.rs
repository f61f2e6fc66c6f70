//! Approval workflows for beverage orders and NDA requests
//!
//! Records live in a local key/value store. A human approves or denies each
//! submission by following a link from an email; NDA approvals then go out to
//! the signature provider.

pub mod desk;
pub mod links;
pub mod records;
pub mod status;
pub mod store;

pub use desk::{ApprovalDesk, DecisionOutcome, NdaSigner, Submission};
pub use links::{mailto, ApprovalAction, ApprovalLink, ApprovalResource, LinkSettings};
pub use records::{BeverageOrder, NdaRequest, OrderItem, OrderLine};
pub use status::{NdaStatus, OrderStatus, StatusEntry, StatusTrail, WorkflowStatus};
pub use store::{
    Identified, JsonFileStore, KeyValueStore, MemoryStore, RecordList, BEVERAGE_ORDERS,
    BEVERAGE_ORDER_CAP, NDA_REQUESTS,
};
