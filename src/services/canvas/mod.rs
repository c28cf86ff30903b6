pub mod decision;
pub mod dialog;
pub mod gatekeeper;
pub mod signed_request;

pub use gatekeeper::{CanvasRequest, CanvasUser, Disposition, Gatekeeper, Interceptor, RejectReason};
