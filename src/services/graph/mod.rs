pub mod client;
pub mod permissions;

pub use client::{GraphClient, RemoteError};
pub use permissions::{PermissionFetcher, PermissionSet};
