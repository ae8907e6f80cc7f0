pub mod admission;
pub mod availability;
pub mod booking;
pub mod conflict;
pub mod error;
pub mod identity;
pub mod policy;
pub mod repository;
pub mod resource;
pub mod slot;

pub use error::{CoreError, CoreResult, DenyReason};
pub use slot::Slot;
