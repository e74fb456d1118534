//! Domain models for the healthcare warehouse.

mod batch;
mod claim;
mod entity;
mod patient;
mod prescription;
mod provider;
mod raw;
mod reference;

pub use batch::*;
pub use claim::*;
pub use entity::*;
pub use patient::*;
pub use prescription::*;
pub use provider::*;
pub use raw::*;
pub use reference::*;
