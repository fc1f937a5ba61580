mod contact;
mod factory;
mod manager;

pub use contact::{Contact, ContactKind};
pub(crate) use manager::ContactManager;
