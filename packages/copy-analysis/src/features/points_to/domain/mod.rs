//! Points-to domain: address-sharing facts

pub mod address_shared;

pub use address_shared::AddressSharedEntities;
