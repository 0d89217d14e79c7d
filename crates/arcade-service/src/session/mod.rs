//! Session store.

pub mod store;

pub use store::SessionStore;
