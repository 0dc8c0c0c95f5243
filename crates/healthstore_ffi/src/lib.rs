//! Flutter-facing bindings for the health store.

pub mod api;
