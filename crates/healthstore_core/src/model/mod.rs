//! Domain records persisted by the health store.
//!
//! # Responsibility
//! - Define the value types exchanged with store callers.
//! - Own field-level invariants checked before every write.
//!
//! # Invariants
//! - Records cross the store boundary by value; callers never hold row handles.
//! - Optional measurements are `None`, never sentinel numbers.

pub mod almanac;
pub mod health_record;
pub mod reading;
pub mod user_profile;
pub mod validation;

/// Row identity of a health record. `0` on insert requests a new identity.
pub type RecordId = i64;

/// Caller-assigned identity of a user profile.
pub type UserId = i64;
