//! # restgate-policy
//!
//! Column-level write governance ("padlocks").
//!
//! Each governed column carries a [`LockLevel`]. Before a write is compiled,
//! every row of the payload passes through [`apply_locks`]:
//!
//! | Lock level | Insert | Update |
//! |------------|--------|--------|
//! | `unlocked` | kept | kept |
//! | `immutable` | stripped | stripped |
//! | `insert_only` | kept | stripped |
//! | `service_role_only` | kept for `service_role` only | kept for `service_role` only |
//!
//! Stripping never fails the request. The key is removed from the row and a
//! [`SecurityEvent`] is recorded, so a caller probing a locked column sees a
//! successful write without learning which columns are protected.

pub mod padlock;

pub use padlock::{Governed, GovernanceContext, apply_locks, is_stripped};
pub use restgate_core::{LockLevel, LockMap, SecurityEvent, WriteOperation};
