//! # courier-core
//!
//! Foundation types for the courier notification server.
//!
//! This crate provides the shared vocabulary the server crates depend on:
//!
//! - **Branded IDs**: `UserId`, `NotificationId`, `ConnectionId` as newtypes for type safety
//! - **Notification model**: `Notification` with read/unread status and target kind
//! - **Errors**: `DispatchError` via `thiserror`, wire error codes

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod notification;

pub use errors::DispatchError;
pub use ids::{ConnectionId, NotificationId, UserId};
pub use notification::{Notification, NotificationStatus, Target};
