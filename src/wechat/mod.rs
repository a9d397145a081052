//! Outbound WeChat Open Platform API plumbing.
//!
//! `client` talks to the component-level APIs (tokens, authorizer lookup,
//! pre-authorization); `authorizer` wraps a resolved refresh token into a
//! handle scoped to one mini-program, exposing one capability struct per
//! sub-product API family.

pub mod authorizer;
pub mod client;

pub use authorizer::{resolve, SubApplication};
pub use client::ComponentClient;
