//! # Armature error infrastructure
//!
//! Cross-cutting pieces every other crate leans on when something goes
//! wrong:
//!
//! - [`ErrorId`] — an 8-byte random correlation token that ties a public
//!   error message to its full-detail audit record.
//! - [`audit`] — the three-sink audit trail (public / internal / security).
//!   One call fans an error out to all three sinks without leaking secret
//!   material into the public or internal ones.
//! - [`timing`] — constant-time comparison and a minimum-elapsed-time guard,
//!   used wherever an attacker could learn something from how fast we fail.
//!
//! Individual crates define their own `thiserror` enums; this crate only
//! carries what has to be shared.

pub mod audit;
mod id;
pub mod timing;

pub use id::ErrorId;
