//! DICOM association module
//!
//! This module contains utilities for establishing associations
//! between DICOM nodes via TCP/IP.
//!
//! As an association requester, often as a service class user (SCU),
//! a new association can be started
//! via the [`ClientAssociationOptions`][1] type.
//! The minimum required properties are the proposed abstract syntaxes
//! and the TCP socket address to the target node.
//! Requests rejected transiently because of congestion on the acceptor's side
//! may be attempted again following a [`RetryPolicy`][4].
//!
//! As an association acceptor,
//! usually taking the role of a service class provider (SCP),
//! a newly created [TCP stream][2] can be passed to
//! a previously prepared [`ServerAssociationOptions`][3].
//!
//! [1]: crate::association::client::ClientAssociationOptions
//! [2]: std::net::TcpStream
//! [3]: crate::association::server::ServerAssociationOptions
//! [4]: crate::association::retry::RetryPolicy
use std::fmt;

use crate::pdu::PresentationContextResultReason;
use crate::uid::describe_uid;

pub mod client;
pub mod retry;
pub mod server;

pub use client::{ClientAssociation, ClientAssociationOptions};
pub use retry::RetryPolicy;
pub use server::{
    AcceptAny, AcceptCalledAeTitle, AccessControl, ServerAssociation, ServerAssociationOptions,
};

/// The outcome of negotiating one presentation context,
/// bound to the abstract syntax that was proposed for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NegotiatedPresentationContext {
    /// the presentation context identifier
    pub id: u8,
    /// the proposed abstract syntax
    pub abstract_syntax: String,
    /// the accepted transfer syntax,
    /// absent if the context was rejected
    pub transfer_syntax: Option<String>,
    /// the negotiation result
    pub reason: PresentationContextResultReason,
}

impl NegotiatedPresentationContext {
    pub fn is_accepted(&self) -> bool {
        self.reason == PresentationContextResultReason::Acceptance
    }
}

impl fmt::Display for NegotiatedPresentationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {}: {}",
            self.id,
            describe_uid(&self.abstract_syntax),
            self.reason
        )?;
        if let Some(ts) = &self.transfer_syntax {
            write!(f, " ({})", describe_uid(ts))?;
        }
        Ok(())
    }
}
