//! This crate implements the association layer
//! of the DICOM upper layer protocol:
//! the negotiation, maintenance and tear down of associations
//! between DICOM application entities.
//!
//! - The [`pdu`] module
//!   provides the protocol data units (PDUs)
//!   and the items negotiated through them
//!   (presentation contexts, role selection, extended negotiation,
//!   user identity),
//!   together with a bit exact PDU reader and writer.
//!   The encoded length of association requests and acknowledgements
//!   is known before encoding.
//! - The [`association`] module
//!   comprises a blocking association requester and acceptor over TCP.
//!   An association rejection is reported as an error value
//!   carrying the full result, source and reason triple.
//! - The [`uid`] module
//!   holds UID helpers, including name lookup for diagnostics.

pub mod association;
pub mod pdu;
pub mod uid;

/// The implementation class UID of this crate.
///
/// Generated as per the standard, part 5, section B.2.
///
/// This UID may change in future versions,
/// even between patch versions.
pub const IMPLEMENTATION_CLASS_UID: &str = "2.25.307496217548327016813520441829736590127";

/// The implementation version name of this crate.
///
/// This name may change in future versions,
/// even between patch versions.
pub const IMPLEMENTATION_VERSION_NAME: &str = "DICOM-UL 0.1.0";

// re-exports

pub use association::client::{ClientAssociation, ClientAssociationOptions};
pub use association::retry::RetryPolicy;
pub use association::server::{ServerAssociation, ServerAssociationOptions};
pub use pdu::read_pdu;
pub use pdu::write_pdu;
pub use pdu::{AssociationAC, AssociationRJ, AssociationRQ, Pdu, PresentationContext};
