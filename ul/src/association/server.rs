//! Accepting side of an association.
//!
//! An incoming TCP connection is handed to [`ServerAssociationOptions::establish`],
//! which answers the association request
//! and yields a [`ServerAssociation`] if it was accepted.
use std::borrow::Cow;
use std::time::Duration;
use std::{io::Write, net::TcpStream};

use dicom_encoding::transfer_syntax::TransferSyntaxIndex;
use dicom_transfer_syntax_registry::TransferSyntaxRegistry;
use snafu::{ensure, Backtrace, ResultExt, Snafu};
use tracing::{debug, info};

use crate::pdu::{
    read_pdu, write_pdu, AbortRQServiceProviderReason, AbortRQSource, AssociationAC,
    AssociationRJ, AssociationRJResult, AssociationRJServiceProviderASCEReason,
    AssociationRJServiceUserReason, AssociationRJSource, AssociationRQ, Pdu, PresentationContext,
    PresentationContextResultReason, UserIdentityAC, UserIdentityRQ, DEFAULT_MAX_PDU,
    DICOM_APPLICATION_CONTEXT_NAME, MAXIMUM_PDU_SIZE, MINIMUM_PDU_SIZE, PDU_HEADER_SIZE,
};
use crate::uid::trim_uid;

use super::NegotiatedPresentationContext;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// missing at least one abstract syntax to accept negotiations
    MissingAbstractSyntax { backtrace: Backtrace },

    /// could not set socket timeout
    SetTimeout {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// failed to receive association request
    ReceiveRequest {
        #[snafu(backtrace)]
        source: crate::pdu::reader::Error,
    },

    /// failed to send association response
    SendResponse {
        #[snafu(backtrace)]
        source: crate::pdu::writer::Error,
    },

    #[snafu(display("unexpected request from client `{}`", pdu.short_description()))]
    #[non_exhaustive]
    UnexpectedRequest {
        /// the PDU obtained from the client
        pdu: Box<Pdu>,
    },

    #[snafu(display("unknown request from client `{}`", pdu.short_description()))]
    #[non_exhaustive]
    UnknownRequest {
        /// the PDU obtained from the client, of variant Unknown
        pdu: Box<Pdu>,
    },

    #[snafu(display("association rejected: {}", association_rj))]
    Rejected {
        association_rj: AssociationRJ,
        backtrace: Backtrace,
    },

    /// association released by the client before being established
    Aborted { backtrace: Backtrace },

    /// failed to send PDU message
    #[non_exhaustive]
    Send {
        #[snafu(backtrace)]
        source: crate::pdu::writer::Error,
    },

    /// failed to send PDU message on wire
    #[non_exhaustive]
    WireSend {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display(
        "PDU is too large ({} bytes) to be sent to the remote application entity",
        length
    ))]
    #[non_exhaustive]
    SendTooLongPdu { length: usize, backtrace: Backtrace },

    /// failed to receive PDU message
    #[non_exhaustive]
    Receive {
        #[snafu(backtrace)]
        source: crate::pdu::reader::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Policy deciding which association requests are let through.
pub trait AccessControl {
    /// Decide on a request given the AE titles involved
    /// and the user identity presented, if any.
    ///
    /// A refusal carries the service user reason
    /// sent back in the A-ASSOCIATE-RJ.
    fn check_access(
        &self,
        this_ae_title: &str,
        calling_ae_title: &str,
        called_ae_title: &str,
        user_identity: Option<&UserIdentityRQ>,
    ) -> Result<(), AssociationRJServiceUserReason>;
}

/// An access control rule that accepts any incoming association request.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct AcceptAny;

impl AccessControl for AcceptAny {
    fn check_access(
        &self,
        _this_ae_title: &str,
        _calling_ae_title: &str,
        _called_ae_title: &str,
        _user_identity: Option<&UserIdentityRQ>,
    ) -> Result<(), AssociationRJServiceUserReason> {
        Ok(())
    }
}

/// An access control rule that accepts association requests
/// that match the called AE title with the node's AE title.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct AcceptCalledAeTitle;

impl AccessControl for AcceptCalledAeTitle {
    fn check_access(
        &self,
        this_ae_title: &str,
        _calling_ae_title: &str,
        called_ae_title: &str,
        _user_identity: Option<&UserIdentityRQ>,
    ) -> Result<(), AssociationRJServiceUserReason> {
        if this_ae_title == called_ae_title {
            Ok(())
        } else {
            Err(AssociationRJServiceUserReason::CalledAETitleNotRecognized)
        }
    }
}

/// Options for accepting associations, usually as a service class provider (SCP).
///
/// [`establish`](Self::establish) negotiates with one incoming connection
/// and yields a [`ServerAssociation`].
/// The same options may serve any number of connections.
///
/// Negotiation of each proposed presentation context:
/// - the abstract syntax must be one of those given through
///   [`with_abstract_syntax`](Self::with_abstract_syntax),
///   unless in [promiscuous](Self::promiscuous) mode;
/// - the first proposed transfer syntax which is known to the
///   [transfer syntax registry](dicom_transfer_syntax_registry)
///   and, if any were given through [`with_transfer_syntax`](Self::with_transfer_syntax),
///   is one of those, gets accepted.
///
/// Requests are screened by an [`AccessControl`] policy before negotiation.
/// [`AcceptAny`] is the default;
/// [`accept_called_ae_title`](Self::accept_called_ae_title) switches to [`AcceptCalledAeTitle`].
///
/// ## Example
///
/// ```no_run
/// # use std::net::TcpListener;
/// # use dicom_ul_association::association::server::ServerAssociationOptions;
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// # let tcp_listener: TcpListener = unimplemented!();
/// let scp_options = ServerAssociationOptions::new()
///    .with_abstract_syntax("1.2.840.10008.1.1")
///    .with_transfer_syntax("1.2.840.10008.1.2.1");
///
/// let (stream, _address) = tcp_listener.accept()?;
/// scp_options.establish(stream)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ServerAssociationOptions<'a, A> {
    ae_access_control: A,
    ae_title: Cow<'a, str>,
    application_context_name: Cow<'a, str>,
    abstract_syntax_uids: Vec<Cow<'a, str>>,
    /// empty to accept any supported transfer syntax
    transfer_syntax_uids: Vec<Cow<'a, str>>,
    max_pdu_length: u32,
    strict: bool,
    promiscuous: bool,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl Default for ServerAssociationOptions<'_, AcceptAny> {
    fn default() -> Self {
        ServerAssociationOptions {
            ae_access_control: AcceptAny,
            ae_title: "THIS-SCP".into(),
            application_context_name: DICOM_APPLICATION_CONTEXT_NAME.into(),
            abstract_syntax_uids: Vec::new(),
            transfer_syntax_uids: Vec::new(),
            max_pdu_length: DEFAULT_MAX_PDU,
            strict: true,
            promiscuous: false,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl ServerAssociationOptions<'_, AcceptAny> {
    /// Create a new set of options for establishing an association.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'a, A> ServerAssociationOptions<'a, A>
where
    A: AccessControl,
{
    /// Change the access control policy to accept any association
    /// regardless of the specified AE titles.
    ///
    /// This is the default behavior when the options are first created.
    pub fn accept_any(self) -> ServerAssociationOptions<'a, AcceptAny> {
        self.ae_access_control(AcceptAny)
    }

    /// Change the access control policy to accept an association
    /// if the called AE title matches this node's AE title.
    ///
    /// The default is to accept any requesting node
    /// regardless of the specified AE titles.
    pub fn accept_called_ae_title(self) -> ServerAssociationOptions<'a, AcceptCalledAeTitle> {
        self.ae_access_control(AcceptCalledAeTitle)
    }

    /// Change the access control policy.
    ///
    /// The default is to accept any requesting node
    /// regardless of the specified AE titles.
    pub fn ae_access_control<P>(self, access_control: P) -> ServerAssociationOptions<'a, P>
    where
        P: AccessControl,
    {
        let ServerAssociationOptions {
            ae_title,
            application_context_name,
            abstract_syntax_uids,
            transfer_syntax_uids,
            max_pdu_length,
            strict,
            promiscuous,
            ae_access_control: _,
            read_timeout,
            write_timeout,
        } = self;

        ServerAssociationOptions {
            ae_access_control: access_control,
            ae_title,
            application_context_name,
            abstract_syntax_uids,
            transfer_syntax_uids,
            max_pdu_length,
            strict,
            promiscuous,
            read_timeout,
            write_timeout,
        }
    }

    /// Set the AE title of this node. Defaults to `THIS-SCP`.
    pub fn ae_title<T>(mut self, ae_title: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        self.ae_title = ae_title.into();
        self
    }

    /// Accept presentation contexts for this abstract syntax.
    pub fn with_abstract_syntax<T>(mut self, abstract_syntax_uid: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        self.abstract_syntax_uids
            .push(trim_uid(abstract_syntax_uid.into()));
        self
    }

    /// Restrict the accepted transfer syntaxes to those given
    /// through this method.
    pub fn with_transfer_syntax<T>(mut self, transfer_syntax_uid: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        self.transfer_syntax_uids
            .push(trim_uid(transfer_syntax_uid.into()));
        self
    }

    /// Set the maximum length of PDUs this node is willing to receive.
    ///
    /// The value is clamped to the range supported by the PDU reader,
    /// from [`MINIMUM_PDU_SIZE`] to [`MAXIMUM_PDU_SIZE`].
    pub fn max_pdu_length(mut self, value: u32) -> Self {
        self.max_pdu_length = value.clamp(MINIMUM_PDU_SIZE, MAXIMUM_PDU_SIZE);
        self
    }

    /// In strict mode (the default),
    /// incoming PDUs longer than the maximum PDU length are refused.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// In promiscuous mode any abstract syntax is accepted.
    pub fn promiscuous(mut self, promiscuous: bool) -> Self {
        self.promiscuous = promiscuous;
        self
    }

    /// Set the read timeout for the underlying TCP socket
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the write timeout for the underlying TCP socket
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Read the association request from the given stream and answer it.
    ///
    /// Rejections and aborts are sent to the requestor
    /// before the corresponding error is returned.
    pub fn establish(&self, mut socket: TcpStream) -> Result<ServerAssociation> {
        ensure!(
            !self.abstract_syntax_uids.is_empty() || self.promiscuous,
            MissingAbstractSyntaxSnafu
        );

        socket
            .set_read_timeout(self.read_timeout)
            .context(SetTimeoutSnafu)?;
        socket
            .set_write_timeout(self.write_timeout)
            .context(SetTimeoutSnafu)?;

        let msg =
            read_pdu(&mut socket, self.max_pdu_length, self.strict).context(ReceiveRequestSnafu)?;
        let mut buffer: Vec<u8> = Vec::with_capacity(self.max_pdu_length as usize);

        match self.process_association_rq(msg) {
            Ok(Negotiated {
                ac,
                rq,
                presentation_contexts,
                requestor_max_pdu_length,
            }) => {
                write_pdu(&mut buffer, &Pdu::AssociationAC(ac)).context(SendResponseSnafu)?;
                socket.write_all(&buffer).context(WireSendSnafu)?;
                Ok(ServerAssociation {
                    presentation_contexts,
                    requestor_max_pdu_length,
                    acceptor_max_pdu_length: self.max_pdu_length,
                    socket,
                    client_ae_title: rq.calling_ae_title().to_string(),
                    request: rq,
                    buffer,
                    strict: self.strict,
                })
            }
            Err((pdu, err)) => {
                // send the rejection/abort PDU
                write_pdu(&mut buffer, &pdu).context(SendResponseSnafu)?;
                socket.write_all(&buffer).context(WireSendSnafu)?;
                Err(err)
            }
        }
    }

    /// Process an association request PDU.
    ///
    /// In the success case, returns the acknowledgement
    /// to be written back to the client
    /// and the outcome of the negotiation.
    ///
    /// In the error case, returns the rejection or abort PDU
    /// to be written back to the client
    /// and the error.
    #[allow(clippy::result_large_err)]
    fn process_association_rq(
        &self,
        msg: Pdu,
    ) -> std::result::Result<Negotiated, (Pdu, Error)> {
        let rq = match msg {
            Pdu::AssociationRQ(rq) => rq,
            Pdu::ReleaseRQ => return Err((Pdu::ReleaseRP, AbortedSnafu.build())),
            pdu @ Pdu::AssociationAC(..)
            | pdu @ Pdu::AssociationRJ(..)
            | pdu @ Pdu::PData { .. }
            | pdu @ Pdu::ReleaseRP
            | pdu @ Pdu::AbortRQ { .. } => {
                return Err((
                    Pdu::AbortRQ {
                        source: AbortRQSource::ServiceProvider(
                            AbortRQServiceProviderReason::UnexpectedPdu,
                        ),
                    },
                    UnexpectedRequestSnafu { pdu }.build(),
                ))
            }
            pdu @ Pdu::Unknown { .. } => {
                return Err((
                    Pdu::AbortRQ {
                        source: AbortRQSource::ServiceProvider(
                            AbortRQServiceProviderReason::UnrecognizedPdu,
                        ),
                    },
                    UnknownRequestSnafu { pdu }.build(),
                ))
            }
        };

        debug!("Received association request: {}", rq);

        // version 1 of the protocol is identified by bit 0
        if rq.protocol_version() & 0x0001 == 0 {
            return Err(reject(AssociationRJSource::ServiceProviderASCE(
                AssociationRJServiceProviderASCEReason::ProtocolVersionNotSupported,
            )));
        }

        if rq.application_context() != self.application_context_name {
            return Err(reject(AssociationRJSource::ServiceUser(
                AssociationRJServiceUserReason::ApplicationContextNameNotSupported,
            )));
        }

        if let Err(reason) = self.ae_access_control.check_access(
            &self.ae_title,
            rq.calling_ae_title(),
            rq.called_ae_title(),
            rq.user_identity(),
        ) {
            return Err(reject(AssociationRJSource::ServiceUser(reason)));
        }

        // treat 0 as practically unlimited,
        // so use the largest 32-bit unsigned number
        let requestor_max_pdu_length = if rq.max_pdu_length() == 0 {
            u32::MAX
        } else {
            rq.max_pdu_length()
        };

        let presentation_contexts: Vec<_> = rq
            .presentation_contexts()
            .iter()
            .map(|pc| self.negotiate_presentation_context(pc))
            .collect();

        let mut ac = AssociationAC::from_request(&rq);
        ac.set_max_pdu_length(self.max_pdu_length);
        // identifiers are echoed as proposed
        for pc in &presentation_contexts {
            ac.insert_presentation_context(match &pc.transfer_syntax {
                Some(ts) => PresentationContext::accepted(pc.id, ts.as_str()),
                None => PresentationContext::rejected(pc.id, pc.reason),
            });
        }

        // answer role selection for the abstract syntaxes accepted
        for rs in rq.role_selections() {
            if presentation_contexts
                .iter()
                .any(|pc| pc.is_accepted() && pc.abstract_syntax == rs.sop_class_uid)
            {
                ac.add_role_selection(rs.clone());
            }
        }

        if rq
            .user_identity()
            .map_or(false, |ui| ui.positive_response_requested())
        {
            ac.set_user_identity(Some(UserIdentityAC::new(Vec::new())));
        }

        debug!("Accepting association: {}", ac);

        Ok(Negotiated {
            ac,
            rq,
            presentation_contexts,
            requestor_max_pdu_length,
        })
    }

    fn negotiate_presentation_context(
        &self,
        pc: &PresentationContext,
    ) -> NegotiatedPresentationContext {
        let abstract_syntax = trim_uid(Cow::from(pc.abstract_syntax().unwrap_or_default()));
        if !self.promiscuous && !self.abstract_syntax_uids.iter().any(|uid| uid == &abstract_syntax)
        {
            return NegotiatedPresentationContext {
                id: pc.id(),
                abstract_syntax: abstract_syntax.to_string(),
                transfer_syntax: None,
                reason: PresentationContextResultReason::AbstractSyntaxNotSupported,
            };
        }

        match self.choose_ts(pc.transfer_syntaxes()) {
            Some(ts) => NegotiatedPresentationContext {
                id: pc.id(),
                abstract_syntax: abstract_syntax.to_string(),
                transfer_syntax: Some(ts.to_string()),
                reason: PresentationContextResultReason::Acceptance,
            },
            None => NegotiatedPresentationContext {
                id: pc.id(),
                abstract_syntax: abstract_syntax.to_string(),
                transfer_syntax: None,
                reason: PresentationContextResultReason::TransferSyntaxesNotSupported,
            },
        }
    }

    /// From a sequence of transfer syntaxes,
    /// choose the first transfer syntax to
    /// - be on the options' list of transfer syntaxes, and
    /// - be supported by the main transfer syntax registry.
    ///
    /// If the options' list is empty,
    /// accept the first transfer syntax supported.
    fn choose_ts<'t>(&self, transfer_syntaxes: &'t [String]) -> Option<&'t str> {
        transfer_syntaxes
            .iter()
            .map(|ts| ts.as_str())
            .find(|ts| {
                (self.transfer_syntax_uids.is_empty()
                    || self
                        .transfer_syntax_uids
                        .iter()
                        .any(|uid| uid == &trim_uid(Cow::from(*ts))))
                    && is_supported(ts)
            })
    }
}

/// Build the rejection PDU and error for the given source.
fn reject(source: AssociationRJSource) -> (Pdu, Error) {
    let association_rj = AssociationRJ::new(AssociationRJResult::Permanent, source);
    info!("Rejecting association: {}", association_rj);
    (
        Pdu::AssociationRJ(association_rj),
        RejectedSnafu { association_rj }.build(),
    )
}

/// The outcome of a successful negotiation.
struct Negotiated {
    ac: AssociationAC,
    rq: AssociationRQ,
    presentation_contexts: Vec<NegotiatedPresentationContext>,
    requestor_max_pdu_length: u32,
}

/// Check that the main transfer syntax registry
/// knows the given transfer syntax.
///
/// ```
/// # use dicom_ul_association::association::server::is_supported;
/// // Implicit VR Little Endian is guaranteed to be supported
/// assert!(is_supported("1.2.840.10008.1.2"));
/// ```
pub fn is_supported(ts_uid: &str) -> bool {
    TransferSyntaxRegistry.get(ts_uid).is_some()
}

/// An established association, as seen by the acceptor.
///
/// PDUs are exchanged with [`send`](Self::send) and [`receive`](Self::receive).
/// The requestor is expected to release the association;
/// dropping the value only closes the connection.
#[derive(Debug)]
pub struct ServerAssociation {
    /// every proposed context with its outcome, rejected ones included
    presentation_contexts: Vec<NegotiatedPresentationContext>,
    requestor_max_pdu_length: u32,
    acceptor_max_pdu_length: u32,
    socket: TcpStream,
    client_ae_title: String,
    request: AssociationRQ,
    /// reused for encoding outgoing PDUs
    buffer: Vec<u8>,
    strict: bool,
}

impl ServerAssociation {
    /// The outcome for each proposed presentation context,
    /// rejected ones included.
    pub fn presentation_contexts(&self) -> &[NegotiatedPresentationContext] {
        &self.presentation_contexts
    }

    /// The maximum length of PDUs this node accepts.
    pub fn acceptor_max_pdu_length(&self) -> u32 {
        self.acceptor_max_pdu_length
    }

    /// The maximum length of PDUs that may be sent to the requestor.
    pub fn requestor_max_pdu_length(&self) -> u32 {
        self.requestor_max_pdu_length
    }

    /// The calling AE title of the requestor.
    pub fn client_ae_title(&self) -> &str {
        &self.client_ae_title
    }

    /// The user identity presented by the requestor, if any.
    pub fn user_identity(&self) -> Option<&UserIdentityRQ> {
        self.request.user_identity()
    }

    /// The association request as received.
    pub fn request(&self) -> &AssociationRQ {
        &self.request
    }

    /// Send a PDU to the requestor,
    /// unless it exceeds the requestor's maximum length.
    pub fn send(&mut self, msg: &Pdu) -> Result<()> {
        self.buffer.clear();
        write_pdu(&mut self.buffer, msg).context(SendSnafu)?;
        if self.buffer.len()
            > self.requestor_max_pdu_length as usize + PDU_HEADER_SIZE as usize
        {
            return SendTooLongPduSnafu {
                length: self.buffer.len(),
            }
            .fail();
        }
        self.socket.write_all(&self.buffer).context(WireSendSnafu)
    }

    /// Wait for the next PDU from the requestor.
    pub fn receive(&mut self) -> Result<Pdu> {
        read_pdu(&mut self.socket, self.acceptor_max_pdu_length, self.strict).context(ReceiveSnafu)
    }

    /// Abort the association as the service provider
    /// and close the connection.
    pub fn abort(mut self) -> Result<()> {
        let pdu = Pdu::AbortRQ {
            source: AbortRQSource::ServiceProvider(
                AbortRQServiceProviderReason::ReasonNotSpecified,
            ),
        };
        let out = self.send(&pdu);
        let _ = self.socket.shutdown(std::net::Shutdown::Both);
        out
    }

    /// The TCP stream to the requestor.
    ///
    /// Reading or writing directly leaves the association in an unknown state
    /// unless it is done on PDU boundaries.
    pub fn inner_stream(&mut self) -> &mut TcpStream {
        &mut self.socket
    }
}

impl Drop for ServerAssociation {
    fn drop(&mut self) {
        let _ = self.socket.shutdown(std::net::Shutdown::Both);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::{RoleSelection, UserIdentityRQ};
    use dicom_dictionary_std::uids;
    use matches::matches;

    fn echo_request() -> AssociationRQ {
        let mut rq = AssociationRQ::new();
        rq.set_calling_ae_title("ECHO-SCU").unwrap();
        rq.set_called_ae_title("THIS-SCP").unwrap();
        rq.add_presentation_context_with(
            uids::VERIFICATION,
            [uids::EXPLICIT_VR_LITTLE_ENDIAN, uids::IMPLICIT_VR_LITTLE_ENDIAN],
        )
        .unwrap();
        rq
    }

    fn rejection(out: std::result::Result<Negotiated, (Pdu, Error)>) -> (u8, u8, u8) {
        match out {
            Err((Pdu::AssociationRJ(rj), Error::Rejected { association_rj, .. })) => {
                assert_eq!(rj, association_rj);
                rj.codes()
            }
            Err((pdu, err)) => panic!("unexpected outcome {:?}: {}", pdu, err),
            Ok(_) => panic!("association was not rejected"),
        }
    }

    #[test]
    fn accept_verification() {
        let options = ServerAssociationOptions::new().with_abstract_syntax(uids::VERIFICATION);
        let negotiated = options
            .process_association_rq(Pdu::AssociationRQ(echo_request()))
            .unwrap_or_else(|(_, e)| panic!("{}", e));

        assert_eq!(negotiated.requestor_max_pdu_length, DEFAULT_MAX_PDU);
        assert_eq!(
            negotiated.presentation_contexts,
            vec![NegotiatedPresentationContext {
                id: 1,
                abstract_syntax: uids::VERIFICATION.to_string(),
                transfer_syntax: Some(uids::EXPLICIT_VR_LITTLE_ENDIAN.to_string()),
                reason: PresentationContextResultReason::Acceptance,
            }]
        );

        let ac = negotiated.ac;
        assert_eq!(ac.calling_ae_title(), "ECHO-SCU");
        assert_eq!(ac.called_ae_title(), "THIS-SCP");
        let pc = ac.presentation_context(1).unwrap();
        assert!(pc.is_accepted());
        assert_eq!(pc.transfer_syntax(), Some(uids::EXPLICIT_VR_LITTLE_ENDIAN));
        assert!(ac.user_identity().is_none());
    }

    #[test]
    fn max_pdu_length_is_clamped() {
        for (value, expected) in [
            (0, MINIMUM_PDU_SIZE),
            (8192, 8192),
            (u32::MAX, MAXIMUM_PDU_SIZE),
        ] {
            let options = ServerAssociationOptions::new()
                .with_abstract_syntax(uids::VERIFICATION)
                .max_pdu_length(value);
            let negotiated = options
                .process_association_rq(Pdu::AssociationRQ(echo_request()))
                .unwrap_or_else(|(_, e)| panic!("{}", e));
            assert_eq!(negotiated.ac.max_pdu_length(), expected);
        }
    }

    #[test]
    fn reject_unsupported_protocol_version() {
        let options = ServerAssociationOptions::new().with_abstract_syntax(uids::VERIFICATION);
        let mut rq = echo_request();
        rq.set_protocol_version(2);
        assert_eq!(
            rejection(options.process_association_rq(Pdu::AssociationRQ(rq))),
            (1, 2, 2)
        );

        // other bits are tolerated
        let mut rq = echo_request();
        rq.set_protocol_version(3);
        assert!(options
            .process_association_rq(Pdu::AssociationRQ(rq))
            .is_ok());
    }

    #[test]
    fn reject_foreign_application_context() {
        let options = ServerAssociationOptions::new().with_abstract_syntax(uids::VERIFICATION);
        let mut rq = echo_request();
        rq.set_application_context("1.2.3.4.5").unwrap();
        assert_eq!(
            rejection(options.process_association_rq(Pdu::AssociationRQ(rq))),
            (1, 1, 2)
        );
    }

    #[test]
    fn reject_wrong_called_ae_title() {
        let options = ServerAssociationOptions::new()
            .accept_called_ae_title()
            .ae_title("STORE-SCP")
            .with_abstract_syntax(uids::VERIFICATION);
        assert_eq!(
            rejection(options.process_association_rq(Pdu::AssociationRQ(echo_request()))),
            (1, 1, 7)
        );

        let options = options.ae_title("THIS-SCP");
        assert!(options
            .process_association_rq(Pdu::AssociationRQ(echo_request()))
            .is_ok());
    }

    struct RequireUsername;

    impl AccessControl for RequireUsername {
        fn check_access(
            &self,
            _this_ae_title: &str,
            _calling_ae_title: &str,
            _called_ae_title: &str,
            user_identity: Option<&UserIdentityRQ>,
        ) -> Result<(), AssociationRJServiceUserReason> {
            match user_identity.and_then(|ui| ui.username_str()) {
                Some("alice") => Ok(()),
                _ => Err(AssociationRJServiceUserReason::NoReasonGiven),
            }
        }
    }

    #[test]
    fn custom_access_control_with_user_identity() {
        let options = ServerAssociationOptions::new()
            .ae_access_control(RequireUsername)
            .with_abstract_syntax(uids::VERIFICATION);

        assert_eq!(
            rejection(options.process_association_rq(Pdu::AssociationRQ(echo_request()))),
            (1, 1, 1)
        );

        let mut rq = echo_request();
        rq.set_user_identity(Some(
            UserIdentityRQ::username("alice").with_positive_response_requested(true),
        ));
        let negotiated = options
            .process_association_rq(Pdu::AssociationRQ(rq))
            .unwrap_or_else(|(_, e)| panic!("{}", e));
        assert_eq!(
            negotiated.ac.user_identity().map(|ui| ui.server_response()),
            Some(&[][..])
        );
    }

    #[test]
    fn negotiate_transfer_syntaxes() {
        let options = ServerAssociationOptions::new()
            .with_abstract_syntax(uids::VERIFICATION)
            .with_abstract_syntax(uids::CT_IMAGE_STORAGE)
            .with_transfer_syntax(uids::IMPLICIT_VR_LITTLE_ENDIAN);

        let mut rq = echo_request();
        rq.add_presentation_context_with(uids::CT_IMAGE_STORAGE, [uids::JPEG_BASELINE8_BIT])
            .unwrap();
        rq.add_presentation_context_with(
            uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND,
            [uids::IMPLICIT_VR_LITTLE_ENDIAN],
        )
        .unwrap();
        rq.add_role_selection(RoleSelection::new(uids::CT_IMAGE_STORAGE, false, true));
        rq.add_role_selection(RoleSelection::new(uids::VERIFICATION, true, true));

        let negotiated = options
            .process_association_rq(Pdu::AssociationRQ(rq))
            .unwrap_or_else(|(_, e)| panic!("{}", e));

        let reasons: Vec<_> = negotiated
            .presentation_contexts
            .iter()
            .map(|pc| (pc.id, pc.reason, pc.transfer_syntax.as_deref()))
            .collect();
        assert_eq!(
            reasons,
            vec![
                (
                    1,
                    PresentationContextResultReason::Acceptance,
                    Some(uids::IMPLICIT_VR_LITTLE_ENDIAN)
                ),
                (
                    3,
                    PresentationContextResultReason::TransferSyntaxesNotSupported,
                    None
                ),
                (
                    5,
                    PresentationContextResultReason::AbstractSyntaxNotSupported,
                    None
                ),
            ]
        );

        // rejected contexts carry no transfer syntax
        let ac = negotiated.ac;
        assert_eq!(ac.presentation_context(3).unwrap().transfer_syntax(), None);

        // only roles for accepted abstract syntaxes are answered
        assert_eq!(ac.role_selections().len(), 1);
        assert_eq!(ac.role_selections()[0].sop_class_uid, uids::VERIFICATION);
    }

    #[test]
    fn promiscuous_mode_accepts_any_abstract_syntax() {
        let options = ServerAssociationOptions::new().promiscuous(true);
        let mut rq = AssociationRQ::new();
        rq.add_presentation_context_with("1.2.3.4.5.6", [uids::IMPLICIT_VR_LITTLE_ENDIAN])
            .unwrap();
        let negotiated = options
            .process_association_rq(Pdu::AssociationRQ(rq))
            .unwrap_or_else(|(_, e)| panic!("{}", e));
        assert!(negotiated.presentation_contexts[0].is_accepted());
    }

    #[test]
    fn unexpected_pdu_is_aborted() {
        let options = ServerAssociationOptions::new().with_abstract_syntax(uids::VERIFICATION);
        let out = options.process_association_rq(Pdu::ReleaseRP);
        assert!(matches!(
            out,
            Err((
                Pdu::AbortRQ {
                    source: AbortRQSource::ServiceProvider(
                        AbortRQServiceProviderReason::UnexpectedPdu
                    )
                },
                Error::UnexpectedRequest { .. }
            ))
        ));

        let out = options.process_association_rq(Pdu::ReleaseRQ);
        assert!(matches!(out, Err((Pdu::ReleaseRP, Error::Aborted { .. }))));
    }

    #[test]
    fn supported_transfer_syntaxes() {
        assert!(is_supported(uids::IMPLICIT_VR_LITTLE_ENDIAN));
        assert!(is_supported(uids::EXPLICIT_VR_LITTLE_ENDIAN));
        assert!(!is_supported("1.2.3.4"));
    }
}
