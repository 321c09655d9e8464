//! Requesting side of an association.
//!
//! Associations are requested through [`ClientAssociationOptions`],
//! which yields a [`ClientAssociation`] once the acceptor agrees
//! to at least one of the proposed presentation contexts.
use std::{
    borrow::Cow,
    io::Write,
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

use crate::{
    pdu::{
        read_pdu, write_pdu, AbortRQSource, AssociationAC, AssociationRJ, AssociationRQ,
        CommonExtendedNegotiation, ExtendedNegotiation, Pdu, RoleSelection, UserIdentityRQ,
        DEFAULT_MAX_PDU, DICOM_APPLICATION_CONTEXT_NAME, MAXIMUM_PDU_SIZE, MINIMUM_PDU_SIZE,
        PDU_HEADER_SIZE,
    },
    uid::trim_uid,
};
use snafu::{ensure, Backtrace, ResultExt, Snafu};
use tracing::{debug, info, warn};

use super::{retry::RetryPolicy, NegotiatedPresentationContext};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// missing abstract syntax to begin negotiation
    MissingAbstractSyntax { backtrace: Backtrace },

    /// invalid association request parameters
    InvalidRequest {
        #[snafu(backtrace)]
        source: crate::pdu::Error,
    },

    /// could not resolve the address of the server
    Resolve {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// could not connect to server
    Connect {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// could not set socket timeout
    SetTimeout {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// failed to send association request
    SendRequest {
        #[snafu(backtrace)]
        source: crate::pdu::writer::Error,
    },

    /// failed to receive association response
    ReceiveResponse {
        #[snafu(backtrace)]
        source: crate::pdu::reader::Error,
    },

    #[snafu(display("unexpected response from server `{}`", pdu.short_description()))]
    #[non_exhaustive]
    UnexpectedResponse {
        /// the PDU obtained from the server
        pdu: Box<Pdu>,
    },

    #[snafu(display("unknown response from server `{}`", pdu.short_description()))]
    #[non_exhaustive]
    UnknownResponse {
        /// the PDU obtained from the server, of variant Unknown
        pdu: Box<Pdu>,
    },

    #[snafu(display("protocol version mismatch: expected {}, got {}", expected, got))]
    ProtocolVersionMismatch {
        expected: u16,
        got: u16,
        backtrace: Backtrace,
    },

    #[snafu(display("association rejected by the server: {}", association_rj))]
    Rejected {
        association_rj: AssociationRJ,
        backtrace: Backtrace,
    },

    /// no presentation contexts accepted by the server
    NoAcceptedPresentationContexts { backtrace: Backtrace },

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

/// Options for requesting an association from another node,
/// typically a service class provider (SCP).
/// Establishing the association produces a [`ClientAssociation`].
///
/// # Example
///
/// ```no_run
/// # use dicom_ul_association::association::client::ClientAssociationOptions;
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let association = ClientAssociationOptions::new()
///    .with_presentation_context("1.2.840.10008.1.1", vec!["1.2.840.10008.1.2.1", "1.2.840.10008.1.2"])
///    .establish("129.168.0.5:104")?;
/// # Ok(())
/// # }
/// ```
///
/// The request needs at least one presentation context.
/// [`with_presentation_context`](Self::with_presentation_context)
/// takes the abstract syntax and its transfer syntaxes in order of preference,
/// whereas [`with_abstract_syntax`](Self::with_abstract_syntax)
/// proposes _Explicit VR Little Endian_ and then _Implicit VR Little Endian_.
///
/// User identity, role selection and extended negotiation items
/// are sent along with the request when given.
///
/// # Example
///
/// ```no_run
/// # use dicom_ul_association::association::client::ClientAssociationOptions;
/// # use dicom_ul_association::pdu::UserIdentityRQ;
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let association = ClientAssociationOptions::new()
///     .called_ae_title("STORE-SCP")
///     .with_abstract_syntax("1.2.840.10008.5.1.4.1.1.2")
///     .with_role_selection("1.2.840.10008.5.1.4.1.1.2", false, true)
///     .user_identity(UserIdentityRQ::username("alice").with_positive_response_requested(true))
///     .establish("129.168.0.5:104")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientAssociationOptions<'a> {
    calling_ae_title: Cow<'a, str>,
    called_ae_title: Option<Cow<'a, str>>,
    application_context_name: Cow<'a, str>,
    /// abstract syntax and transfer syntaxes of each proposed context
    presentation_contexts: Vec<(Cow<'a, str>, Vec<Cow<'a, str>>)>,
    /// SCP/SCU role selection items
    role_selections: Vec<RoleSelection>,
    /// SOP class extended negotiation items
    extended_negotiations: Vec<ExtendedNegotiation>,
    /// SOP class common extended negotiation items
    common_extended_negotiations: Vec<CommonExtendedNegotiation>,
    /// the user identity to negotiate
    user_identity: Option<UserIdentityRQ>,
    /// the expected protocol version
    protocol_version: u16,
    /// the maximum PDU length requested for receiving PDUs
    max_pdu_length: u32,
    /// asynchronous operations window (invoked, performed)
    max_ops: (u16, u16),
    /// whether to receive PDUs in strict mode
    strict: bool,
    /// timeout for establishing the TCP connection
    connection_timeout: Option<Duration>,
    /// timeout for reading from the TCP socket
    read_timeout: Option<Duration>,
    /// timeout for writing to the TCP socket
    write_timeout: Option<Duration>,
}

impl<'a> Default for ClientAssociationOptions<'a> {
    fn default() -> Self {
        ClientAssociationOptions {
            calling_ae_title: "THIS-SCU".into(),
            called_ae_title: None,
            application_context_name: DICOM_APPLICATION_CONTEXT_NAME.into(),
            presentation_contexts: Vec::new(),
            role_selections: Vec::new(),
            extended_negotiations: Vec::new(),
            common_extended_negotiations: Vec::new(),
            user_identity: None,
            protocol_version: 1,
            max_pdu_length: DEFAULT_MAX_PDU,
            max_ops: (1, 1),
            strict: true,
            connection_timeout: None,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl<'a> ClientAssociationOptions<'a> {
    /// Create a new set of options for establishing an association.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the AE title of this node (calling AE title).
    /// Defaults to `THIS-SCU`.
    pub fn calling_ae_title<T>(mut self, calling_ae_title: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        self.calling_ae_title = calling_ae_title.into();
        self
    }

    /// Set the AE title of the target node (called AE title).
    /// Defaults to `ANY-SCP`, which an empty string restores.
    pub fn called_ae_title<T>(mut self, called_ae_title: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        let cae = called_ae_title.into();
        if cae.is_empty() {
            self.called_ae_title = None;
        } else {
            self.called_ae_title = Some(cae);
        }
        self
    }

    /// Override the application context name.
    ///
    /// The default is the DICOM application context name.
    pub fn application_context_name<T>(mut self, application_context_name: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        self.application_context_name = trim_uid(application_context_name.into());
        self
    }

    /// Propose a presentation context for the given abstract syntax,
    /// listing the transfer syntaxes in order of preference.
    pub fn with_presentation_context<T>(
        mut self,
        abstract_syntax_uid: T,
        transfer_syntax_uids: Vec<T>,
    ) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        let transfer_syntaxes: Vec<Cow<'a, str>> = transfer_syntax_uids
            .into_iter()
            .map(|t| trim_uid(t.into()))
            .collect();
        self.presentation_contexts
            .push((trim_uid(abstract_syntax_uid.into()), transfer_syntaxes));
        self
    }

    /// Propose a presentation context for the given abstract syntax
    /// with the little endian uncompressed transfer syntaxes.
    pub fn with_abstract_syntax<T>(self, abstract_syntax_uid: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        let default_transfer_syntaxes: Vec<Cow<'a, str>> =
            vec!["1.2.840.10008.1.2.1".into(), "1.2.840.10008.1.2".into()];
        self.with_presentation_context(abstract_syntax_uid.into(), default_transfer_syntaxes)
    }

    /// Propose the roles of this node for the given SOP class.
    pub fn with_role_selection<T>(
        mut self,
        sop_class_uid: T,
        scu_role: bool,
        scp_role: bool,
    ) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        self.role_selections.push(RoleSelection::new(
            trim_uid(sop_class_uid.into()),
            scu_role,
            scp_role,
        ));
        self
    }

    /// Include service class application information for the given SOP class.
    pub fn with_extended_negotiation<T>(mut self, sop_class_uid: T, info: Vec<u8>) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        self.extended_negotiations.push(ExtendedNegotiation::new(
            trim_uid(sop_class_uid.into()),
            info,
        ));
        self
    }

    /// Include a common extended negotiation item.
    pub fn with_common_extended_negotiation(mut self, item: CommonExtendedNegotiation) -> Self {
        self.common_extended_negotiations.push(item);
        self
    }

    /// Negotiate this user identity.
    pub fn user_identity(mut self, user_identity: UserIdentityRQ) -> Self {
        self.user_identity = Some(user_identity);
        self
    }

    /// Negotiate a user identity by username.
    pub fn username(self, username: &str) -> Self {
        self.user_identity(UserIdentityRQ::username(username))
    }

    /// Negotiate a user identity by username and passcode.
    pub fn username_passcode(self, username: &str, passcode: &[char]) -> Self {
        self.user_identity(UserIdentityRQ::username_passcode(username, passcode))
    }

    /// Override the protocol version,
    /// which the acceptor is expected to echo back.
    pub fn protocol_version(mut self, protocol_version: u16) -> Self {
        self.protocol_version = protocol_version;
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

    /// Negotiate an asynchronous operations window.
    ///
    /// The default is one operation in each direction,
    /// in which case the window is not sent.
    pub fn async_ops_window(mut self, max_ops_invoked: u16, max_ops_performed: u16) -> Self {
        self.max_ops = (max_ops_invoked, max_ops_performed);
        self
    }

    /// In strict mode (the default),
    /// incoming PDUs longer than the maximum PDU length are refused.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the timeout for establishing the TCP connection.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout);
        self
    }

    /// Set the read timeout for the underlying TCP socket.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the write timeout for the underlying TCP socket.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Build the association request described by these options,
    /// without sending it.
    ///
    /// Presentation contexts receive consecutive odd identifiers
    /// in the order in which they were given.
    pub fn build_request(&self) -> Result<AssociationRQ> {
        // fail if no presentation contexts were provided: they represent intent,
        // should not be omitted by the user
        ensure!(
            !self.presentation_contexts.is_empty(),
            MissingAbstractSyntaxSnafu
        );

        let mut rq = AssociationRQ::new();
        rq.set_protocol_version(self.protocol_version);
        rq.set_calling_ae_title(&self.calling_ae_title)
            .context(InvalidRequestSnafu)?;
        rq.set_called_ae_title(self.called_ae_title.as_deref().unwrap_or("ANY-SCP"))
            .context(InvalidRequestSnafu)?;
        rq.set_application_context(self.application_context_name.to_string())
            .context(InvalidRequestSnafu)?;
        rq.set_max_pdu_length(self.max_pdu_length);
        rq.set_max_ops_invoked(self.max_ops.0);
        rq.set_max_ops_performed(self.max_ops.1);

        for (abstract_syntax, transfer_syntaxes) in &self.presentation_contexts {
            rq.add_presentation_context_with(
                abstract_syntax.to_string(),
                transfer_syntaxes.iter().map(|ts| ts.to_string()),
            )
            .context(InvalidRequestSnafu)?;
        }
        for item in &self.role_selections {
            rq.add_role_selection(item.clone());
        }
        for item in &self.extended_negotiations {
            rq.add_extended_negotiation(item.clone());
        }
        for item in &self.common_extended_negotiations {
            rq.add_common_extended_negotiation(item.clone());
        }
        rq.set_user_identity(self.user_identity.clone());

        Ok(rq)
    }

    /// Connect to the given address and request the association.
    pub fn establish<A: ToSocketAddrs>(self, address: A) -> Result<ClientAssociation> {
        let addresses = resolve(address)?;
        self.establish_impl(&addresses)
    }

    /// Request a new DICOM association like [`establish`](Self::establish),
    /// trying again while the acceptor rejects the request
    /// transiently due to congestion or local limits.
    ///
    /// Waits between attempts as dictated by the retry policy.
    /// Any other outcome is returned immediately.
    ///
    /// ```no_run
    /// # use dicom_ul_association::association::client::ClientAssociationOptions;
    /// # use dicom_ul_association::RetryPolicy;
    /// # fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let association = ClientAssociationOptions::new()
    ///     .with_abstract_syntax("1.2.840.10008.1.1")
    ///     .establish_with_retry("129.168.0.5:104", &RetryPolicy::with_max_attempts(5))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn establish_with_retry<A: ToSocketAddrs>(
        self,
        address: A,
        policy: &RetryPolicy,
    ) -> Result<ClientAssociation> {
        let addresses = resolve(address)?;
        let mut failed_attempts = 0;
        loop {
            match self.establish_impl(&addresses) {
                Err(Error::Rejected { association_rj, .. })
                    if association_rj.should_retry() && policy.allows(failed_attempts + 1) =>
                {
                    let delay = policy.delay_for_attempt(failed_attempts);
                    failed_attempts += 1;
                    warn!(
                        "Association rejected ({}), attempt {} of {}, retrying in {:?}",
                        association_rj, failed_attempts, policy.max_attempts, delay
                    );
                    std::thread::sleep(delay);
                }
                out => return out,
            }
        }
    }

    fn establish_impl(&self, addresses: &[SocketAddr]) -> Result<ClientAssociation> {
        let rq = self.build_request()?;

        let mut socket = connect(addresses, self.connection_timeout).context(ConnectSnafu)?;
        socket
            .set_read_timeout(self.read_timeout)
            .context(SetTimeoutSnafu)?;
        socket
            .set_write_timeout(self.write_timeout)
            .context(SetTimeoutSnafu)?;

        debug!("Requesting association: {}", rq);

        let mut buffer: Vec<u8> = Vec::with_capacity(rq.length() + 6);
        // send request
        write_pdu(&mut buffer, &Pdu::AssociationRQ(rq.clone())).context(SendRequestSnafu)?;
        socket.write_all(&buffer).context(WireSendSnafu)?;
        buffer.clear();

        // receive response
        let msg = read_pdu(&mut socket, MAXIMUM_PDU_SIZE, self.strict)
            .context(ReceiveResponseSnafu)?;

        match msg {
            Pdu::AssociationAC(ac) => {
                debug!("Association accepted: {}", ac);

                if ac.protocol_version() != self.protocol_version {
                    abort_connection(&mut socket, &mut buffer);
                    return ProtocolVersionMismatchSnafu {
                        expected: self.protocol_version,
                        got: ac.protocol_version(),
                    }
                    .fail();
                }

                // 0 means no limit
                let acceptor_max_pdu_length = if ac.max_pdu_length() == 0 {
                    MAXIMUM_PDU_SIZE
                } else {
                    ac.max_pdu_length()
                };

                let presentation_contexts = bind_presentation_contexts(&rq, &ac);
                if presentation_contexts.is_empty() {
                    abort_connection(&mut socket, &mut buffer);
                    return NoAcceptedPresentationContextsSnafu.fail();
                }

                Ok(ClientAssociation {
                    presentation_contexts,
                    requestor_max_pdu_length: self.max_pdu_length,
                    acceptor_max_pdu_length,
                    acknowledgement: ac,
                    socket,
                    buffer,
                    strict: self.strict,
                    closed: false,
                })
            }
            Pdu::AssociationRJ(association_rj) => {
                info!("Association rejected: {}", association_rj);
                RejectedSnafu { association_rj }.fail()
            }
            pdu @ Pdu::AbortRQ { .. }
            | pdu @ Pdu::ReleaseRQ
            | pdu @ Pdu::AssociationRQ(..)
            | pdu @ Pdu::PData { .. }
            | pdu @ Pdu::ReleaseRP => {
                abort_connection(&mut socket, &mut buffer);
                UnexpectedResponseSnafu { pdu }.fail()
            }
            pdu @ Pdu::Unknown { .. } => {
                abort_connection(&mut socket, &mut buffer);
                UnknownResponseSnafu { pdu }.fail()
            }
        }
    }
}

fn resolve<A: ToSocketAddrs>(address: A) -> Result<Vec<SocketAddr>> {
    Ok(address.to_socket_addrs().context(ResolveSnafu)?.collect())
}

/// Connect to the first reachable address.
fn connect(addresses: &[SocketAddr], timeout: Option<Duration>) -> std::io::Result<TcpStream> {
    let timeout = match timeout {
        Some(timeout) => timeout,
        None => return TcpStream::connect(addresses),
    };

    let mut last_error = None;
    for address in addresses {
        match TcpStream::connect_timeout(address, timeout) {
            Ok(socket) => return Ok(socket),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "could not resolve to any address",
        )
    }))
}

/// Send an A-ABORT, ignoring failures.
fn abort_connection(socket: &mut TcpStream, buffer: &mut Vec<u8>) {
    buffer.clear();
    let _ = write_pdu(
        buffer,
        &Pdu::AbortRQ {
            source: AbortRQSource::ServiceUser,
        },
    );
    let _ = socket.write_all(buffer);
    buffer.clear();
}

/// Bind the accepted presentation contexts of the acknowledgement
/// to the abstract syntaxes proposed in the request.
fn bind_presentation_contexts(
    rq: &AssociationRQ,
    ac: &AssociationAC,
) -> Vec<NegotiatedPresentationContext> {
    ac.presentation_contexts()
        .iter()
        .filter(|pc| pc.is_accepted())
        .filter_map(|pc| {
            let proposed = match rq.presentation_context(pc.id()) {
                Some(proposed) => proposed,
                None => {
                    warn!(
                        "Ignoring accepted presentation context #{} which was never proposed",
                        pc.id()
                    );
                    return None;
                }
            };
            let transfer_syntax = pc.transfer_syntax()?;
            if !proposed.contains_transfer_syntax(transfer_syntax) {
                warn!(
                    "Presentation context #{} accepted with transfer syntax {} which was not proposed",
                    pc.id(),
                    transfer_syntax
                );
            }
            Some(NegotiatedPresentationContext {
                id: pc.id(),
                abstract_syntax: proposed.abstract_syntax()?.to_string(),
                transfer_syntax: Some(transfer_syntax.to_string()),
                reason: pc.result(),
            })
        })
        .collect()
}

/// An established association, as seen by the requestor.
///
/// PDUs are exchanged with [`send`](Self::send) and [`receive`](Self::receive).
/// Dropping the value releases the association (A-RELEASE-RQ/RP)
/// unless [`release`](Self::release) or [`abort`](Self::abort) was called,
/// and closes the connection.
#[derive(Debug)]
pub struct ClientAssociation {
    /// accepted presentation contexts only
    presentation_contexts: Vec<NegotiatedPresentationContext>,
    requestor_max_pdu_length: u32,
    acceptor_max_pdu_length: u32,
    acknowledgement: AssociationAC,
    socket: TcpStream,
    /// reused for encoding outgoing PDUs
    buffer: Vec<u8>,
    strict: bool,
    /// whether the association was already released or aborted
    closed: bool,
}

impl ClientAssociation {
    /// The presentation contexts accepted by the acceptor.
    pub fn presentation_contexts(&self) -> &[NegotiatedPresentationContext] {
        &self.presentation_contexts
    }

    /// The maximum length of PDUs that may be sent to the acceptor.
    pub fn acceptor_max_pdu_length(&self) -> u32 {
        self.acceptor_max_pdu_length
    }

    /// The maximum length of PDUs this node announced it would receive.
    /// Longer PDUs are only refused in strict mode.
    pub fn requestor_max_pdu_length(&self) -> u32 {
        self.requestor_max_pdu_length
    }

    /// Retrieve the association acknowledgement sent by the acceptor.
    pub fn acknowledgement(&self) -> &AssociationAC {
        &self.acknowledgement
    }

    /// Retrieve the user identity server response, if the acceptor sent one.
    pub fn user_identity_response(&self) -> Option<&[u8]> {
        self.acknowledgement
            .user_identity()
            .map(|ui| ui.server_response())
    }

    /// Send a PDU to the acceptor.
    ///
    /// Fails without writing anything
    /// if the PDU exceeds the acceptor's maximum length.
    pub fn send(&mut self, msg: &Pdu) -> Result<()> {
        self.buffer.clear();
        write_pdu(&mut self.buffer, msg).context(SendSnafu)?;
        if self.buffer.len() > self.acceptor_max_pdu_length as usize + PDU_HEADER_SIZE as usize {
            return SendTooLongPduSnafu {
                length: self.buffer.len(),
            }
            .fail();
        }
        self.socket.write_all(&self.buffer).context(WireSendSnafu)
    }

    /// Wait for the next PDU from the acceptor.
    pub fn receive(&mut self) -> Result<Pdu> {
        read_pdu(&mut self.socket, self.requestor_max_pdu_length, self.strict).context(ReceiveSnafu)
    }

    /// Release the association (A-RELEASE-RQ, then wait for A-RELEASE-RP)
    /// and close the connection.
    /// The connection is closed even if the exchange fails.
    pub fn release(mut self) -> Result<()> {
        let out = self.release_impl();
        self.close();
        out
    }

    /// Abort the association as the service user and close the connection.
    pub fn abort(mut self) -> Result<()> {
        let pdu = Pdu::AbortRQ {
            source: AbortRQSource::ServiceUser,
        };
        let out = self.send(&pdu);
        self.close();
        out
    }

    /// The TCP stream to the acceptor.
    ///
    /// Reading or writing directly leaves the association in an unknown state
    /// unless it is done on PDU boundaries.
    pub fn inner_stream(&mut self) -> &mut TcpStream {
        &mut self.socket
    }

    fn release_impl(&mut self) -> Result<()> {
        let pdu = Pdu::ReleaseRQ;
        self.send(&pdu)?;
        let pdu = read_pdu(&mut self.socket, self.requestor_max_pdu_length, self.strict)
            .context(ReceiveSnafu)?;

        match pdu {
            Pdu::ReleaseRP => {}
            pdu @ Pdu::AbortRQ { .. }
            | pdu @ Pdu::AssociationAC(..)
            | pdu @ Pdu::AssociationRJ(..)
            | pdu @ Pdu::AssociationRQ(..)
            | pdu @ Pdu::PData { .. }
            | pdu @ Pdu::ReleaseRQ => return UnexpectedResponseSnafu { pdu }.fail(),
            pdu @ Pdu::Unknown { .. } => return UnknownResponseSnafu { pdu }.fail(),
        }
        Ok(())
    }

    fn close(&mut self) {
        let _ = self.socket.shutdown(std::net::Shutdown::Both);
        self.closed = true;
    }
}

impl Drop for ClientAssociation {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.release_impl();
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::{PresentationContext, PresentationContextResultReason};
    use dicom_dictionary_std::uids;
    use matches::matches;
    use rstest::rstest;

    #[test]
    fn request_from_options() {
        let rq = ClientAssociationOptions::new()
            .calling_ae_title("MY-SCU")
            .called_ae_title("STORE-SCP")
            .with_abstract_syntax(uids::VERIFICATION)
            .with_presentation_context(uids::CT_IMAGE_STORAGE, vec![uids::JPEG_BASELINE8_BIT])
            .with_role_selection(uids::CT_IMAGE_STORAGE, false, true)
            .async_ops_window(2, 1)
            .username("alice")
            .max_pdu_length(32_768)
            .build_request()
            .unwrap();

        assert_eq!(rq.calling_ae_title(), "MY-SCU");
        assert_eq!(rq.called_ae_title(), "STORE-SCP");
        assert_eq!(rq.max_pdu_length(), 32_768);
        assert!(rq.is_async_ops());
        assert_eq!(rq.number_of_presentation_contexts(), 2);

        let pc = rq.presentation_context(1).unwrap();
        assert_eq!(pc.abstract_syntax(), Some(uids::VERIFICATION));
        assert_eq!(
            pc.transfer_syntaxes(),
            &[
                uids::EXPLICIT_VR_LITTLE_ENDIAN.to_string(),
                uids::IMPLICIT_VR_LITTLE_ENDIAN.to_string()
            ]
        );
        let pc = rq.presentation_context(3).unwrap();
        assert_eq!(pc.abstract_syntax(), Some(uids::CT_IMAGE_STORAGE));

        assert_eq!(
            rq.role_selection(uids::CT_IMAGE_STORAGE),
            Some(&RoleSelection::new(uids::CT_IMAGE_STORAGE, false, true))
        );
        assert_eq!(
            rq.user_identity().and_then(|ui| ui.username_str()),
            Some("alice")
        );
    }

    #[rstest]
    #[case::zero(0, MINIMUM_PDU_SIZE)]
    #[case::too_small(1024, MINIMUM_PDU_SIZE)]
    #[case::in_range(8192, 8192)]
    #[case::too_large(1 << 20, MAXIMUM_PDU_SIZE)]
    fn max_pdu_length_is_clamped(#[case] value: u32, #[case] expected: u32) {
        let rq = ClientAssociationOptions::new()
            .with_abstract_syntax(uids::VERIFICATION)
            .max_pdu_length(value)
            .build_request()
            .unwrap();
        assert_eq!(rq.max_pdu_length(), expected);
    }

    #[test]
    fn default_called_ae_title() {
        let rq = ClientAssociationOptions::new()
            .called_ae_title("")
            .with_abstract_syntax(uids::VERIFICATION)
            .build_request()
            .unwrap();
        assert_eq!(rq.called_ae_title(), "ANY-SCP");
        assert_eq!(rq.calling_ae_title(), "THIS-SCU");
    }

    #[test]
    fn request_needs_presentation_contexts() {
        let out = ClientAssociationOptions::new().build_request();
        assert!(matches!(out, Err(Error::MissingAbstractSyntax { .. })));
    }

    #[test]
    fn invalid_ae_title_is_reported() {
        let out = ClientAssociationOptions::new()
            .calling_ae_title("THIS-AE-TITLE-IS-TOO-LONG")
            .with_abstract_syntax(uids::VERIFICATION)
            .build_request();
        assert!(matches!(out, Err(Error::InvalidRequest { .. })));
    }

    #[test]
    fn accepted_contexts_are_bound_to_abstract_syntaxes() {
        let mut rq = AssociationRQ::new();
        rq.add_presentation_context_with(uids::VERIFICATION, [uids::IMPLICIT_VR_LITTLE_ENDIAN])
            .unwrap();
        rq.add_presentation_context_with(uids::CT_IMAGE_STORAGE, [uids::JPEG_BASELINE8_BIT])
            .unwrap();

        let mut ac = AssociationAC::from_request(&rq);
        for pc in [
            PresentationContext::accepted(1, uids::IMPLICIT_VR_LITTLE_ENDIAN),
            PresentationContext::rejected(
                3,
                PresentationContextResultReason::TransferSyntaxesNotSupported,
            ),
            // never proposed
            PresentationContext::accepted(5, uids::IMPLICIT_VR_LITTLE_ENDIAN),
        ] {
            ac.add_presentation_context(pc).unwrap();
        }

        let negotiated = bind_presentation_contexts(&rq, &ac);
        assert_eq!(
            negotiated,
            vec![NegotiatedPresentationContext {
                id: 1,
                abstract_syntax: uids::VERIFICATION.to_string(),
                transfer_syntax: Some(uids::IMPLICIT_VR_LITTLE_ENDIAN.to_string()),
                reason: PresentationContextResultReason::Acceptance,
            }]
        );
    }
}
