//! Protocol Data Unit module
//!
//! This module comprises the data structures representing
//! the protocol data units (PDUs) of the upper layer protocol
//! and the items negotiated through them,
//! as well as readers and writers of PDUs from arbitrary data sources.
//!
//! Association requests and acknowledgements share their parameters
//! through [`AssociationParameters`],
//! which also knows the exact encoded length of the PDU
//! (see [`AssociationRQ::length`] and [`AssociationAC::length`]).
pub mod negotiation;
pub mod parameters;
pub mod presentation_context;
pub mod reader;
pub mod reject;
pub mod user_identity;
pub mod writer;

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU8, Ordering};

use dicom_encoding::text::{DefaultCharacterSetCodec, TextCodec};
use snafu::{ensure, Backtrace, Snafu};

pub use negotiation::{CommonExtendedNegotiation, ExtendedNegotiation, RoleSelection};
pub use parameters::{
    AssociationParameters, DEFAULT_AE_TITLE, DICOM_APPLICATION_CONTEXT_NAME,
    MAX_AE_TITLE_LENGTH, MAX_PRESENTATION_CONTEXTS,
};
pub use presentation_context::{
    result_code_as_str, PresentationContext, PresentationContextResultReason,
};
pub use reader::{
    read_pdu, DEFAULT_MAX_PDU, MAXIMUM_PDU_SIZE, MINIMUM_PDU_SIZE, PDU_HEADER_SIZE,
};
pub use reject::{
    AssociationRJ, AssociationRJResult, AssociationRJServiceProviderASCEReason,
    AssociationRJServiceProviderPresentationReason, AssociationRJServiceUserReason,
    AssociationRJSource,
};
pub use user_identity::{UserIdentityAC, UserIdentityRQ, UserIdentityType};
pub use writer::write_pdu;

/// An error in the construction of association parameters.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display(
        "AE title `{}` is too long ({} characters, maximum is {})",
        ae_title,
        ae_title.chars().count(),
        MAX_AE_TITLE_LENGTH
    ))]
    InvalidAeTitle {
        ae_title: String,
        backtrace: Backtrace,
    },

    #[snafu(display(
        "{} `{}` is not representable in the default character set",
        field,
        text
    ))]
    UnencodableText {
        field: &'static str,
        text: String,
        backtrace: Backtrace,
    },

    #[snafu(display("Missing {}", field))]
    MissingUid {
        field: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("Reserved field must be 32 bytes long, got {}", length))]
    InvalidReservedLength { length: usize, backtrace: Backtrace },

    #[snafu(display("Transfer syntax UID must not be empty"))]
    EmptyTransferSyntax { backtrace: Backtrace },

    #[snafu(display(
        "No presentation context identifier available, all {} are in use",
        MAX_PRESENTATION_CONTEXTS
    ))]
    PresentationContextIdsExhausted { backtrace: Backtrace },

    #[snafu(display("Invalid presentation context identifier {} (must be odd)", id))]
    InvalidPresentationContextId { id: u8, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Check that `text` can be written in the default character set.
pub(crate) fn check_text(field: &'static str, text: &str) -> Result<()> {
    ensure!(
        DefaultCharacterSetCodec.encode(text).is_ok(),
        UnencodableTextSnafu { field, text }
    );
    Ok(())
}

/// The number of bytes taken by `text` once encoded.
///
/// The default character set takes one byte per character.
pub(crate) fn text_length(text: &str) -> usize {
    text.chars().count()
}

/// An association request (A-ASSOCIATE-RQ).
///
/// Dereferences to the [`AssociationParameters`] it carries,
/// so AE titles, presentation contexts and negotiation items
/// are reached directly.
///
/// ```
/// # use dicom_ul_association::pdu::AssociationRQ;
/// let mut rq = AssociationRQ::new();
/// rq.set_called_ae_title("STORE-SCP")?;
/// let id = rq.add_presentation_context_with(
///     "1.2.840.10008.1.1",
///     ["1.2.840.10008.1.2"],
/// )?;
/// assert_eq!(id, 1);
/// assert_eq!(rq.next_pc_id()?, 3);
/// # Ok::<_, dicom_ul_association::pdu::Error>(())
/// ```
#[derive(Debug)]
pub struct AssociationRQ {
    params: AssociationParameters,
    user_identity: Option<UserIdentityRQ>,
    /// the last presentation context identifier handed out
    pc_id_cursor: AtomicU8,
}

impl Default for AssociationRQ {
    fn default() -> Self {
        AssociationRQ::new()
    }
}

impl Clone for AssociationRQ {
    fn clone(&self) -> Self {
        AssociationRQ {
            params: self.params.clone(),
            user_identity: self.user_identity.clone(),
            pc_id_cursor: AtomicU8::new(self.pc_id_cursor.load(Ordering::Relaxed)),
        }
    }
}

impl PartialEq for AssociationRQ {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params && self.user_identity == other.user_identity
    }
}

impl Eq for AssociationRQ {}

impl AssociationRQ {
    pub fn new() -> Self {
        AssociationRQ::from_parameters(AssociationParameters::default())
    }

    pub fn from_parameters(params: AssociationParameters) -> Self {
        AssociationRQ {
            params,
            user_identity: None,
            pc_id_cursor: AtomicU8::new(u8::MAX),
        }
    }

    pub fn parameters(&self) -> &AssociationParameters {
        &self.params
    }

    pub fn user_identity(&self) -> Option<&UserIdentityRQ> {
        self.user_identity.as_ref()
    }

    pub fn set_user_identity(&mut self, user_identity: Option<UserIdentityRQ>) {
        self.user_identity = user_identity;
    }

    /// Allocate a presentation context identifier
    /// which is not yet used in this request.
    ///
    /// Identifiers are odd, handed out in increasing order
    /// and wrap around after 255.
    /// This method may be called from multiple threads,
    /// each call yields a different identifier
    /// as long as no context is added or removed in the meantime.
    pub fn next_pc_id(&self) -> Result<u8> {
        ensure!(
            self.params.number_of_presentation_contexts() < MAX_PRESENTATION_CONTEXTS,
            PresentationContextIdsExhaustedSnafu
        );
        let mut current = self.pc_id_cursor.load(Ordering::Acquire);
        loop {
            let mut id = current.wrapping_add(2);
            while self.params.presentation_context(id).is_some() {
                id = id.wrapping_add(2);
            }
            match self.pc_id_cursor.compare_exchange_weak(
                current,
                id,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(id),
                Err(actual) => current = actual,
            }
        }
    }

    /// Propose a new presentation context
    /// under a freshly allocated identifier,
    /// which is returned.
    pub fn add_presentation_context_with<I, T>(
        &mut self,
        abstract_syntax: impl Into<String>,
        transfer_syntaxes: I,
    ) -> Result<u8>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let id = self.next_pc_id()?;
        let mut pc = PresentationContext::new(id, abstract_syntax);
        for ts in transfer_syntaxes {
            pc.add_transfer_syntax(ts)?;
        }
        self.params.add_presentation_context(pc)?;
        Ok(id)
    }

    /// The length of the user information item's content.
    pub fn user_info_length(&self) -> usize {
        self.params.user_info_length()
            + self
                .user_identity
                .as_ref()
                .map(|ui| 4 + ui.length())
                .unwrap_or(0)
    }

    /// The value of the PDU length field of this request once encoded,
    /// so that the full PDU takes `length() + 6` bytes.
    pub fn length(&self) -> usize {
        self.params.pdu_length(PresentationContext::length, self.user_info_length())
    }
}

impl Deref for AssociationRQ {
    type Target = AssociationParameters;

    fn deref(&self) -> &AssociationParameters {
        &self.params
    }
}

impl DerefMut for AssociationRQ {
    fn deref_mut(&mut self) -> &mut AssociationParameters {
        &mut self.params
    }
}

impl fmt::Display for AssociationRQ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.params.write_dump(
            f,
            "A-ASSOCIATE-RQ",
            self.user_identity.as_ref().map(|ui| ui as &dyn fmt::Display),
        )
    }
}

impl From<AssociationRQ> for Pdu {
    fn from(value: AssociationRQ) -> Self {
        Pdu::AssociationRQ(value)
    }
}

/// An association acknowledgement (A-ASSOCIATE-AC).
///
/// Presentation contexts in an acknowledgement carry
/// the negotiation result instead of an abstract syntax.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssociationAC {
    params: AssociationParameters,
    user_identity: Option<UserIdentityAC>,
}

impl AssociationAC {
    pub fn new() -> Self {
        AssociationAC::default()
    }

    pub fn from_parameters(params: AssociationParameters) -> Self {
        AssociationAC {
            params,
            user_identity: None,
        }
    }

    /// Prepare the acknowledgement of the given request.
    ///
    /// AE titles, application context and the reserved field
    /// are taken from the request,
    /// everything else starts from the defaults.
    pub fn from_request(rq: &AssociationRQ) -> Self {
        let mut params = AssociationParameters::default();
        params.called_ae_title = rq.called_ae_title.clone();
        params.calling_ae_title = rq.calling_ae_title.clone();
        params.application_context = rq.application_context.clone();
        params.reserved = rq.reserved;
        AssociationAC::from_parameters(params)
    }

    pub fn parameters(&self) -> &AssociationParameters {
        &self.params
    }

    /// The user identity server response, if any.
    pub fn user_identity(&self) -> Option<&UserIdentityAC> {
        self.user_identity.as_ref()
    }

    pub fn set_user_identity(&mut self, user_identity: Option<UserIdentityAC>) {
        self.user_identity = user_identity;
    }

    /// The length of the user information item's content.
    pub fn user_info_length(&self) -> usize {
        self.params.user_info_length()
            + self
                .user_identity
                .as_ref()
                .map(|ui| 4 + ui.length())
                .unwrap_or(0)
    }

    /// The value of the PDU length field of this acknowledgement once encoded,
    /// so that the full PDU takes `length() + 6` bytes.
    ///
    /// Presentation contexts are counted as answered,
    /// without their abstract syntax.
    pub fn length(&self) -> usize {
        self.params.pdu_length(PresentationContext::answered_length, self.user_info_length())
    }
}

impl Deref for AssociationAC {
    type Target = AssociationParameters;

    fn deref(&self) -> &AssociationParameters {
        &self.params
    }
}

impl DerefMut for AssociationAC {
    fn deref_mut(&mut self) -> &mut AssociationParameters {
        &mut self.params
    }
}

impl fmt::Display for AssociationAC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.params.write_dump(
            f,
            "A-ASSOCIATE-AC",
            self.user_identity.as_ref().map(|ui| ui as &dyn fmt::Display),
        )
    }
}

impl From<AssociationAC> for Pdu {
    fn from(value: AssociationAC) -> Self {
        Pdu::AssociationAC(value)
    }
}

impl From<AssociationRJ> for Pdu {
    fn from(value: AssociationRJ) -> Self {
        Pdu::AssociationRJ(value)
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct PDataValue {
    pub presentation_context_id: u8,
    pub value_type: PDataValueType,
    pub is_last: bool,
    pub data: Vec<u8>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PDataValueType {
    Command,
    Data,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AbortRQSource {
    ServiceUser,
    ServiceProvider(AbortRQServiceProviderReason),
    Reserved,
}

impl AbortRQSource {
    pub fn from(source: u8, reason: u8) -> Option<AbortRQSource> {
        let result = match (source, reason) {
            (0, _) => AbortRQSource::ServiceUser,
            (1, _) => AbortRQSource::Reserved,
            (2, reason) => AbortRQSource::ServiceProvider(AbortRQServiceProviderReason::from(
                reason,
            )?),
            (_, _) => {
                return None;
            }
        };
        Some(result)
    }

    /// The source and reason codes as written on the wire.
    pub fn codes(self) -> (u8, u8) {
        match self {
            AbortRQSource::ServiceUser => (0, 0),
            AbortRQSource::Reserved => (1, 0),
            AbortRQSource::ServiceProvider(reason) => (2, reason.code()),
        }
    }
}

/// An enumeration of supported A-ABORT PDU provider reasons.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AbortRQServiceProviderReason {
    /// Reason Not Specified
    ReasonNotSpecified,
    /// Unrecognized PDU
    UnrecognizedPdu,
    /// Unexpected PDU
    UnexpectedPdu,
    /// Reserved
    Reserved,
    /// Unrecognized PDU parameter
    UnrecognizedPduParameter,
    /// Unexpected PDU parameter
    UnexpectedPduParameter,
    /// Invalid PDU parameter
    InvalidPduParameter,
}

impl AbortRQServiceProviderReason {
    fn from(reason: u8) -> Option<Self> {
        let result = match reason {
            0 => AbortRQServiceProviderReason::ReasonNotSpecified,
            1 => AbortRQServiceProviderReason::UnrecognizedPdu,
            2 => AbortRQServiceProviderReason::UnexpectedPdu,
            3 => AbortRQServiceProviderReason::Reserved,
            4 => AbortRQServiceProviderReason::UnrecognizedPduParameter,
            5 => AbortRQServiceProviderReason::UnexpectedPduParameter,
            6 => AbortRQServiceProviderReason::InvalidPduParameter,
            _ => return None,
        };
        Some(result)
    }

    fn code(self) -> u8 {
        match self {
            AbortRQServiceProviderReason::ReasonNotSpecified => 0,
            AbortRQServiceProviderReason::UnrecognizedPdu => 1,
            AbortRQServiceProviderReason::UnexpectedPdu => 2,
            AbortRQServiceProviderReason::Reserved => 3,
            AbortRQServiceProviderReason::UnrecognizedPduParameter => 4,
            AbortRQServiceProviderReason::UnexpectedPduParameter => 5,
            AbortRQServiceProviderReason::InvalidPduParameter => 6,
        }
    }
}

impl fmt::Display for AbortRQServiceProviderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            AbortRQServiceProviderReason::ReasonNotSpecified => "reason not specified",
            AbortRQServiceProviderReason::UnrecognizedPdu => "unrecognized PDU",
            AbortRQServiceProviderReason::UnexpectedPdu => "unexpected PDU",
            AbortRQServiceProviderReason::Reserved => "reserved code",
            AbortRQServiceProviderReason::UnrecognizedPduParameter => "unrecognized PDU parameter",
            AbortRQServiceProviderReason::UnexpectedPduParameter => "unexpected PDU parameter",
            AbortRQServiceProviderReason::InvalidPduParameter => "invalid PDU parameter",
        };
        f.write_str(msg)
    }
}

/// A variable item of an A-ASSOCIATE-RQ/AC PDU, as read from the wire.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum PduVariableItem {
    Unknown(u8),
    ApplicationContext(String),
    PresentationContextProposed(PresentationContext),
    PresentationContextResult(PresentationContext),
    UserVariables(Box<UserInformation>),
}

/// The content of a user information item, as read from the wire.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct UserInformation {
    pub max_length: Option<u32>,
    pub implementation_class_uid: Option<String>,
    pub implementation_version_name: Option<String>,
    /// maximum number of operations invoked and performed
    pub async_ops_window: Option<(u16, u16)>,
    pub role_selections: Vec<RoleSelection>,
    pub extended_negotiations: Vec<ExtendedNegotiation>,
    pub common_extended_negotiations: Vec<CommonExtendedNegotiation>,
    pub user_identity_rq: Option<UserIdentityRQ>,
    pub user_identity_ac: Option<UserIdentityAC>,
}

/// An in-memory representation of a full Protocol Data Unit (PDU).
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Pdu {
    /// Unrecognized PDU type
    Unknown { pdu_type: u8, data: Vec<u8> },
    /// Association request (A-ASSOCIATION-RQ)
    AssociationRQ(AssociationRQ),
    /// Association acknowledgement (A-ASSOCIATION-AC)
    AssociationAC(AssociationAC),
    /// Association rejection (A-ASSOCIATION-RJ)
    AssociationRJ(AssociationRJ),
    /// P-Data
    PData { data: Vec<PDataValue> },
    /// Association release request (A-RELEASE-RQ)
    ReleaseRQ,
    /// Association release reply (A-RELEASE-RP)
    ReleaseRP,
    /// Association abort request (A-ABORT-RQ)
    AbortRQ { source: AbortRQSource },
}

impl Pdu {
    /// Provide a short description of the PDU.
    pub fn short_description(&self) -> impl fmt::Display + '_ {
        PduShortDescription(self)
    }
}

struct PduShortDescription<'a>(&'a Pdu);

impl fmt::Display for PduShortDescription<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Pdu::Unknown { pdu_type, data } => {
                write!(
                    f,
                    "Unknown {{pdu_type: {}, data: {} bytes }}",
                    pdu_type,
                    data.len()
                )
            }
            Pdu::AssociationRQ(rq) => write!(
                f,
                "AssociationRQ {{ {} -> {}, {} presentation contexts }}",
                rq.calling_ae_title(),
                rq.called_ae_title(),
                rq.number_of_presentation_contexts()
            ),
            Pdu::AssociationAC(ac) => write!(
                f,
                "AssociationAC {{ {} -> {}, {} presentation contexts }}",
                ac.calling_ae_title(),
                ac.called_ae_title(),
                ac.number_of_presentation_contexts()
            ),
            Pdu::AssociationRJ(rj) => fmt::Display::fmt(rj, f),
            Pdu::ReleaseRQ | Pdu::ReleaseRP | Pdu::AbortRQ { .. } => fmt::Debug::fmt(self.0, f),
            Pdu::PData { data } => {
                f.write_str("PData [")?;
                for (i, value) in data.iter().take(2).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "({:?}, {} bytes)", value.value_type, value.data.len())?;
                }
                if data.len() > 2 {
                    write!(f, ", ... ({} p-data values)", data.len())?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matches::matches;

    #[test]
    fn pdu_short_description() {
        let pdu = Pdu::AbortRQ {
            source: AbortRQSource::ServiceUser,
        };
        assert_eq!(
            &pdu.short_description().to_string(),
            "AbortRQ { source: ServiceUser }",
        );

        let pdu = Pdu::PData {
            data: vec![PDataValue {
                is_last: true,
                presentation_context_id: 1,
                value_type: PDataValueType::Data,
                data: vec![0x55; 384],
            }],
        };
        assert_eq!(
            &pdu.short_description().to_string(),
            "PData [(Data, 384 bytes)]",
        );

        let pdu = Pdu::AssociationRJ(AssociationRJ::from_codes(1, 1, 7));
        assert_eq!(
            &pdu.short_description().to_string(),
            "A-ASSOCIATE-RJ[result: 1, source: 1, reason: 7]: permanent called-AE-title-not-recognized",
        );
    }

    #[test]
    fn pc_ids_are_odd_and_increasing() {
        let rq = AssociationRQ::new();
        assert_eq!(rq.next_pc_id().unwrap(), 1);
        assert_eq!(rq.next_pc_id().unwrap(), 3);
        assert_eq!(rq.next_pc_id().unwrap(), 5);
    }

    #[test]
    fn pc_ids_skip_those_in_use() {
        let mut rq = AssociationRQ::new();
        for id in [1, 3, 7] {
            rq.add_presentation_context(PresentationContext::new(id, "1.2.3"))
                .unwrap();
        }
        assert_eq!(rq.next_pc_id().unwrap(), 5);
        assert_eq!(rq.next_pc_id().unwrap(), 9);
    }

    #[test]
    fn pc_ids_wrap_around() {
        let mut rq = AssociationRQ::new();
        for _ in 0..127 {
            rq.add_presentation_context_with("1.2.3", ["1.2.840.10008.1.2"])
                .unwrap();
        }
        assert_eq!(rq.number_of_presentation_contexts(), 127);
        assert!(rq.presentation_context(253).is_some());

        // free up an early identifier, which is found after wrapping around
        let pc = rq.presentation_context(41).cloned().unwrap();
        assert!(rq.remove_presentation_context(&pc));
        assert_eq!(rq.next_pc_id().unwrap(), 255);
        assert_eq!(rq.next_pc_id().unwrap(), 41);
    }

    #[test]
    fn pc_ids_exhausted_at_128_contexts() {
        let mut rq = AssociationRQ::new();
        for _ in 0..128 {
            rq.add_presentation_context_with("1.2.3", ["1.2.840.10008.1.2"])
                .unwrap();
        }
        assert!(matches!(
            rq.next_pc_id(),
            Err(Error::PresentationContextIdsExhausted { .. })
        ));
        assert!(matches!(
            rq.add_presentation_context_with("1.2.3", ["1.2.840.10008.1.2"]),
            Err(Error::PresentationContextIdsExhausted { .. })
        ));
    }

    #[test]
    fn pc_ids_are_unique_across_threads() {
        let rq = AssociationRQ::new();
        let mut ids: Vec<u8> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| (0..16).map(|_| rq.next_pc_id().unwrap()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 64);
        assert!(ids.iter().all(|id| id % 2 == 1));
    }

    #[test]
    fn acknowledgement_from_request() {
        let mut rq = AssociationRQ::new();
        rq.set_calling_ae_title("STORE-SCU").unwrap();
        rq.set_called_ae_title("STORE-SCP").unwrap();
        rq.set_reserved(&[1; 32]).unwrap();
        rq.set_max_ops_invoked(4);
        rq.set_user_identity(Some(UserIdentityRQ::username("alice")));

        let ac = AssociationAC::from_request(&rq);
        assert_eq!(ac.calling_ae_title(), "STORE-SCU");
        assert_eq!(ac.called_ae_title(), "STORE-SCP");
        assert_eq!(ac.reserved(), &[1; 32]);
        assert_eq!(ac.max_ops_invoked(), 1);
        assert!(ac.user_identity().is_none());
        assert_eq!(ac.number_of_presentation_contexts(), 0);
    }

    #[test]
    fn user_identity_counts_in_user_info_length() {
        let mut rq = AssociationRQ::new();
        let base = rq.user_info_length();
        rq.set_user_identity(Some(UserIdentityRQ::username_passcode("alice", &['p', 'w'])));
        assert_eq!(rq.user_info_length(), base + 4 + 6 + 5 + 2);
        assert_eq!(rq.parameters().user_info_length(), base);

        let mut ac = AssociationAC::new();
        let base = ac.user_info_length();
        ac.set_user_identity(Some(UserIdentityAC::new(vec![1, 2])));
        assert_eq!(ac.user_info_length(), base + 4 + 4);
    }

    #[test]
    fn request_equality_ignores_id_cursor() {
        let a = AssociationRQ::new();
        let b = a.clone();
        a.next_pc_id().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn abort_source_codes() {
        assert_eq!(AbortRQSource::from(0, 0), Some(AbortRQSource::ServiceUser));
        let source = AbortRQSource::from(2, 6).unwrap();
        assert_eq!(
            source,
            AbortRQSource::ServiceProvider(AbortRQServiceProviderReason::InvalidPduParameter)
        );
        assert_eq!(source.codes(), (2, 6));
        assert_eq!(AbortRQSource::from(2, 7), None);
        assert_eq!(AbortRQSource::from(3, 0), None);
    }
}
