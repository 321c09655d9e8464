//! Association rejection (A-ASSOCIATE-RJ).
use std::fmt;

/// Textual reasons of association rejections,
/// indexed by source and reason code.
static REASON_DESCRIPTIONS: &[(u8, u8, &str)] = &[
    (1, 1, "no-reason-given"),
    (1, 2, "application-context-name-not-supported"),
    (1, 3, "calling-AE-title-not-recognized"),
    (1, 7, "called-AE-title-not-recognized"),
    (2, 1, "no-reason-given"),
    (2, 2, "protocol-version-not-supported"),
    (3, 1, "temporary-congestion"),
    (3, 2, "local-limit-exceeded"),
];

/// Obtain the standard description of a rejection reason.
/// Pairs without a defined meaning are described as `"reserved"`.
pub fn reason_description(source: u8, reason: u8) -> &'static str {
    REASON_DESCRIPTIONS
        .iter()
        .find(|(s, r, _)| *s == source && *r == reason)
        .map(|(_, _, description)| *description)
        .unwrap_or("reserved")
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Hash)]
pub enum AssociationRJResult {
    Permanent,
    Transient,
    Reserved(u8),
}

impl AssociationRJResult {
    pub fn from(value: u8) -> AssociationRJResult {
        match value {
            1 => AssociationRJResult::Permanent,
            2 => AssociationRJResult::Transient,
            x => AssociationRJResult::Reserved(x),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            AssociationRJResult::Permanent => 1,
            AssociationRJResult::Transient => 2,
            AssociationRJResult::Reserved(x) => x,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Hash)]
pub enum AssociationRJSource {
    ServiceUser(AssociationRJServiceUserReason),
    ServiceProviderASCE(AssociationRJServiceProviderASCEReason),
    ServiceProviderPresentation(AssociationRJServiceProviderPresentationReason),
    /// A source code not defined by the standard
    Reserved { source: u8, reason: u8 },
}

impl AssociationRJSource {
    /// Interpret a source and reason code pair.
    /// Any pair is accepted, unknown codes are kept as reserved.
    pub fn from(source: u8, reason: u8) -> AssociationRJSource {
        match source {
            1 => AssociationRJSource::ServiceUser(match reason {
                1 => AssociationRJServiceUserReason::NoReasonGiven,
                2 => AssociationRJServiceUserReason::ApplicationContextNameNotSupported,
                3 => AssociationRJServiceUserReason::CallingAETitleNotRecognized,
                7 => AssociationRJServiceUserReason::CalledAETitleNotRecognized,
                x => AssociationRJServiceUserReason::Reserved(x),
            }),
            2 => AssociationRJSource::ServiceProviderASCE(match reason {
                1 => AssociationRJServiceProviderASCEReason::NoReasonGiven,
                2 => AssociationRJServiceProviderASCEReason::ProtocolVersionNotSupported,
                x => AssociationRJServiceProviderASCEReason::Reserved(x),
            }),
            3 => AssociationRJSource::ServiceProviderPresentation(match reason {
                1 => AssociationRJServiceProviderPresentationReason::TemporaryCongestion,
                2 => AssociationRJServiceProviderPresentationReason::LocalLimitExceeded,
                x => AssociationRJServiceProviderPresentationReason::Reserved(x),
            }),
            source => AssociationRJSource::Reserved { source, reason },
        }
    }

    /// The source and reason codes as written on the wire.
    pub fn codes(self) -> (u8, u8) {
        match self {
            AssociationRJSource::ServiceUser(r) => (1, r.code()),
            AssociationRJSource::ServiceProviderASCE(r) => (2, r.code()),
            AssociationRJSource::ServiceProviderPresentation(r) => (3, r.code()),
            AssociationRJSource::Reserved { source, reason } => (source, reason),
        }
    }
}

impl fmt::Display for AssociationRJSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (source, reason) = self.codes();
        f.write_str(reason_description(source, reason))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Hash)]
pub enum AssociationRJServiceUserReason {
    NoReasonGiven,
    ApplicationContextNameNotSupported,
    CallingAETitleNotRecognized,
    CalledAETitleNotRecognized,
    Reserved(u8),
}

impl AssociationRJServiceUserReason {
    pub fn code(self) -> u8 {
        match self {
            AssociationRJServiceUserReason::NoReasonGiven => 1,
            AssociationRJServiceUserReason::ApplicationContextNameNotSupported => 2,
            AssociationRJServiceUserReason::CallingAETitleNotRecognized => 3,
            AssociationRJServiceUserReason::CalledAETitleNotRecognized => 7,
            AssociationRJServiceUserReason::Reserved(x) => x,
        }
    }
}

impl fmt::Display for AssociationRJServiceUserReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(reason_description(1, self.code()))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Hash)]
pub enum AssociationRJServiceProviderASCEReason {
    NoReasonGiven,
    ProtocolVersionNotSupported,
    Reserved(u8),
}

impl AssociationRJServiceProviderASCEReason {
    pub fn code(self) -> u8 {
        match self {
            AssociationRJServiceProviderASCEReason::NoReasonGiven => 1,
            AssociationRJServiceProviderASCEReason::ProtocolVersionNotSupported => 2,
            AssociationRJServiceProviderASCEReason::Reserved(x) => x,
        }
    }
}

impl fmt::Display for AssociationRJServiceProviderASCEReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(reason_description(2, self.code()))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Hash)]
pub enum AssociationRJServiceProviderPresentationReason {
    TemporaryCongestion,
    LocalLimitExceeded,
    Reserved(u8),
}

impl AssociationRJServiceProviderPresentationReason {
    pub fn code(self) -> u8 {
        match self {
            AssociationRJServiceProviderPresentationReason::TemporaryCongestion => 1,
            AssociationRJServiceProviderPresentationReason::LocalLimitExceeded => 2,
            AssociationRJServiceProviderPresentationReason::Reserved(x) => x,
        }
    }
}

impl fmt::Display for AssociationRJServiceProviderPresentationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(reason_description(3, self.code()))
    }
}

/// An association rejection.
///
/// A rejection ends the association attempt,
/// so it is usually carried as an error value
/// by the association requester.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Hash)]
pub struct AssociationRJ {
    pub result: AssociationRJResult,
    pub source: AssociationRJSource,
}

impl AssociationRJ {
    pub fn new(result: AssociationRJResult, source: AssociationRJSource) -> Self {
        AssociationRJ { result, source }
    }

    /// Build a rejection from the raw result, source and reason codes.
    pub fn from_codes(result: u8, source: u8, reason: u8) -> Self {
        AssociationRJ {
            result: AssociationRJResult::from(result),
            source: AssociationRJSource::from(source, reason),
        }
    }

    /// The result, source and reason codes as written on the wire.
    pub fn codes(&self) -> (u8, u8, u8) {
        let (source, reason) = self.source.codes();
        (self.result.code(), source, reason)
    }

    pub fn is_transient(&self) -> bool {
        self.result == AssociationRJResult::Transient
    }

    /// Whether the same association request may be attempted again
    /// after a while.
    ///
    /// Only transient rejections due to congestion or local limits
    /// on the acceptor's side qualify.
    pub fn should_retry(&self) -> bool {
        self.is_transient()
            && matches!(
                self.source,
                AssociationRJSource::ServiceProviderPresentation(
                    AssociationRJServiceProviderPresentationReason::TemporaryCongestion
                        | AssociationRJServiceProviderPresentationReason::LocalLimitExceeded
                )
            )
    }

    /// The textual reason of the rejection.
    pub fn description(&self) -> &'static str {
        let (source, reason) = self.source.codes();
        reason_description(source, reason)
    }
}

impl fmt::Display for AssociationRJ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (result, source, reason) = self.codes();
        write!(
            f,
            "A-ASSOCIATE-RJ[result: {}, source: {}, reason: {}]: ",
            result, source, reason
        )?;
        match self.result {
            AssociationRJResult::Permanent => f.write_str("permanent ")?,
            AssociationRJResult::Transient => f.write_str("transient ")?,
            AssociationRJResult::Reserved(_) => {}
        }
        f.write_str(self.description())
    }
}

impl std::error::Error for AssociationRJ {}
