//! Presentation context data structure,
//! shared by association requests and acknowledgements.
use std::fmt;

use snafu::ensure;

use super::{check_text, text_length, EmptyTransferSyntaxSnafu, Result};
use crate::uid::describe_uid;

/// The result of negotiating a single presentation context.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, PartialOrd, Hash)]
pub enum PresentationContextResultReason {
    #[default]
    Acceptance = 0,
    UserRejection = 1,
    NoReason = 2,
    AbstractSyntaxNotSupported = 3,
    TransferSyntaxesNotSupported = 4,
}

impl PresentationContextResultReason {
    /// Interpret a result/reason code.
    /// Returns `None` if the code is not defined by the standard.
    pub fn from(reason: u8) -> Option<PresentationContextResultReason> {
        let result = match reason {
            0 => PresentationContextResultReason::Acceptance,
            1 => PresentationContextResultReason::UserRejection,
            2 => PresentationContextResultReason::NoReason,
            3 => PresentationContextResultReason::AbstractSyntaxNotSupported,
            4 => PresentationContextResultReason::TransferSyntaxesNotSupported,
            _ => {
                return None;
            }
        };
        Some(result)
    }

    /// The code of this result as written on the wire.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PresentationContextResultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            PresentationContextResultReason::Acceptance => "acceptance",
            PresentationContextResultReason::UserRejection => "user rejection",
            PresentationContextResultReason::NoReason => "no reason",
            PresentationContextResultReason::AbstractSyntaxNotSupported => {
                "abstract syntax not supported"
            }
            PresentationContextResultReason::TransferSyntaxesNotSupported => {
                "transfer syntaxes not supported"
            }
        };
        f.write_str(msg)
    }
}

/// Describe a raw presentation context result code,
/// as it would be shown in an association dump.
///
/// Codes outside of the standard range yield `"undefined"`.
pub fn result_code_as_str(code: u8) -> &'static str {
    match code {
        0 => "0 - acceptance",
        1 => "1 - user-rejection",
        2 => "2 - no-reason (provider rejection)",
        3 => "3 - abstract-syntax-not-supported (provider rejection)",
        4 => "4 - transfer-syntaxes-not-supported (provider rejection)",
        _ => "undefined",
    }
}

/// A presentation context,
/// either proposed by the association requester
/// or answered by the association acceptor.
///
/// A proposed context carries an abstract syntax
/// and one or more transfer syntaxes in order of preference.
/// An answered context carries the negotiation result
/// and, if accepted, exactly one transfer syntax.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct PresentationContext {
    id: u8,
    result: PresentationContextResultReason,
    abstract_syntax: Option<String>,
    transfer_syntaxes: Vec<String>,
}

impl PresentationContext {
    /// Create a proposed presentation context without transfer syntaxes.
    pub fn new(id: u8, abstract_syntax: impl Into<String>) -> Self {
        PresentationContext {
            id,
            result: PresentationContextResultReason::Acceptance,
            abstract_syntax: Some(abstract_syntax.into()),
            transfer_syntaxes: Vec::new(),
        }
    }

    /// Create an accepted presentation context
    /// bound to the given transfer syntax.
    pub fn accepted(id: u8, transfer_syntax: impl Into<String>) -> Self {
        PresentationContext {
            id,
            result: PresentationContextResultReason::Acceptance,
            abstract_syntax: None,
            transfer_syntaxes: vec![transfer_syntax.into()],
        }
    }

    /// Create a rejected presentation context.
    pub fn rejected(id: u8, reason: PresentationContextResultReason) -> Self {
        PresentationContext {
            id,
            result: reason,
            abstract_syntax: None,
            transfer_syntaxes: Vec::new(),
        }
    }

    /// Create a presentation context from all of its parts.
    pub(crate) fn from_parts(
        id: u8,
        result: PresentationContextResultReason,
        abstract_syntax: Option<String>,
        transfer_syntaxes: Vec<String>,
    ) -> Self {
        PresentationContext {
            id,
            result,
            abstract_syntax,
            transfer_syntaxes,
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn set_id(&mut self, id: u8) {
        self.id = id;
    }

    pub fn result(&self) -> PresentationContextResultReason {
        self.result
    }

    pub fn set_result(&mut self, result: PresentationContextResultReason) {
        self.result = result;
    }

    /// Whether the acceptor accepted this presentation context.
    pub fn is_accepted(&self) -> bool {
        self.result == PresentationContextResultReason::Acceptance
    }

    /// The abstract syntax UID, present on proposed contexts only.
    pub fn abstract_syntax(&self) -> Option<&str> {
        self.abstract_syntax.as_deref()
    }

    pub fn set_abstract_syntax(&mut self, abstract_syntax: Option<String>) {
        self.abstract_syntax = abstract_syntax;
    }

    /// All transfer syntaxes in this context, in order of preference.
    pub fn transfer_syntaxes(&self) -> &[String] {
        &self.transfer_syntaxes
    }

    /// The first (in accepted contexts, the only) transfer syntax.
    pub fn transfer_syntax(&self) -> Option<&str> {
        self.transfer_syntaxes.first().map(String::as_str)
    }

    /// Add a transfer syntax at the end of the list.
    ///
    /// Returns `Ok(false)` if the transfer syntax was already present,
    /// in which case its position is left unchanged.
    /// A context without an abstract syntax is an answer
    /// and holds a single transfer syntax,
    /// which is replaced instead.
    pub fn add_transfer_syntax(&mut self, uid: impl Into<String>) -> Result<bool> {
        let uid = uid.into();
        ensure!(!uid.is_empty(), EmptyTransferSyntaxSnafu);
        check_text("transfer syntax UID", &uid)?;
        if self.contains_transfer_syntax(&uid) {
            return Ok(false);
        }
        if self.abstract_syntax.is_none() {
            self.transfer_syntaxes.clear();
        }
        self.transfer_syntaxes.push(uid);
        Ok(true)
    }

    /// Remove a transfer syntax.
    /// Returns whether it was present.
    pub fn remove_transfer_syntax(&mut self, uid: &str) -> bool {
        let len = self.transfer_syntaxes.len();
        self.transfer_syntaxes.retain(|ts| ts != uid);
        self.transfer_syntaxes.len() != len
    }

    pub fn contains_transfer_syntax(&self, uid: &str) -> bool {
        self.transfer_syntaxes.iter().any(|ts| ts == uid)
    }

    /// The length of the presentation context item's content
    /// in an association request,
    /// excluding the item header.
    pub fn length(&self) -> usize {
        self.abstract_syntax
            .as_deref()
            .map(|uid| 4 + text_length(uid))
            .unwrap_or(0)
            + self.answered_length()
    }

    /// The length of the presentation context item's content
    /// in an association acknowledgement,
    /// where the abstract syntax is left out.
    pub fn answered_length(&self) -> usize {
        4 + self
            .transfer_syntaxes
            .iter()
            .map(|uid| 4 + text_length(uid))
            .sum::<usize>()
    }

    pub fn result_as_str(&self) -> &'static str {
        result_code_as_str(self.result.code())
    }
}

impl fmt::Display for PresentationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PresentationContext[id: {}", self.id)?;
        match &self.abstract_syntax {
            Some(abstract_syntax) => {
                writeln!(f)?;
                writeln!(f, "    as: {}", describe_uid(abstract_syntax))?;
            }
            None => {
                writeln!(f, ", {}", self.result_as_str())?;
            }
        }
        for ts in &self.transfer_syntaxes {
            writeln!(f, "    ts: {}", describe_uid(ts))?;
        }
        f.write_str("  ]")
    }
}
