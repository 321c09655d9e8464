//! Negotiation sub-items carried in the user information item
//! of association requests and acknowledgements.
use std::fmt;

use super::text_length;
use crate::uid::describe_uid;

/// SCP/SCU role selection for a SOP class (sub-item 54H).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct RoleSelection {
    pub sop_class_uid: String,
    /// whether the association requester may take the SCU role
    pub scu_role: bool,
    /// whether the association requester may take the SCP role
    pub scp_role: bool,
}

impl RoleSelection {
    pub fn new(sop_class_uid: impl Into<String>, scu_role: bool, scp_role: bool) -> Self {
        RoleSelection {
            sop_class_uid: sop_class_uid.into(),
            scu_role,
            scp_role,
        }
    }

    /// The length of the sub-item's content, excluding the sub-item header.
    pub fn length(&self) -> usize {
        4 + text_length(&self.sop_class_uid)
    }
}

impl fmt::Display for RoleSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RoleSelection[sop class: {}, scu: {}, scp: {}]",
            describe_uid(&self.sop_class_uid),
            self.scu_role,
            self.scp_role
        )
    }
}

/// SOP class extended negotiation (sub-item 56H).
///
/// The content of `info` is defined by the service class
/// identified by the SOP class UID.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ExtendedNegotiation {
    pub sop_class_uid: String,
    pub info: Vec<u8>,
}

impl ExtendedNegotiation {
    pub fn new(sop_class_uid: impl Into<String>, info: impl Into<Vec<u8>>) -> Self {
        ExtendedNegotiation {
            sop_class_uid: sop_class_uid.into(),
            info: info.into(),
        }
    }

    /// The length of the sub-item's content, excluding the sub-item header.
    pub fn length(&self) -> usize {
        2 + text_length(&self.sop_class_uid) + self.info.len()
    }
}

impl fmt::Display for ExtendedNegotiation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExtendedNegotiation[sop class: {}, info: {:02X?}]",
            describe_uid(&self.sop_class_uid),
            self.info
        )
    }
}

/// SOP class common extended negotiation (sub-item 57H).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct CommonExtendedNegotiation {
    pub sop_class_uid: String,
    pub service_class_uid: String,
    pub related_general_sop_classes: Vec<String>,
}

impl CommonExtendedNegotiation {
    pub fn new(sop_class_uid: impl Into<String>, service_class_uid: impl Into<String>) -> Self {
        CommonExtendedNegotiation {
            sop_class_uid: sop_class_uid.into(),
            service_class_uid: service_class_uid.into(),
            related_general_sop_classes: Vec::new(),
        }
    }

    /// Builder method to add a related general SOP class UID.
    pub fn with_related_general_sop_class(mut self, uid: impl Into<String>) -> Self {
        self.related_general_sop_classes.push(uid.into());
        self
    }

    /// The length of the sub-item's content, excluding the sub-item header.
    pub fn length(&self) -> usize {
        6 + text_length(&self.sop_class_uid)
            + text_length(&self.service_class_uid)
            + self
                .related_general_sop_classes
                .iter()
                .map(|uid| 2 + text_length(uid))
                .sum::<usize>()
    }
}

impl fmt::Display for CommonExtendedNegotiation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CommonExtendedNegotiation[sop class: {}, service class: {}",
            describe_uid(&self.sop_class_uid),
            describe_uid(&self.service_class_uid)
        )?;
        for uid in &self.related_general_sop_classes {
            write!(f, ", related: {}", describe_uid(uid))?;
        }
        f.write_str("]")
    }
}
