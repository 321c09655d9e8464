//! Utility module for working with UIDs.

use std::borrow::Cow;
use std::fmt;

use dicom_core::dictionary::UidDictionary;
use dicom_dictionary_std::StandardSopClassDictionary;
use dicom_encoding::transfer_syntax::TransferSyntaxIndex;
use dicom_transfer_syntax_registry::TransferSyntaxRegistry;

/// Remove trailing null padding from a UID.
pub(crate) fn trim_uid(uid: Cow<'_, str>) -> Cow<'_, str> {
    if uid.ends_with('\0') {
        Cow::Owned(uid.trim_end_matches('\0').to_string())
    } else {
        uid
    }
}

/// Look up the name of a well known UID:
/// a SOP class, a transfer syntax,
/// or the DICOM application context.
pub fn uid_name(uid: &str) -> Option<&'static str> {
    let uid = uid.trim_end_matches('\0');
    if uid == crate::pdu::DICOM_APPLICATION_CONTEXT_NAME {
        return Some("DICOM Application Context Name");
    }
    StandardSopClassDictionary
        .by_uid(uid)
        .map(|e| e.name)
        .or_else(|| TransferSyntaxRegistry.get(uid).map(|ts| ts.name()))
}

/// Format a UID followed by its name, if known
/// (e.g. `1.2.840.10008.1.2 - Implicit VR Little Endian`).
pub fn describe_uid(uid: &str) -> impl fmt::Display + '_ {
    UidDescription(uid)
}

struct UidDescription<'a>(&'a str);

impl fmt::Display for UidDescription<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match uid_name(self.0) {
            Some(name) => write!(f, "{} - {}", self.0, name),
            None => f.write_str(self.0),
        }
    }
}
