//! Parameters shared by association requests and acknowledgements.
use std::fmt;

use snafu::ensure;

use super::reader::DEFAULT_MAX_PDU;
use super::{
    check_text, text_length, CommonExtendedNegotiation, ExtendedNegotiation,
    InvalidAeTitleSnafu, InvalidPresentationContextIdSnafu, InvalidReservedLengthSnafu,
    MissingUidSnafu, PresentationContext, Result, RoleSelection,
};
use crate::uid::describe_uid;
use crate::{IMPLEMENTATION_CLASS_UID, IMPLEMENTATION_VERSION_NAME};

/// The AE title used when none is given.
pub const DEFAULT_AE_TITLE: &str = "ANONYMOUS";

/// The DICOM application context name.
pub const DICOM_APPLICATION_CONTEXT_NAME: &str = "1.2.840.10008.3.1.1.1";

/// The maximum number of characters in an AE title.
pub const MAX_AE_TITLE_LENGTH: usize = 16;

/// The maximum number of presentation contexts in one association.
pub const MAX_PRESENTATION_CONTEXTS: usize = 128;

/// The length of the reserved field of A-ASSOCIATE-RQ/AC PDUs.
pub const RESERVED_FIELD_LENGTH: usize = 32;

/// Fixed part of an A-ASSOCIATE-RQ/AC PDU after the PDU header:
/// protocol version, reserved, AE titles and the reserved field.
const FIXED_PART_LENGTH: usize = 68;

/// The parameters common to A-ASSOCIATE-RQ and A-ASSOCIATE-AC PDUs.
///
/// Presentation contexts are kept in insertion order
/// and are unique by identifier.
/// Role selection and (common) extended negotiation items
/// are kept in insertion order and are unique by SOP class UID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationParameters {
    pub(crate) protocol_version: u16,
    pub(crate) max_pdu_length: u32,
    pub(crate) max_ops_invoked: u16,
    pub(crate) max_ops_performed: u16,
    pub(crate) called_ae_title: String,
    pub(crate) calling_ae_title: String,
    pub(crate) application_context: String,
    pub(crate) implementation_class_uid: String,
    pub(crate) implementation_version_name: Option<String>,
    pub(crate) reserved: [u8; RESERVED_FIELD_LENGTH],
    pub(crate) presentation_contexts: Vec<PresentationContext>,
    pub(crate) role_selections: Vec<RoleSelection>,
    pub(crate) extended_negotiations: Vec<ExtendedNegotiation>,
    pub(crate) common_extended_negotiations: Vec<CommonExtendedNegotiation>,
}

impl Default for AssociationParameters {
    fn default() -> Self {
        AssociationParameters {
            protocol_version: 1,
            max_pdu_length: DEFAULT_MAX_PDU,
            max_ops_invoked: 1,
            max_ops_performed: 1,
            called_ae_title: DEFAULT_AE_TITLE.to_string(),
            calling_ae_title: DEFAULT_AE_TITLE.to_string(),
            application_context: DICOM_APPLICATION_CONTEXT_NAME.to_string(),
            implementation_class_uid: IMPLEMENTATION_CLASS_UID.to_string(),
            implementation_version_name: Some(IMPLEMENTATION_VERSION_NAME.to_string()),
            reserved: [0; RESERVED_FIELD_LENGTH],
            presentation_contexts: Vec::new(),
            role_selections: Vec::new(),
            extended_negotiations: Vec::new(),
            common_extended_negotiations: Vec::new(),
        }
    }
}

fn check_ae_title(ae_title: &str) -> Result<()> {
    check_text("AE title", ae_title)?;
    ensure!(
        text_length(ae_title) <= MAX_AE_TITLE_LENGTH,
        InvalidAeTitleSnafu { ae_title }
    );
    Ok(())
}

fn check_uid(field: &'static str, uid: &str) -> Result<()> {
    ensure!(!uid.is_empty(), MissingUidSnafu { field });
    check_text(field, uid)
}

/// Replace the element with the same key, or push a new one.
/// Returns the replaced element.
fn replace_or_push<T, F>(items: &mut Vec<T>, item: T, same_key: F) -> Option<T>
where
    F: Fn(&T, &T) -> bool,
{
    match items.iter().position(|e| same_key(e, &item)) {
        Some(i) => Some(std::mem::replace(&mut items[i], item)),
        None => {
            items.push(item);
            None
        }
    }
}

fn remove_where<T, F>(items: &mut Vec<T>, pred: F) -> Option<T>
where
    F: Fn(&T) -> bool,
{
    let i = items.iter().position(pred)?;
    Some(items.remove(i))
}

impl AssociationParameters {
    pub fn protocol_version(&self) -> u16 {
        self.protocol_version
    }

    /// Set the protocol version.
    /// Version 1 is identified by bit 0.
    pub fn set_protocol_version(&mut self, protocol_version: u16) {
        self.protocol_version = protocol_version;
    }

    /// The maximum length of P-DATA-TF PDUs
    /// that the sender of these parameters is willing to receive.
    /// Zero means no limit.
    pub fn max_pdu_length(&self) -> u32 {
        self.max_pdu_length
    }

    pub fn set_max_pdu_length(&mut self, max_pdu_length: u32) {
        self.max_pdu_length = max_pdu_length;
    }

    pub fn max_ops_invoked(&self) -> u16 {
        self.max_ops_invoked
    }

    pub fn set_max_ops_invoked(&mut self, max_ops_invoked: u16) {
        self.max_ops_invoked = max_ops_invoked;
    }

    pub fn max_ops_performed(&self) -> u16 {
        self.max_ops_performed
    }

    pub fn set_max_ops_performed(&mut self, max_ops_performed: u16) {
        self.max_ops_performed = max_ops_performed;
    }

    /// Whether the asynchronous operations window is negotiated,
    /// which happens when either limit differs from 1.
    pub fn is_async_ops(&self) -> bool {
        self.max_ops_invoked != 1 || self.max_ops_performed != 1
    }

    pub fn called_ae_title(&self) -> &str {
        &self.called_ae_title
    }

    /// Set the called AE title,
    /// which must not exceed 16 characters of the default character set.
    pub fn set_called_ae_title(&mut self, ae_title: &str) -> Result<()> {
        check_ae_title(ae_title)?;
        self.called_ae_title = ae_title.to_string();
        Ok(())
    }

    pub fn calling_ae_title(&self) -> &str {
        &self.calling_ae_title
    }

    /// Set the calling AE title,
    /// which must not exceed 16 characters of the default character set.
    pub fn set_calling_ae_title(&mut self, ae_title: &str) -> Result<()> {
        check_ae_title(ae_title)?;
        self.calling_ae_title = ae_title.to_string();
        Ok(())
    }

    pub fn application_context(&self) -> &str {
        &self.application_context
    }

    pub fn set_application_context(&mut self, uid: impl Into<String>) -> Result<()> {
        let uid = uid.into();
        check_uid("application context name", &uid)?;
        self.application_context = uid;
        Ok(())
    }

    pub fn implementation_class_uid(&self) -> &str {
        &self.implementation_class_uid
    }

    pub fn set_implementation_class_uid(&mut self, uid: impl Into<String>) -> Result<()> {
        let uid = uid.into();
        check_uid("implementation class UID", &uid)?;
        self.implementation_class_uid = uid;
        Ok(())
    }

    pub fn implementation_version_name(&self) -> Option<&str> {
        self.implementation_version_name.as_deref()
    }

    pub fn set_implementation_version_name(&mut self, name: Option<String>) -> Result<()> {
        if let Some(name) = &name {
            check_text("implementation version name", name)?;
        }
        self.implementation_version_name = name;
        Ok(())
    }

    pub fn reserved(&self) -> &[u8; RESERVED_FIELD_LENGTH] {
        &self.reserved
    }

    /// Set the content of the reserved field,
    /// which must be exactly 32 bytes long.
    pub fn set_reserved(&mut self, reserved: &[u8]) -> Result<()> {
        ensure!(
            reserved.len() == RESERVED_FIELD_LENGTH,
            InvalidReservedLengthSnafu {
                length: reserved.len()
            }
        );
        self.reserved.copy_from_slice(reserved);
        Ok(())
    }

    /// Add a presentation context.
    ///
    /// A presentation context with the same identifier
    /// is replaced in place and returned.
    /// The identifier must be odd,
    /// which also bounds the number of presentation contexts to 128.
    pub fn add_presentation_context(
        &mut self,
        pc: PresentationContext,
    ) -> Result<Option<PresentationContext>> {
        ensure!(pc.id() % 2 == 1, InvalidPresentationContextIdSnafu { id: pc.id() });
        Ok(self.insert_presentation_context(pc))
    }

    /// Add a presentation context as decoded from a peer,
    /// without checking its identifier.
    pub(crate) fn insert_presentation_context(
        &mut self,
        pc: PresentationContext,
    ) -> Option<PresentationContext> {
        replace_or_push(&mut self.presentation_contexts, pc, |a, b| a.id() == b.id())
    }

    /// Remove the given presentation context.
    ///
    /// Nothing is removed unless the context recorded under the same identifier
    /// is equal to `pc`.
    pub fn remove_presentation_context(&mut self, pc: &PresentationContext) -> bool {
        remove_where(&mut self.presentation_contexts, |e| e == pc).is_some()
    }

    pub fn presentation_context(&self, id: u8) -> Option<&PresentationContext> {
        self.presentation_contexts.iter().find(|pc| pc.id() == id)
    }

    pub fn presentation_context_mut(&mut self, id: u8) -> Option<&mut PresentationContext> {
        self.presentation_contexts.iter_mut().find(|pc| pc.id() == id)
    }

    /// All presentation contexts, in insertion order.
    pub fn presentation_contexts(&self) -> &[PresentationContext] {
        &self.presentation_contexts
    }

    pub fn number_of_presentation_contexts(&self) -> usize {
        self.presentation_contexts.len()
    }

    /// Add a role selection item,
    /// returning the item previously given for the same SOP class.
    pub fn add_role_selection(&mut self, rs: RoleSelection) -> Option<RoleSelection> {
        replace_or_push(&mut self.role_selections, rs, |a, b| {
            a.sop_class_uid == b.sop_class_uid
        })
    }

    pub fn remove_role_selection(&mut self, sop_class_uid: &str) -> Option<RoleSelection> {
        remove_where(&mut self.role_selections, |e| e.sop_class_uid == sop_class_uid)
    }

    pub fn role_selection(&self, sop_class_uid: &str) -> Option<&RoleSelection> {
        self.role_selections
            .iter()
            .find(|e| e.sop_class_uid == sop_class_uid)
    }

    pub fn role_selections(&self) -> &[RoleSelection] {
        &self.role_selections
    }

    /// Add an extended negotiation item,
    /// returning the item previously given for the same SOP class.
    pub fn add_extended_negotiation(
        &mut self,
        item: ExtendedNegotiation,
    ) -> Option<ExtendedNegotiation> {
        replace_or_push(&mut self.extended_negotiations, item, |a, b| {
            a.sop_class_uid == b.sop_class_uid
        })
    }

    pub fn remove_extended_negotiation(
        &mut self,
        sop_class_uid: &str,
    ) -> Option<ExtendedNegotiation> {
        remove_where(&mut self.extended_negotiations, |e| {
            e.sop_class_uid == sop_class_uid
        })
    }

    pub fn extended_negotiation(&self, sop_class_uid: &str) -> Option<&ExtendedNegotiation> {
        self.extended_negotiations
            .iter()
            .find(|e| e.sop_class_uid == sop_class_uid)
    }

    pub fn extended_negotiations(&self) -> &[ExtendedNegotiation] {
        &self.extended_negotiations
    }

    /// Add a common extended negotiation item,
    /// returning the item previously given for the same SOP class.
    pub fn add_common_extended_negotiation(
        &mut self,
        item: CommonExtendedNegotiation,
    ) -> Option<CommonExtendedNegotiation> {
        replace_or_push(&mut self.common_extended_negotiations, item, |a, b| {
            a.sop_class_uid == b.sop_class_uid
        })
    }

    pub fn remove_common_extended_negotiation(
        &mut self,
        sop_class_uid: &str,
    ) -> Option<CommonExtendedNegotiation> {
        remove_where(&mut self.common_extended_negotiations, |e| {
            e.sop_class_uid == sop_class_uid
        })
    }

    pub fn common_extended_negotiation(
        &self,
        sop_class_uid: &str,
    ) -> Option<&CommonExtendedNegotiation> {
        self.common_extended_negotiations
            .iter()
            .find(|e| e.sop_class_uid == sop_class_uid)
    }

    pub fn common_extended_negotiations(&self) -> &[CommonExtendedNegotiation] {
        &self.common_extended_negotiations
    }

    /// The length of the user information item's content,
    /// not counting user identity negotiation.
    ///
    /// See [`AssociationRQ::user_info_length`](super::AssociationRQ::user_info_length)
    /// and [`AssociationAC::user_info_length`](super::AssociationAC::user_info_length)
    /// for the full length.
    pub fn user_info_length(&self) -> usize {
        // maximum length sub-item
        8 + 4
            + text_length(&self.implementation_class_uid)
            + if self.is_async_ops() { 8 } else { 0 }
            + self
                .role_selections
                .iter()
                .map(|rs| 4 + rs.length())
                .sum::<usize>()
            + self
                .implementation_version_name
                .as_ref()
                .map(|name| 4 + text_length(name))
                .unwrap_or(0)
            + self
                .extended_negotiations
                .iter()
                .map(|ext| 4 + ext.length())
                .sum::<usize>()
            + self
                .common_extended_negotiations
                .iter()
                .map(|ext| 4 + ext.length())
                .sum::<usize>()
    }

    /// The value of the PDU length field of a request,
    /// not counting user identity negotiation.
    pub fn length(&self) -> usize {
        self.pdu_length(PresentationContext::length, self.user_info_length())
    }

    /// The value of the PDU length field,
    /// given the length of each presentation context item's content
    /// and the length of the user information item's content.
    pub(crate) fn pdu_length<F>(&self, pc_length: F, user_info_length: usize) -> usize
    where
        F: Fn(&PresentationContext) -> usize,
    {
        FIXED_PART_LENGTH
            + 4
            + text_length(&self.application_context)
            + self
                .presentation_contexts
                .iter()
                .map(|pc| 4 + pc_length(pc))
                .sum::<usize>()
            + 4
            + user_info_length
    }

    /// Write a human readable dump of the parameters.
    pub(crate) fn write_dump(
        &self,
        f: &mut fmt::Formatter<'_>,
        title: &str,
        user_identity: Option<&dyn fmt::Display>,
    ) -> fmt::Result {
        writeln!(f, "{}[", title)?;
        writeln!(f, "  calling AET: {}", self.calling_ae_title)?;
        writeln!(f, "  called AET: {}", self.called_ae_title)?;
        writeln!(
            f,
            "  implementation class UID: {}",
            self.implementation_class_uid
        )?;
        if let Some(name) = &self.implementation_version_name {
            writeln!(f, "  implementation version name: {}", name)?;
        }
        writeln!(
            f,
            "  application context: {}",
            describe_uid(&self.application_context)
        )?;
        writeln!(f, "  protocol version: {}", self.protocol_version)?;
        writeln!(f, "  max PDU length: {}", self.max_pdu_length)?;
        writeln!(
            f,
            "  max ops invoked/performed: {}/{}",
            self.max_ops_invoked, self.max_ops_performed
        )?;
        if let Some(user_identity) = user_identity {
            writeln!(f, "  {}", user_identity)?;
        }
        for pc in &self.presentation_contexts {
            writeln!(f, "  {}", pc)?;
        }
        for rs in &self.role_selections {
            writeln!(f, "  {}", rs)?;
        }
        for ext in &self.extended_negotiations {
            writeln!(f, "  {}", ext)?;
        }
        for ext in &self.common_extended_negotiations {
            writeln!(f, "  {}", ext)?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for AssociationParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_dump(f, "A-ASSOCIATE", None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::{Error, PresentationContextResultReason};
    use matches::matches;

    #[test]
    fn defaults() {
        let params = AssociationParameters::default();
        assert_eq!(params.protocol_version(), 1);
        assert_eq!(params.max_pdu_length(), 16_384);
        assert_eq!(params.calling_ae_title(), "ANONYMOUS");
        assert_eq!(params.called_ae_title(), "ANONYMOUS");
        assert_eq!(params.application_context(), "1.2.840.10008.3.1.1.1");
        assert!(!params.is_async_ops());
        assert_eq!(params.reserved(), &[0; 32]);
    }

    #[test]
    fn ae_titles_are_limited_to_16_characters() {
        let mut params = AssociationParameters::default();
        params.set_calling_ae_title("SIXTEEN-CHARS-AE").unwrap();
        assert_eq!(params.calling_ae_title(), "SIXTEEN-CHARS-AE");

        let err = params.set_called_ae_title("SEVENTEEN-CHARS-A");
        assert!(matches!(err, Err(Error::InvalidAeTitle { .. })));
        // unchanged on failure
        assert_eq!(params.called_ae_title(), "ANONYMOUS");
    }

    #[test]
    fn uids_and_reserved_field_are_validated() {
        let mut params = AssociationParameters::default();
        assert!(matches!(
            params.set_application_context(""),
            Err(Error::MissingUid { .. })
        ));
        assert!(matches!(
            params.set_implementation_class_uid(String::new()),
            Err(Error::MissingUid { .. })
        ));
        assert!(matches!(
            params.set_reserved(&[0; 31]),
            Err(Error::InvalidReservedLength { length: 31, .. })
        ));
        params.set_reserved(&[7; 32]).unwrap();
        assert_eq!(params.reserved(), &[7; 32]);
    }

    #[test]
    fn text_must_be_encodable() {
        let mut params = AssociationParameters::default();
        // within 16 characters, but not in the default character set
        assert!(matches!(
            params.set_called_ae_title("\u{3b1}\u{3b2}\u{3b3}"),
            Err(Error::UnencodableText { .. })
        ));
        assert_eq!(params.called_ae_title(), "ANONYMOUS");
        // 16 characters taking 16 bytes once encoded
        params.set_calling_ae_title("\u{c9}CHO-SCU\u{c9}CHO-SCU").unwrap();

        assert!(matches!(
            params.set_implementation_class_uid("1.2.\u{2126}"),
            Err(Error::UnencodableText { .. })
        ));
        assert!(matches!(
            params.set_implementation_version_name(Some("\u{2603}".to_string())),
            Err(Error::UnencodableText { .. })
        ));
        assert_eq!(params.implementation_version_name(), Some(IMPLEMENTATION_VERSION_NAME));
    }

    #[test]
    fn presentation_context_ids_must_be_odd() {
        let mut params = AssociationParameters::default();
        for id in [0, 2, 254] {
            assert!(matches!(
                params.add_presentation_context(PresentationContext::new(id, "1.2.3")),
                Err(Error::InvalidPresentationContextId { .. })
            ));
        }
        assert_eq!(params.number_of_presentation_contexts(), 0);
    }

    #[test]
    fn at_most_128_presentation_contexts() {
        let mut params = AssociationParameters::default();
        for id in 0..=255 {
            let _ = params.add_presentation_context(PresentationContext::new(id, "1.2.3"));
        }
        assert_eq!(params.number_of_presentation_contexts(), MAX_PRESENTATION_CONTEXTS);
        assert!(params.presentation_contexts().iter().all(|pc| pc.id() % 2 == 1));

        // replacing one keeps the count
        let old = params
            .add_presentation_context(PresentationContext::new(255, "4.5.6"))
            .unwrap();
        assert_eq!(old, Some(PresentationContext::new(255, "1.2.3")));
        assert_eq!(params.number_of_presentation_contexts(), MAX_PRESENTATION_CONTEXTS);
    }

    #[test]
    fn presentation_context_with_same_id_is_replaced_in_place() {
        let mut params = AssociationParameters::default();
        assert!(params
            .add_presentation_context(PresentationContext::new(1, "1.2.3"))
            .unwrap()
            .is_none());
        assert!(params
            .add_presentation_context(PresentationContext::new(3, "4.5.6"))
            .unwrap()
            .is_none());

        let old = params
            .add_presentation_context(PresentationContext::new(1, "7.8.9"))
            .unwrap();
        assert_eq!(old, Some(PresentationContext::new(1, "1.2.3")));

        assert_eq!(params.number_of_presentation_contexts(), 2);
        let ids: Vec<_> = params.presentation_contexts().iter().map(|pc| pc.id()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(
            params.presentation_context(1).and_then(|pc| pc.abstract_syntax()),
            Some("7.8.9")
        );
    }

    #[test]
    fn remove_presentation_context_requires_same_content() {
        let mut params = AssociationParameters::default();
        params
            .add_presentation_context(PresentationContext::new(1, "1.2.3"))
            .unwrap();

        assert!(!params.remove_presentation_context(&PresentationContext::new(1, "4.5.6")));
        assert_eq!(params.number_of_presentation_contexts(), 1);

        assert!(params.remove_presentation_context(&PresentationContext::new(1, "1.2.3")));
        assert_eq!(params.number_of_presentation_contexts(), 0);
        assert!(params.presentation_context(1).is_none());
    }

    #[test]
    fn negotiation_items_are_keyed_by_sop_class() {
        let mut params = AssociationParameters::default();
        assert!(params
            .add_role_selection(RoleSelection::new("1.2.3", true, false))
            .is_none());
        params.add_role_selection(RoleSelection::new("4.5.6", true, true));
        let previous = params.add_role_selection(RoleSelection::new("1.2.3", false, true));
        assert_eq!(previous, Some(RoleSelection::new("1.2.3", true, false)));
        assert_eq!(params.role_selections().len(), 2);
        assert_eq!(params.role_selections()[0].sop_class_uid, "1.2.3");
        assert!(params.role_selection("1.2.3").unwrap().scp_role);

        params.add_extended_negotiation(ExtendedNegotiation::new("1.2.3", vec![1]));
        params.add_extended_negotiation(ExtendedNegotiation::new("1.2.3", vec![2]));
        assert_eq!(params.extended_negotiations().len(), 1);
        assert_eq!(params.extended_negotiation("1.2.3").unwrap().info, vec![2]);
        assert!(params.remove_extended_negotiation("1.2.3").is_some());
        assert!(params.extended_negotiation("1.2.3").is_none());

        params.add_common_extended_negotiation(CommonExtendedNegotiation::new("1.2.3", "4.5"));
        assert!(params.common_extended_negotiation("1.2.3").is_some());
        assert!(params.remove_common_extended_negotiation("9.9").is_none());
    }

    #[test]
    fn user_info_length_accounts_for_optional_items() {
        let mut params = AssociationParameters::default();
        params.set_implementation_class_uid("1.2.3.4").unwrap();
        params.set_implementation_version_name(None).unwrap();
        // max length (8) + implementation class UID (4 + 7)
        assert_eq!(params.user_info_length(), 19);

        params.set_max_ops_invoked(0);
        assert!(params.is_async_ops());
        assert_eq!(params.user_info_length(), 27);

        params
            .set_implementation_version_name(Some("TEST".to_string()))
            .unwrap();
        assert_eq!(params.user_info_length(), 35);

        // one byte per character in the default character set
        params
            .set_implementation_version_name(Some("T\u{c9}ST".to_string()))
            .unwrap();
        assert_eq!(params.user_info_length(), 35);

        params.add_role_selection(RoleSelection::new("1.2", true, false));
        assert_eq!(params.user_info_length(), 35 + 4 + 4 + 3);
    }

    #[test]
    fn pdu_length_of_echo_request() {
        let mut params = AssociationParameters::default();
        params.set_implementation_class_uid("1.2.3.4").unwrap();
        params.set_implementation_version_name(None).unwrap();
        let mut pc = PresentationContext::new(1, "1.2.840.10008.1.1");
        pc.add_transfer_syntax("1.2.840.10008.1.2").unwrap();
        params.add_presentation_context(pc).unwrap();

        // fixed part + application context + presentation context + user information
        assert_eq!(params.length(), 68 + (4 + 21) + (4 + 46) + (4 + 19));
    }

    #[test]
    fn dump_lists_items_in_order() {
        let mut params = AssociationParameters::default();
        params
            .add_presentation_context(PresentationContext::rejected(
                1,
                PresentationContextResultReason::NoReason,
            ))
            .unwrap();
        params.add_role_selection(RoleSelection::new("1.2.3", true, false));
        let dump = params.to_string();
        let pc_at = dump.find("PresentationContext[").unwrap();
        let rs_at = dump.find("RoleSelection[").unwrap();
        assert!(dump.starts_with("A-ASSOCIATE[\n"));
        assert!(pc_at < rs_at);
        assert!(dump.contains("2 - no-reason (provider rejection)"));
    }
}
