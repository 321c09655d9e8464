//! PDU reader module
use crate::pdu::*;
use byteordered::byteorder::{BigEndian, ReadBytesExt};
use dicom_encoding::text::{DecodeTextError, DefaultCharacterSetCodec, TextCodec};
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::io::{Cursor, ErrorKind, Read};
use tracing::warn;

/// The default maximum PDU size
pub const DEFAULT_MAX_PDU: u32 = 16_384;

/// The minimum PDU size,
/// as specified by the standard
pub const MINIMUM_PDU_SIZE: u32 = 4_096;

/// The maximum PDU size,
/// as specified by the standard
pub const MAXIMUM_PDU_SIZE: u32 = 131_072;

/// The length of the PDU header in bytes,
/// comprising the PDU type (1 byte),
/// reserved byte (1 byte),
/// and PDU length (4 bytes).
pub const PDU_HEADER_SIZE: u32 = 6;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Invalid max PDU length {}", max_pdu_length))]
    InvalidMaxPdu {
        max_pdu_length: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("No PDU available"))]
    NoPduAvailable { backtrace: Backtrace },

    #[snafu(display("Could not read PDU"))]
    ReadPdu {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not read PDU item"))]
    ReadPduItem {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not read PDU field `{}`", field))]
    ReadPduField {
        field: &'static str,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid item length {} (must be >=2)", length))]
    InvalidItemLength { length: u32 },

    #[snafu(display("Could not read {} reserved bytes", bytes))]
    ReadReserved {
        bytes: u32,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display(
        "Incoming pdu was too large: length {}, maximum is {}",
        pdu_length,
        max_pdu_length
    ))]
    PduTooLarge {
        pdu_length: u32,
        max_pdu_length: u32,
        backtrace: Backtrace,
    },
    #[snafu(display("PDU contained an invalid value {:?}", var_item))]
    InvalidPduVariable {
        var_item: PduVariableItem,
        backtrace: Backtrace,
    },
    #[snafu(display("Multiple transfer syntaxes were accepted"))]
    MultipleTransferSyntaxesAccepted { backtrace: Backtrace },
    #[snafu(display("Invalid abort service provider"))]
    InvalidAbortSourceOrReason { backtrace: Backtrace },
    #[snafu(display("Invalid presentation context result reason"))]
    InvalidPresentationContextResultReason { backtrace: Backtrace },
    #[snafu(display("invalid transfer syntax sub-item"))]
    InvalidTransferSyntaxSubItem { backtrace: Backtrace },
    #[snafu(display("unknown presentation context sub-item"))]
    UnknownPresentationContextSubItem { backtrace: Backtrace },
    #[snafu(display("Could not decode text field `{}`", field))]
    DecodeText {
        field: &'static str,
        #[snafu(backtrace)]
        source: DecodeTextError,
    },
    #[snafu(display("Missing application context name"))]
    MissingApplicationContextName { backtrace: Backtrace },
    #[snafu(display("Missing abstract syntax"))]
    MissingAbstractSyntax { backtrace: Backtrace },
    #[snafu(display("Missing transfer syntax"))]
    MissingTransferSyntax { backtrace: Backtrace },
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn read_pdu<R>(reader: &mut R, max_pdu_length: u32, strict: bool) -> Result<Pdu>
where
    R: Read,
{
    ensure!(
        (MINIMUM_PDU_SIZE..=MAXIMUM_PDU_SIZE).contains(&max_pdu_length),
        InvalidMaxPduSnafu { max_pdu_length }
    );

    // Failing to read the first bytes means that no PDU is available,
    // usually because the peer closed the connection.
    // An unexpected end of stream after this point is a reading error.
    let mut bytes = [0; 2];
    if let Err(e) = reader.read_exact(&mut bytes) {
        ensure!(e.kind() != ErrorKind::UnexpectedEof, NoPduAvailableSnafu);
        return Err(e).context(ReadPduFieldSnafu { field: "type" });
    }

    let pdu_type = bytes[0];
    let pdu_length = reader
        .read_u32::<BigEndian>()
        .context(ReadPduFieldSnafu { field: "length" })?;

    // Check max_pdu_length
    if strict {
        ensure!(
            pdu_length <= max_pdu_length,
            PduTooLargeSnafu {
                pdu_length,
                max_pdu_length
            }
        );
    } else if pdu_length > max_pdu_length {
        ensure!(
            pdu_length <= MAXIMUM_PDU_SIZE,
            PduTooLargeSnafu {
                pdu_length,
                max_pdu_length: MAXIMUM_PDU_SIZE
            }
        );
        warn!(
            "Incoming pdu was too large: length {}, maximum is {}",
            pdu_length, max_pdu_length
        );
    }

    let bytes = read_n(reader, pdu_length as usize).context(ReadPduSnafu)?;
    let mut cursor = Cursor::new(bytes);
    let codec = DefaultCharacterSetCodec;

    match pdu_type {
        0x01 | 0x02 => read_association(&mut cursor, &codec, pdu_type),
        0x03 => {
            // A-ASSOCIATE-RJ PDU Structure

            // 7 - Reserved
            cursor
                .read_u8()
                .context(ReadReservedSnafu { bytes: 1_u32 })?;

            // 8 - Result: 1 for rejected-permanent, 2 for rejected-transient
            let result = cursor
                .read_u8()
                .context(ReadPduFieldSnafu { field: "Result" })?;

            // 9 - Source
            let source = cursor
                .read_u8()
                .context(ReadPduFieldSnafu { field: "Source" })?;

            // 10 - Reason/Diag., its meaning depends on the source
            let reason = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Reason/Diag.",
            })?;

            Ok(Pdu::AssociationRJ(AssociationRJ::from_codes(
                result, source, reason,
            )))
        }
        0x04 => {
            // P-DATA-TF PDU Structure

            // 7-xxx - Presentation-data-value Item(s)
            let mut values = vec![];
            while cursor.position() < cursor.get_ref().len() as u64 {
                // 1-4 - Item-length
                let item_length = cursor.read_u32::<BigEndian>().context(ReadPduFieldSnafu {
                    field: "Item-Length",
                })?;

                ensure!(
                    item_length >= 2,
                    InvalidItemLengthSnafu {
                        length: item_length
                    }
                );

                // 5 - Presentation-context-ID
                let presentation_context_id = cursor.read_u8().context(ReadPduFieldSnafu {
                    field: "Presentation-context-ID",
                })?;

                // 6 - Message Control Header:
                // bit 0 tells whether the fragment is a command (1) or a data set (0),
                // bit 1 tells whether this is the last fragment
                let header = cursor.read_u8().context(ReadPduFieldSnafu {
                    field: "Message Control Header",
                })?;

                let value_type = if header & 0x01 > 0 {
                    PDataValueType::Command
                } else {
                    PDataValueType::Data
                };
                let is_last = (header & 0x02) > 0;

                let data =
                    read_n(&mut cursor, (item_length - 2) as usize).context(ReadPduFieldSnafu {
                        field: "Presentation-data-value",
                    })?;

                values.push(PDataValue {
                    presentation_context_id,
                    value_type,
                    is_last,
                    data,
                })
            }

            Ok(Pdu::PData { data: values })
        }
        0x05 | 0x06 => {
            // A-RELEASE-RQ/RP PDU Structure

            // 7-10 - Reserved
            let mut reserved = [0; 4];
            cursor
                .read_exact(&mut reserved)
                .context(ReadReservedSnafu { bytes: 4_u32 })?;

            if pdu_type == 0x05 {
                Ok(Pdu::ReleaseRQ)
            } else {
                Ok(Pdu::ReleaseRP)
            }
        }
        0x07 => {
            // A-ABORT PDU Structure

            // 7-8 - Reserved
            let mut buf = [0u8; 2];
            cursor
                .read_exact(&mut buf)
                .context(ReadReservedSnafu { bytes: 2_u32 })?;

            // 9 - Source: 0 for service user, 2 for service provider
            // 10 - Reason/Diag, only significant for service provider aborts
            let source = AbortRQSource::from(
                cursor
                    .read_u8()
                    .context(ReadPduFieldSnafu { field: "Source" })?,
                cursor.read_u8().context(ReadPduFieldSnafu {
                    field: "Reason/Diag",
                })?,
            )
            .context(InvalidAbortSourceOrReasonSnafu)?;

            Ok(Pdu::AbortRQ { source })
        }
        _ => Ok(Pdu::Unknown {
            pdu_type,
            data: cursor.into_inner(),
        }),
    }
}

/// Read exactly `bytes_to_read` bytes.
fn read_n<R>(reader: &mut R, bytes_to_read: usize) -> std::io::Result<Vec<u8>>
where
    R: Read,
{
    let mut result = Vec::new();
    reader.take(bytes_to_read as u64).read_to_end(&mut result)?;
    if result.len() < bytes_to_read {
        return Err(ErrorKind::UnexpectedEof.into());
    }
    Ok(result)
}

/// Read a UID or other text field of the given length,
/// without leading or trailing padding.
fn read_text<R>(
    reader: &mut R,
    codec: &dyn TextCodec,
    length: usize,
    field: &'static str,
) -> Result<String>
where
    R: Read,
{
    let bytes = read_n(reader, length).context(ReadPduFieldSnafu { field })?;
    let text = codec.decode(&bytes).context(DecodeTextSnafu { field })?;
    Ok(text
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string())
}

/// Read a text field preceded by its length in 2 bytes.
fn read_text_u16<R>(reader: &mut R, codec: &dyn TextCodec, field: &'static str) -> Result<String>
where
    R: Read,
{
    let length = reader
        .read_u16::<BigEndian>()
        .context(ReadPduFieldSnafu { field })?;
    read_text(reader, codec, length as usize, field)
}

/// Read a byte field preceded by its length in 2 bytes.
fn read_bytes_u16<R>(reader: &mut R, field: &'static str) -> Result<Vec<u8>>
where
    R: Read,
{
    let length = reader
        .read_u16::<BigEndian>()
        .context(ReadPduFieldSnafu { field })?;
    read_n(reader, length as usize).context(ReadPduFieldSnafu { field })
}

fn read_association(
    cursor: &mut Cursor<Vec<u8>>,
    codec: &dyn TextCodec,
    pdu_type: u8,
) -> Result<Pdu> {
    // 7-8 - Protocol-version, version 1 is identified by bit 0
    let protocol_version = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
        field: "Protocol-version",
    })?;

    // 9-10 - Reserved
    cursor
        .read_u16::<BigEndian>()
        .context(ReadReservedSnafu { bytes: 2_u32 })?;

    // 11-26 - Called-AE-title, space padded
    let called_ae_title = read_text(cursor, codec, 16, "Called-AE-title")?;

    // 27-42 - Calling-AE-title, space padded
    let calling_ae_title = read_text(cursor, codec, 16, "Calling-AE-title")?;

    // 43-74 - Reserved
    let mut reserved = [0; 32];
    cursor
        .read_exact(&mut reserved)
        .context(ReadReservedSnafu { bytes: 32_u32 })?;

    let mut params = AssociationParameters {
        protocol_version,
        called_ae_title,
        calling_ae_title,
        reserved,
        implementation_class_uid: String::new(),
        implementation_version_name: None,
        ..Default::default()
    };

    let mut application_context_name = None;
    let mut user_information = None;

    // 75-xxx - Variable items: one application context item,
    // one or more presentation context items and one user information item
    while cursor.position() < cursor.get_ref().len() as u64 {
        match (pdu_type, read_pdu_variable(cursor, codec)?) {
            (_, PduVariableItem::ApplicationContext(val)) => {
                application_context_name = Some(val);
            }
            (0x01, PduVariableItem::PresentationContextProposed(pc))
            | (0x02, PduVariableItem::PresentationContextResult(pc)) => {
                params.insert_presentation_context(pc);
            }
            (_, PduVariableItem::UserVariables(val)) => {
                user_information = Some(*val);
            }
            (_, var_item) => {
                return InvalidPduVariableSnafu { var_item }.fail();
            }
        }
    }

    params.application_context =
        application_context_name.context(MissingApplicationContextNameSnafu)?;

    let info = user_information.unwrap_or_default();
    params.max_pdu_length = info.max_length.unwrap_or(DEFAULT_MAX_PDU);
    params.implementation_class_uid = info.implementation_class_uid.unwrap_or_default();
    params.implementation_version_name = info.implementation_version_name;
    if let Some((invoked, performed)) = info.async_ops_window {
        params.max_ops_invoked = invoked;
        params.max_ops_performed = performed;
    }
    for item in info.role_selections {
        params.add_role_selection(item);
    }
    for item in info.extended_negotiations {
        params.add_extended_negotiation(item);
    }
    for item in info.common_extended_negotiations {
        params.add_common_extended_negotiation(item);
    }

    if pdu_type == 0x01 {
        if info.user_identity_ac.is_some() {
            warn!("Ignoring user identity server response in association request");
        }
        let mut rq = AssociationRQ::from_parameters(params);
        rq.set_user_identity(info.user_identity_rq);
        Ok(Pdu::AssociationRQ(rq))
    } else {
        if info.user_identity_rq.is_some() {
            warn!("Ignoring user identity request in association acknowledgement");
        }
        let mut ac = AssociationAC::from_parameters(params);
        ac.set_user_identity(info.user_identity_ac);
        Ok(Pdu::AssociationAC(ac))
    }
}

fn read_pdu_variable<R>(reader: &mut R, codec: &dyn TextCodec) -> Result<PduVariableItem>
where
    R: Read,
{
    // 1 - Item-type - XXH
    let item_type = reader
        .read_u8()
        .context(ReadPduFieldSnafu { field: "Item-type" })?;

    // 2 - Reserved
    reader
        .read_u8()
        .context(ReadReservedSnafu { bytes: 1_u32 })?;

    // 3-4 - Item-length
    let item_length = reader.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
        field: "Item-length",
    })?;

    let bytes = read_n(reader, item_length as usize).context(ReadPduItemSnafu)?;
    let length = bytes.len();
    let mut cursor = Cursor::new(bytes);

    match item_type {
        0x10 => {
            // Application Context Item Structure
            let val = read_text(&mut cursor, codec, length, "Application-context-name")?;
            Ok(PduVariableItem::ApplicationContext(val))
        }
        0x20 => {
            // Presentation Context Item Structure (proposed)

            let mut abstract_syntax: Option<String> = None;
            let mut transfer_syntaxes: Vec<String> = vec![];

            // 5 - Presentation-context-ID, an odd integer between 1 and 255
            let presentation_context_id = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Presentation-context-ID",
            })?;

            // 6-8 - Reserved
            let mut reserved = [0; 3];
            cursor
                .read_exact(&mut reserved)
                .context(ReadReservedSnafu { bytes: 3_u32 })?;

            // 9-xxx - one Abstract Syntax and one or more Transfer Syntax sub-items
            while cursor.position() < length as u64 {
                let (item_type, item_length) = read_sub_item_header(&mut cursor)?;

                match item_type {
                    0x30 => {
                        // Abstract Syntax Sub-Item Structure
                        abstract_syntax = Some(read_text(
                            &mut cursor,
                            codec,
                            item_length,
                            "Abstract-syntax-name",
                        )?);
                    }
                    0x40 => {
                        // Transfer Syntax Sub-Item Structure
                        let ts =
                            read_text(&mut cursor, codec, item_length, "Transfer-syntax-name")?;
                        if ts.is_empty() {
                            warn!(
                                "Ignoring empty transfer syntax in presentation context #{}",
                                presentation_context_id
                            );
                        } else if !transfer_syntaxes.contains(&ts) {
                            transfer_syntaxes.push(ts);
                        }
                    }
                    _ => {
                        return UnknownPresentationContextSubItemSnafu.fail();
                    }
                }
            }

            Ok(PduVariableItem::PresentationContextProposed(
                PresentationContext::from_parts(
                    presentation_context_id,
                    PresentationContextResultReason::Acceptance,
                    Some(abstract_syntax.context(MissingAbstractSyntaxSnafu)?),
                    transfer_syntaxes,
                ),
            ))
        }
        0x21 => {
            // Presentation Context Item Structure (result)

            let mut transfer_syntax: Option<String> = None;

            // 5 - Presentation-context-ID
            let presentation_context_id = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Presentation-context-ID",
            })?;

            // 6 - Reserved
            cursor
                .read_u8()
                .context(ReadReservedSnafu { bytes: 1_u32 })?;

            // 7 - Result/Reason
            let reason = PresentationContextResultReason::from(cursor.read_u8().context(
                ReadPduFieldSnafu {
                    field: "Result/Reason",
                },
            )?)
            .context(InvalidPresentationContextResultReasonSnafu)?;

            // 8 - Reserved
            cursor
                .read_u8()
                .context(ReadReservedSnafu { bytes: 1_u32 })?;

            // 9-xxx - Transfer syntax sub-item,
            // not significant when the context was not accepted
            while cursor.position() < length as u64 {
                let (item_type, item_length) = read_sub_item_header(&mut cursor)?;

                match item_type {
                    0x40 => {
                        // Transfer Syntax Sub-Item Structure
                        ensure!(
                            transfer_syntax.is_none(),
                            MultipleTransferSyntaxesAcceptedSnafu
                        );
                        transfer_syntax = Some(read_text(
                            &mut cursor,
                            codec,
                            item_length,
                            "Transfer-syntax-name",
                        )?);
                    }
                    _ => {
                        return InvalidTransferSyntaxSubItemSnafu.fail();
                    }
                }
            }

            if reason == PresentationContextResultReason::Acceptance {
                ensure!(
                    transfer_syntax.as_deref().map_or(false, |ts| !ts.is_empty()),
                    MissingTransferSyntaxSnafu
                );
            }

            Ok(PduVariableItem::PresentationContextResult(
                PresentationContext::from_parts(
                    presentation_context_id,
                    reason,
                    None,
                    transfer_syntax.into_iter().filter(|ts| !ts.is_empty()).collect(),
                ),
            ))
        }
        0x50 => {
            // User Information Item Structure
            let info = read_user_information(&mut cursor, codec, length)?;
            Ok(PduVariableItem::UserVariables(Box::new(info)))
        }
        _ => Ok(PduVariableItem::Unknown(item_type)),
    }
}

/// Read a sub-item's type, reserved byte and length.
fn read_sub_item_header<R>(reader: &mut R) -> Result<(u8, usize)>
where
    R: Read,
{
    // 1 - Item-type - XXH
    let item_type = reader
        .read_u8()
        .context(ReadPduFieldSnafu { field: "Item-type" })?;

    // 2 - Reserved
    reader
        .read_u8()
        .context(ReadReservedSnafu { bytes: 1_u32 })?;

    // 3-4 - Item-length
    let item_length = reader.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
        field: "Item-length",
    })?;

    Ok((item_type, item_length as usize))
}

fn read_user_information(
    cursor: &mut Cursor<Vec<u8>>,
    codec: &dyn TextCodec,
    length: usize,
) -> Result<UserInformation> {
    let mut info = UserInformation::default();

    // 5-xxx - User-data sub-items
    while cursor.position() < length as u64 {
        let (item_type, item_length) = read_sub_item_header(cursor)?;
        let bytes = read_n(cursor, item_length).context(ReadPduItemSnafu)?;
        let mut item = Cursor::new(bytes);

        match item_type {
            0x51 => {
                // Maximum Length Sub-Item Structure
                // 5-8 - Maximum-length-received, 0 for no limit
                info.max_length =
                    Some(item.read_u32::<BigEndian>().context(ReadPduFieldSnafu {
                        field: "Maximum-length-received",
                    })?);
            }
            0x52 => {
                // Implementation Class UID Sub-Item Structure
                info.implementation_class_uid = Some(read_text(
                    &mut item,
                    codec,
                    item_length,
                    "Implementation-class-uid",
                )?);
            }
            0x53 => {
                // Asynchronous Operations Window Sub-Item Structure
                let invoked = item.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                    field: "Maximum-number-operations-invoked",
                })?;
                let performed = item.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                    field: "Maximum-number-operations-performed",
                })?;
                info.async_ops_window = Some((invoked, performed));
            }
            0x54 => {
                // SCP/SCU Role Selection Sub-Item Structure
                let sop_class_uid = read_text_u16(&mut item, codec, "SOP-class-uid")?;
                let scu_role = item
                    .read_u8()
                    .context(ReadPduFieldSnafu { field: "SCU-role" })?;
                let scp_role = item
                    .read_u8()
                    .context(ReadPduFieldSnafu { field: "SCP-role" })?;
                info.role_selections.push(RoleSelection::new(
                    sop_class_uid,
                    scu_role != 0,
                    scp_role != 0,
                ));
            }
            0x55 => {
                // Implementation Version Name Sub-Item Structure
                info.implementation_version_name = Some(read_text(
                    &mut item,
                    codec,
                    item_length,
                    "Implementation-version-name",
                )?);
            }
            0x56 => {
                // SOP Class Extended Negotiation Sub-Item Structure
                let sop_class_uid = read_text_u16(&mut item, codec, "SOP-class-uid")?;

                // the service class application information takes the rest of the sub-item
                let mut data = Vec::new();
                item.read_to_end(&mut data).context(ReadPduFieldSnafu {
                    field: "Service-class-application-information",
                })?;

                info.extended_negotiations
                    .push(ExtendedNegotiation::new(sop_class_uid, data));
            }
            0x57 => {
                // SOP Class Common Extended Negotiation Sub-Item Structure
                let sop_class_uid = read_text_u16(&mut item, codec, "SOP-class-uid")?;
                let service_class_uid = read_text_u16(&mut item, codec, "Service-class-uid")?;
                let related = read_bytes_u16(
                    &mut item,
                    "Related-general-sop-class-identification",
                )?;

                let mut ext = CommonExtendedNegotiation::new(sop_class_uid, service_class_uid);
                let related_length = related.len() as u64;
                let mut related = Cursor::new(related);
                while related.position() < related_length {
                    let uid =
                        read_text_u16(&mut related, codec, "Related-general-sop-class-uid")?;
                    ext.related_general_sop_classes.push(uid);
                }
                info.common_extended_negotiations.push(ext);
            }
            0x58 => {
                // User Identity Negotiation (request)

                // 5 - User-Identity-Type
                let user_identity_type = item.read_u8().context(ReadPduFieldSnafu {
                    field: "User-Identity-type",
                })?;

                // 6 - Positive-response-requested
                let positive_response_requested = item.read_u8().context(ReadPduFieldSnafu {
                    field: "User-Identity-positive-response-requested",
                })?;

                // 7-n - Primary-field, preceded by its length
                let primary_field =
                    read_bytes_u16(&mut item, "User-Identity-primary-field")?;

                // n+1-m - Secondary-field, preceded by its length,
                // only non-empty for username and passcode
                let secondary_field =
                    read_bytes_u16(&mut item, "User-Identity-secondary-field")?;

                match UserIdentityType::from(user_identity_type) {
                    Some(identity_type) => {
                        info.user_identity_rq = Some(UserIdentityRQ::new(
                            identity_type,
                            positive_response_requested == 1,
                            primary_field,
                            secondary_field,
                        ));
                    }
                    None => {
                        warn!("Unknown User Identity Type code {}", user_identity_type);
                    }
                }
            }
            0x59 => {
                // User Identity Negotiation (server response)
                let server_response = read_bytes_u16(&mut item, "Server-response")?;
                info.user_identity_ac = Some(UserIdentityAC::new(server_response));
            }
            _ => {
                warn!(
                    "Skipping unknown user information sub-item {:02X}H ({} bytes)",
                    item_type, item_length
                );
            }
        }
    }

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use matches::matches;

    #[test]
    fn reads_association_rj() {
        let bytes = [0x03, 0, 0, 0, 0, 4, 0, 1, 1, 2];
        let pdu = read_pdu(&mut &bytes[..], DEFAULT_MAX_PDU, true).unwrap();
        match pdu {
            Pdu::AssociationRJ(rj) => {
                assert_eq!(rj.codes(), (1, 1, 2));
                assert_eq!(rj.description(), "application-context-name-not-supported");
            }
            pdu => panic!("unexpected PDU {:?}", pdu),
        }
    }

    #[test]
    fn reads_rj_with_unknown_codes() {
        let bytes = [0x03, 0, 0, 0, 0, 4, 0, 2, 3, 99];
        let pdu = read_pdu(&mut &bytes[..], DEFAULT_MAX_PDU, true).unwrap();
        assert!(matches!(pdu, Pdu::AssociationRJ(rj) if rj.description() == "reserved"));
    }

    #[test]
    fn no_pdu_on_empty_stream() {
        let bytes: [u8; 0] = [];
        assert!(matches!(
            read_pdu(&mut &bytes[..], DEFAULT_MAX_PDU, true),
            Err(Error::NoPduAvailable { .. })
        ));
    }

    #[test]
    fn truncated_pdu_fails() {
        let bytes = [0x05, 0, 0, 0, 0, 4, 0, 0];
        assert!(matches!(
            read_pdu(&mut &bytes[..], DEFAULT_MAX_PDU, true),
            Err(Error::ReadPdu { .. })
        ));
    }

    #[test]
    fn oversized_pdu_depends_on_strictness() {
        let mut bytes = vec![0x04, 0, 0, 0, 0x50, 0x06];
        // one presentation data value item filling the PDU
        bytes.extend_from_slice(&[0, 0, 0x50, 0x02, 1, 0x02]);
        bytes.resize(6 + 0x5006, 0);

        assert!(matches!(
            read_pdu(&mut &bytes[..], DEFAULT_MAX_PDU, true),
            Err(Error::PduTooLarge { .. })
        ));

        let pdu = read_pdu(&mut &bytes[..], DEFAULT_MAX_PDU, false).unwrap();
        match pdu {
            Pdu::PData { data } => {
                assert_eq!(data.len(), 1);
                assert_eq!(data[0].data.len(), 0x5000);
                assert!(data[0].is_last);
                assert_eq!(data[0].value_type, PDataValueType::Data);
            }
            pdu => panic!("unexpected PDU {:?}", pdu),
        }
    }

    #[test]
    fn invalid_max_pdu_is_refused() {
        let bytes = [0x05, 0, 0, 0, 0, 4, 0, 0, 0, 0];
        assert!(matches!(
            read_pdu(&mut &bytes[..], 1024, true),
            Err(Error::InvalidMaxPdu { .. })
        ));
    }

    #[test]
    fn unknown_user_information_sub_items_are_skipped() {
        let mut user_info = vec![];
        // maximum length
        user_info.extend_from_slice(&[0x51, 0, 0, 4, 0, 0, 0x40, 0]);
        // implementation class UID
        user_info.extend_from_slice(&[0x52, 0, 0, 3]);
        user_info.extend_from_slice(b"1.2");
        // unknown sub-item
        user_info.extend_from_slice(&[0x5F, 0, 0, 2, 0xAB, 0xCD]);

        let mut body = vec![0, 1, 0, 0];
        body.extend_from_slice(b"CALLED-AE       ");
        body.extend_from_slice(b"CALLING-AE      ");
        body.extend_from_slice(&[0; 32]);
        body.extend_from_slice(&[0x10, 0, 0, 21]);
        body.extend_from_slice(b"1.2.840.10008.3.1.1.1");
        body.extend_from_slice(&[0x50, 0, 0, user_info.len() as u8]);
        body.extend_from_slice(&user_info);

        let mut bytes = vec![0x01, 0, 0, 0, 0, body.len() as u8];
        bytes.extend_from_slice(&body);

        let pdu = read_pdu(&mut &bytes[..], DEFAULT_MAX_PDU, true).unwrap();
        match pdu {
            Pdu::AssociationRQ(rq) => {
                assert_eq!(rq.called_ae_title(), "CALLED-AE");
                assert_eq!(rq.calling_ae_title(), "CALLING-AE");
                assert_eq!(rq.max_pdu_length(), 0x4000);
                assert_eq!(rq.implementation_class_uid(), "1.2");
                assert_eq!(rq.implementation_version_name(), None);
                assert_eq!(rq.number_of_presentation_contexts(), 0);
                assert!(rq.user_identity().is_none());
            }
            pdu => panic!("unexpected PDU {:?}", pdu),
        }
    }
}
