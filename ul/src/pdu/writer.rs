//! PDU writer module
use crate::pdu::*;
use byteordered::byteorder::{BigEndian, WriteBytesExt};
use dicom_encoding::text::{DefaultCharacterSetCodec, EncodeTextError, TextCodec};
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::io::Write;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not write chunk of {} PDU structure", name))]
    WriteChunk {
        /// the name of the PDU structure
        name: &'static str,
        source: WriteChunkError,
    },

    #[snafu(display("Could not write field `{}`", field))]
    WriteField {
        field: &'static str,
        backtrace: Backtrace,
        source: std::io::Error,
    },

    #[snafu(display("Could not write {} reserved bytes", bytes))]
    WriteReserved {
        bytes: u32,
        backtrace: Backtrace,
        source: std::io::Error,
    },

    #[snafu(display("Could not encode field `{}`", field))]
    EncodeField {
        field: &'static str,
        #[snafu(backtrace)]
        source: EncodeTextError,
    },

    #[snafu(display("Presentation context #{} has no abstract syntax", id))]
    MissingAbstractSyntax { id: u8, backtrace: Backtrace },

    #[snafu(display(
        "Answered presentation context #{} has {} transfer syntaxes (at most 1)",
        id,
        count
    ))]
    MultipleTransferSyntaxes {
        id: u8,
        count: usize,
        backtrace: Backtrace,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
pub enum WriteChunkError {
    #[snafu(display("Failed to build chunk"))]
    BuildChunk { source: Box<Error> },

    #[snafu(display("Chunk of {} bytes does not fit in its length field", length))]
    ChunkTooLong { length: usize, backtrace: Backtrace },

    #[snafu(display("Failed to write chunk length"))]
    WriteLength {
        backtrace: Backtrace,
        source: std::io::Error,
    },

    #[snafu(display("Failed to write chunk data"))]
    WriteData {
        backtrace: Backtrace,
        source: std::io::Error,
    },
}

/// Write the data built by `func`, preceded by its length in 4 bytes.
fn write_chunk_u32<F>(writer: &mut dyn Write, func: F) -> std::result::Result<(), WriteChunkError>
where
    F: FnOnce(&mut Vec<u8>) -> Result<()>,
{
    let mut data = vec![];
    func(&mut data).map_err(Box::from).context(BuildChunkSnafu)?;

    ensure!(
        data.len() <= u32::MAX as usize,
        ChunkTooLongSnafu { length: data.len() }
    );
    writer
        .write_u32::<BigEndian>(data.len() as u32)
        .context(WriteLengthSnafu)?;

    writer.write_all(&data).context(WriteDataSnafu)?;

    Ok(())
}

/// Write the data built by `func`, preceded by its length in 2 bytes.
fn write_chunk_u16<F>(writer: &mut dyn Write, func: F) -> std::result::Result<(), WriteChunkError>
where
    F: FnOnce(&mut Vec<u8>) -> Result<()>,
{
    let mut data = vec![];
    func(&mut data).map_err(Box::from).context(BuildChunkSnafu)?;

    ensure!(
        data.len() <= u16::MAX as usize,
        ChunkTooLongSnafu { length: data.len() }
    );
    writer
        .write_u16::<BigEndian>(data.len() as u16)
        .context(WriteLengthSnafu)?;

    writer.write_all(&data).context(WriteDataSnafu)?;

    Ok(())
}

/// Write an item or sub-item:
/// item type, a reserved byte, and the 2-byte length of the content built by `func`.
fn write_item<F>(writer: &mut dyn Write, item_type: u8, name: &'static str, func: F) -> Result<()>
where
    F: FnOnce(&mut Vec<u8>) -> Result<()>,
{
    writer
        .write_u8(item_type)
        .context(WriteFieldSnafu { field: "Item-type" })?;
    writer
        .write_u8(0x00)
        .context(WriteReservedSnafu { bytes: 1_u32 })?;
    write_chunk_u16(writer, func).context(WriteChunkSnafu { name })
}

fn write_text(
    writer: &mut dyn Write,
    codec: &dyn TextCodec,
    text: &str,
    field: &'static str,
) -> Result<()> {
    let bytes = codec.encode(text).context(EncodeFieldSnafu { field })?;
    writer.write_all(&bytes).context(WriteFieldSnafu { field })
}

/// Write text preceded by its length in 2 bytes.
fn write_text_u16(
    writer: &mut dyn Write,
    codec: &dyn TextCodec,
    text: &str,
    field: &'static str,
) -> Result<()> {
    write_chunk_u16(writer, |writer| write_text(writer, codec, text, field))
        .context(WriteChunkSnafu { name: field })
}

fn write_bytes_u16(writer: &mut dyn Write, bytes: &[u8], field: &'static str) -> Result<()> {
    write_chunk_u16(writer, |writer| {
        writer.write_all(bytes).context(WriteFieldSnafu { field })
    })
    .context(WriteChunkSnafu { name: field })
}

/// AE titles take exactly 16 bytes, padded with spaces.
fn write_ae_title(
    writer: &mut dyn Write,
    codec: &dyn TextCodec,
    ae_title: &str,
    field: &'static str,
) -> Result<()> {
    let mut bytes = codec.encode(ae_title).context(EncodeFieldSnafu { field })?;
    bytes.resize(16, b' ');
    writer.write_all(&bytes).context(WriteFieldSnafu { field })
}

pub fn write_pdu<W>(writer: &mut W, pdu: &Pdu) -> Result<()>
where
    W: Write,
{
    let codec = DefaultCharacterSetCodec;
    match pdu {
        Pdu::AssociationRQ(rq) => write_association(
            writer,
            &codec,
            AssociationPdu::Request(rq.user_identity()),
            rq.parameters(),
        ),
        Pdu::AssociationAC(ac) => write_association(
            writer,
            &codec,
            AssociationPdu::Acknowledgement(ac.user_identity()),
            ac.parameters(),
        ),
        Pdu::AssociationRJ(rj) => {
            // 1 - PDU-type - 03H
            writer
                .write_u8(0x03)
                .context(WriteFieldSnafu { field: "PDU-type" })?;

            // 2 - Reserved
            writer
                .write_u8(0x00)
                .context(WriteReservedSnafu { bytes: 1_u32 })?;

            let (result, source, reason) = rj.codes();
            write_chunk_u32(writer, |writer| {
                // 7 - Reserved
                writer
                    .write_u8(0x00)
                    .context(WriteReservedSnafu { bytes: 1_u32 })?;

                // 8 - Result
                writer
                    .write_u8(result)
                    .context(WriteFieldSnafu { field: "Result" })?;

                // 9 - Source
                writer
                    .write_u8(source)
                    .context(WriteFieldSnafu { field: "Source" })?;

                // 10 - Reason/Diag.
                writer.write_u8(reason).context(WriteFieldSnafu {
                    field: "Reason/Diag.",
                })?;

                Ok(())
            })
            .context(WriteChunkSnafu {
                name: "AssociationRJ",
            })
        }
        Pdu::PData { data } => {
            // 1 - PDU-type - 04H
            writer
                .write_u8(0x04)
                .context(WriteFieldSnafu { field: "PDU-type" })?;

            // 2 - Reserved
            writer
                .write_u8(0x00)
                .context(WriteReservedSnafu { bytes: 1_u32 })?;

            write_chunk_u32(writer, |writer| {
                // 7-xxx - Presentation-data-value Item(s)
                for presentation_data_value in data {
                    write_chunk_u32(writer, |writer| {
                        // 5 - Presentation-context-ID
                        writer
                            .write_u8(presentation_data_value.presentation_context_id)
                            .context(WriteFieldSnafu {
                                field: "Presentation-context-ID",
                            })?;

                        // message control header:
                        // bit 0 set for command fragments,
                        // bit 1 set for the last fragment
                        let mut message_header = 0x00;
                        if let PDataValueType::Command = presentation_data_value.value_type {
                            message_header |= 0x01;
                        }
                        if presentation_data_value.is_last {
                            message_header |= 0x02;
                        }
                        writer.write_u8(message_header).context(WriteFieldSnafu {
                            field: "Presentation-data-value control header",
                        })?;

                        // message fragment
                        writer
                            .write_all(&presentation_data_value.data)
                            .context(WriteFieldSnafu {
                                field: "Presentation-data-value",
                            })?;

                        Ok(())
                    })
                    .context(WriteChunkSnafu {
                        name: "Presentation-data-value item",
                    })?;
                }

                Ok(())
            })
            .context(WriteChunkSnafu { name: "PData" })
        }
        Pdu::ReleaseRQ => write_release(writer, 0x05, "ReleaseRQ"),
        Pdu::ReleaseRP => write_release(writer, 0x06, "ReleaseRP"),
        Pdu::AbortRQ { source } => {
            // 1 - PDU-type - 07H
            writer
                .write_u8(0x07)
                .context(WriteFieldSnafu { field: "PDU-type" })?;

            // 2 - Reserved
            writer
                .write_u8(0x00)
                .context(WriteReservedSnafu { bytes: 1_u32 })?;

            let (source, reason) = source.codes();
            write_chunk_u32(writer, |writer| {
                // 7-8 - Reserved
                writer
                    .write_all(&[0x00; 2])
                    .context(WriteReservedSnafu { bytes: 2_u32 })?;

                // 9 - Source
                writer
                    .write_u8(source)
                    .context(WriteFieldSnafu { field: "Source" })?;

                // 10 - Reason/Diag, not significant for service user aborts
                writer
                    .write_u8(reason)
                    .context(WriteFieldSnafu { field: "Reason/Diag" })?;

                Ok(())
            })
            .context(WriteChunkSnafu { name: "AbortRQ" })
        }
        Pdu::Unknown { pdu_type, data } => {
            // 1 - PDU-type - XXH
            writer
                .write_u8(*pdu_type)
                .context(WriteFieldSnafu { field: "PDU-type" })?;

            // 2 - Reserved
            writer
                .write_u8(0x00)
                .context(WriteReservedSnafu { bytes: 1_u32 })?;

            write_chunk_u32(writer, |writer| {
                writer
                    .write_all(data)
                    .context(WriteFieldSnafu { field: "Unknown" })
            })
            .context(WriteChunkSnafu { name: "Unknown" })
        }
    }
}

fn write_release(writer: &mut dyn Write, pdu_type: u8, name: &'static str) -> Result<()> {
    writer
        .write_u8(pdu_type)
        .context(WriteFieldSnafu { field: "PDU-type" })?;

    writer
        .write_u8(0x00)
        .context(WriteReservedSnafu { bytes: 1_u32 })?;

    // 7-10 - Reserved
    write_chunk_u32(writer, |writer| {
        writer
            .write_all(&[0u8; 4])
            .context(WriteReservedSnafu { bytes: 4_u32 })
    })
    .context(WriteChunkSnafu { name })
}

/// The kind of association PDU being written,
/// with its user identity sub-item.
#[derive(Clone, Copy)]
enum AssociationPdu<'a> {
    Request(Option<&'a UserIdentityRQ>),
    Acknowledgement(Option<&'a UserIdentityAC>),
}

fn write_association(
    writer: &mut dyn Write,
    codec: &dyn TextCodec,
    kind: AssociationPdu<'_>,
    params: &AssociationParameters,
) -> Result<()> {
    let (pdu_type, name) = match kind {
        AssociationPdu::Request(_) => (0x01, "AssociationRQ"),
        AssociationPdu::Acknowledgement(_) => (0x02, "AssociationAC"),
    };

    // 1 - PDU-type
    writer
        .write_u8(pdu_type)
        .context(WriteFieldSnafu { field: "PDU-type" })?;

    // 2 - Reserved
    writer
        .write_u8(0x00)
        .context(WriteReservedSnafu { bytes: 1_u32 })?;

    // 3-6 - PDU-length
    write_chunk_u32(writer, |writer| {
        // 7-8 - Protocol-version, version 1 is identified by bit 0
        writer
            .write_u16::<BigEndian>(params.protocol_version())
            .context(WriteFieldSnafu {
                field: "Protocol-version",
            })?;

        // 9-10 - Reserved
        writer
            .write_u16::<BigEndian>(0x00)
            .context(WriteReservedSnafu { bytes: 2_u32 })?;

        // 11-26 - Called-AE-title
        write_ae_title(writer, codec, params.called_ae_title(), "Called-AE-title")?;

        // 27-42 - Calling-AE-title
        write_ae_title(writer, codec, params.calling_ae_title(), "Calling-AE-title")?;

        // 43-74 - Reserved, sent back as received by the acceptor
        writer
            .write_all(params.reserved())
            .context(WriteReservedSnafu { bytes: 32_u32 })?;

        // 75-xxx - Variable items
        write_item(writer, 0x10, "Application Context Item", |writer| {
            write_text(
                writer,
                codec,
                params.application_context(),
                "Application-context-name",
            )
        })?;

        for pc in params.presentation_contexts() {
            match kind {
                AssociationPdu::Request(_) => write_presentation_context_rq(writer, codec, pc)?,
                AssociationPdu::Acknowledgement(_) => {
                    write_presentation_context_ac(writer, codec, pc)?
                }
            }
        }

        write_item(writer, 0x50, "User Information Item", |writer| {
            write_user_information(writer, codec, params, kind)
        })
    })
    .context(WriteChunkSnafu { name })
}

fn write_presentation_context_rq(
    writer: &mut dyn Write,
    codec: &dyn TextCodec,
    pc: &PresentationContext,
) -> Result<()> {
    let abstract_syntax = pc
        .abstract_syntax()
        .context(MissingAbstractSyntaxSnafu { id: pc.id() })?;

    write_item(writer, 0x20, "Presentation Context Item", |writer| {
        // 5 - Presentation-context-ID
        writer.write_u8(pc.id()).context(WriteFieldSnafu {
            field: "Presentation-context-ID",
        })?;

        // 6-8 - Reserved
        writer
            .write_all(&[0x00; 3])
            .context(WriteReservedSnafu { bytes: 3_u32 })?;

        // 9-xxx - one Abstract Syntax and one or more Transfer Syntax sub-items
        write_item(writer, 0x30, "Abstract Syntax Sub-Item", |writer| {
            write_text(writer, codec, abstract_syntax, "Abstract-syntax-name")
        })?;

        for transfer_syntax in pc.transfer_syntaxes() {
            write_item(writer, 0x40, "Transfer Syntax Sub-Item", |writer| {
                write_text(writer, codec, transfer_syntax, "Transfer-syntax-name")
            })?;
        }

        Ok(())
    })
}

fn write_presentation_context_ac(
    writer: &mut dyn Write,
    codec: &dyn TextCodec,
    pc: &PresentationContext,
) -> Result<()> {
    let count = pc.transfer_syntaxes().len();
    ensure!(count <= 1, MultipleTransferSyntaxesSnafu { id: pc.id(), count });

    write_item(writer, 0x21, "Presentation Context Item", |writer| {
        // 5 - Presentation-context-ID
        writer.write_u8(pc.id()).context(WriteFieldSnafu {
            field: "Presentation-context-ID",
        })?;

        // 6 - Reserved
        writer
            .write_u8(0x00)
            .context(WriteReservedSnafu { bytes: 1_u32 })?;

        // 7 - Result/Reason
        writer
            .write_u8(pc.result().code())
            .context(WriteFieldSnafu {
                field: "Result/Reason",
            })?;

        // 8 - Reserved
        writer
            .write_u8(0x00)
            .context(WriteReservedSnafu { bytes: 1_u32 })?;

        // 9-xxx - Transfer syntax sub-item,
        // left out if the context was rejected without one
        if let Some(transfer_syntax) = pc.transfer_syntax() {
            write_item(writer, 0x40, "Transfer Syntax Sub-Item", |writer| {
                write_text(writer, codec, transfer_syntax, "Transfer-syntax-name")
            })?;
        }

        Ok(())
    })
}

fn write_user_information(
    writer: &mut dyn Write,
    codec: &dyn TextCodec,
    params: &AssociationParameters,
    kind: AssociationPdu<'_>,
) -> Result<()> {
    // Maximum Length Sub-Item
    write_item(writer, 0x51, "Maximum Length Sub-Item", |writer| {
        writer
            .write_u32::<BigEndian>(params.max_pdu_length())
            .context(WriteFieldSnafu {
                field: "Maximum-length-received",
            })
    })?;

    // Implementation Class UID Sub-Item
    write_item(writer, 0x52, "Implementation Class UID Sub-Item", |writer| {
        write_text(
            writer,
            codec,
            params.implementation_class_uid(),
            "Implementation-class-uid",
        )
    })?;

    // Asynchronous Operations Window Sub-Item
    if params.is_async_ops() {
        write_item(
            writer,
            0x53,
            "Asynchronous Operations Window Sub-Item",
            |writer| {
                writer
                    .write_u16::<BigEndian>(params.max_ops_invoked())
                    .context(WriteFieldSnafu {
                        field: "Maximum-number-operations-invoked",
                    })?;
                writer
                    .write_u16::<BigEndian>(params.max_ops_performed())
                    .context(WriteFieldSnafu {
                        field: "Maximum-number-operations-performed",
                    })
            },
        )?;
    }

    // SCP/SCU Role Selection Sub-Items
    for role in params.role_selections() {
        write_item(writer, 0x54, "SCP/SCU Role Selection Sub-Item", |writer| {
            write_text_u16(writer, codec, &role.sop_class_uid, "SOP-class-uid")?;
            writer
                .write_u8(role.scu_role as u8)
                .context(WriteFieldSnafu { field: "SCU-role" })?;
            writer
                .write_u8(role.scp_role as u8)
                .context(WriteFieldSnafu { field: "SCP-role" })
        })?;
    }

    // Implementation Version Name Sub-Item
    if let Some(name) = params.implementation_version_name() {
        write_item(writer, 0x55, "Implementation Version Name Sub-Item", |writer| {
            write_text(writer, codec, name, "Implementation-version-name")
        })?;
    }

    // SOP Class Extended Negotiation Sub-Items
    for ext in params.extended_negotiations() {
        write_item(
            writer,
            0x56,
            "SOP Class Extended Negotiation Sub-Item",
            |writer| {
                write_text_u16(writer, codec, &ext.sop_class_uid, "SOP-class-uid")?;
                // the application information takes the rest of the sub-item
                writer.write_all(&ext.info).context(WriteFieldSnafu {
                    field: "Service-class-application-information",
                })
            },
        )?;
    }

    // SOP Class Common Extended Negotiation Sub-Items
    for ext in params.common_extended_negotiations() {
        write_item(
            writer,
            0x57,
            "SOP Class Common Extended Negotiation Sub-Item",
            |writer| {
                write_text_u16(writer, codec, &ext.sop_class_uid, "SOP-class-uid")?;
                write_text_u16(writer, codec, &ext.service_class_uid, "Service-class-uid")?;
                write_chunk_u16(writer, |writer| {
                    for uid in &ext.related_general_sop_classes {
                        write_text_u16(writer, codec, uid, "Related-general-sop-class-uid")?;
                    }
                    Ok(())
                })
                .context(WriteChunkSnafu {
                    name: "Related-general-sop-class-identification",
                })
            },
        )?;
    }

    // User Identity Sub-Item
    match kind {
        AssociationPdu::Request(Some(user_identity)) => {
            write_item(writer, 0x58, "User Identity Sub-Item", |writer| {
                writer
                    .write_u8(user_identity.identity_type().to_u8())
                    .context(WriteFieldSnafu {
                        field: "User-Identity-Type",
                    })?;
                writer
                    .write_u8(user_identity.positive_response_requested() as u8)
                    .context(WriteFieldSnafu {
                        field: "Positive-response-requested",
                    })?;
                write_bytes_u16(writer, user_identity.primary_field(), "Primary-field")?;
                write_bytes_u16(writer, user_identity.secondary_field(), "Secondary-field")
            })?;
        }
        AssociationPdu::Acknowledgement(Some(user_identity)) => {
            write_item(writer, 0x59, "User Identity Sub-Item", |writer| {
                write_bytes_u16(writer, user_identity.server_response(), "Server-response")
            })?;
        }
        _ => {}
    }

    Ok(())
}
