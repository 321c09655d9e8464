use dicom_dictionary_std::uids;
use dicom_ul_association::pdu::{
    read_pdu, write_pdu, AbortRQServiceProviderReason, AbortRQSource, AssociationAC,
    AssociationRJ, AssociationRQ, CommonExtendedNegotiation, ExtendedNegotiation, PDataValue,
    PDataValueType, Pdu, PresentationContext, PresentationContextResultReason, RoleSelection,
    UserIdentityAC, UserIdentityRQ, UserIdentityType, DEFAULT_MAX_PDU,
};
use matches::matches;
use rstest::rstest;
use std::io::Cursor;

fn round_trip(pdu: &Pdu) -> Result<(Vec<u8>, Pdu), Box<dyn std::error::Error>> {
    let mut bytes = vec![0u8; 0];
    write_pdu(&mut bytes, pdu)?;
    let result = read_pdu(&mut Cursor::new(&bytes), DEFAULT_MAX_PDU, true)?;
    Ok((bytes, result))
}

fn storage_request() -> AssociationRQ {
    let mut rq = AssociationRQ::new();
    rq.set_calling_ae_title("STORE-SCU").unwrap();
    rq.set_called_ae_title("STORE-SCP").unwrap();
    rq.add_presentation_context_with(
        uids::VERIFICATION,
        [uids::EXPLICIT_VR_LITTLE_ENDIAN, uids::IMPLICIT_VR_LITTLE_ENDIAN],
    )
    .unwrap();
    rq.add_presentation_context_with(uids::CT_IMAGE_STORAGE, [uids::JPEG_BASELINE8_BIT])
        .unwrap();
    rq
}

#[test]
fn can_read_write_associate_rq() -> Result<(), Box<dyn std::error::Error>> {
    let mut rq = storage_request();
    rq.set_reserved(&[0x5A; 32])?;
    rq.set_max_pdu_length(32_768);
    rq.set_max_ops_invoked(4);
    rq.set_max_ops_performed(2);
    rq.set_implementation_version_name(Some("ROUND-TRIP 1".to_string()))?;
    rq.add_role_selection(RoleSelection::new(uids::CT_IMAGE_STORAGE, false, true));
    rq.add_extended_negotiation(ExtendedNegotiation::new(
        uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND,
        vec![1, 1, 0, 1, 1, 0, 1],
    ));
    rq.add_common_extended_negotiation(
        CommonExtendedNegotiation::new(uids::CT_IMAGE_STORAGE, "1.2.840.10008.4.2")
            .with_related_general_sop_class("1.2.840.10008.5.1.4.1.1.2.1"),
    );
    rq.set_user_identity(Some(
        UserIdentityRQ::username_passcode("MyUsername", &['s', 'e', 'c', 'r', 'e', 't'])
            .with_positive_response_requested(true),
    ));

    let (bytes, result) = round_trip(&rq.clone().into())?;
    assert_eq!(bytes.len(), rq.length() + 6);

    match result {
        Pdu::AssociationRQ(read) => {
            assert_eq!(read.calling_ae_title(), "STORE-SCU");
            assert_eq!(read.called_ae_title(), "STORE-SCP");
            assert_eq!(read.presentation_contexts().len(), 2);
            assert_eq!(
                read.presentation_context(3)
                    .and_then(|pc| pc.abstract_syntax()),
                Some(uids::CT_IMAGE_STORAGE)
            );
            assert_eq!(
                read.extended_negotiation(uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND)
                    .map(|ext| ext.info.clone()),
                Some(vec![1, 1, 0, 1, 1, 0, 1])
            );
            let ui = read.user_identity().unwrap();
            assert_eq!(ui.identity_type(), UserIdentityType::UsernamePasscode);
            assert!(ui.positive_response_requested());
            assert_eq!(ui.username_str(), Some("MyUsername"));
            assert_eq!(ui.passcode(), vec!['s', 'e', 'c', 'r', 'e', 't']);
            assert_eq!(read, rq);
        }
        pdu => panic!("unexpected PDU {:?}", pdu),
    }

    Ok(())
}

#[test]
fn can_read_write_associate_ac() -> Result<(), Box<dyn std::error::Error>> {
    let rq = storage_request();
    let mut ac = AssociationAC::from_request(&rq);
    ac.set_implementation_class_uid("1.2.3.4.5")?;
    ac.add_presentation_context(PresentationContext::accepted(
        1,
        uids::EXPLICIT_VR_LITTLE_ENDIAN,
    ))?;
    ac.add_presentation_context(PresentationContext::rejected(
        3,
        PresentationContextResultReason::TransferSyntaxesNotSupported,
    ))?;
    ac.add_role_selection(RoleSelection::new(uids::CT_IMAGE_STORAGE, false, true));
    ac.set_user_identity(Some(UserIdentityAC::new(b"ticket".to_vec())));

    let (bytes, result) = round_trip(&ac.clone().into())?;
    assert_eq!(bytes.len(), ac.length() + 6);

    match result {
        Pdu::AssociationAC(read) => {
            let accepted = read.presentation_context(1).unwrap();
            assert!(accepted.is_accepted());
            assert_eq!(
                accepted.transfer_syntax(),
                Some(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            );
            let rejected = read.presentation_context(3).unwrap();
            assert_eq!(
                rejected.result(),
                PresentationContextResultReason::TransferSyntaxesNotSupported
            );
            assert_eq!(rejected.transfer_syntax(), None);
            assert_eq!(
                read.user_identity().map(|ui| ui.server_response()),
                Some(&b"ticket"[..])
            );
            assert_eq!(read, ac);
        }
        pdu => panic!("unexpected PDU {:?}", pdu),
    }

    Ok(())
}

#[rstest]
#[case::no_user_identity(None)]
#[case::username(Some(UserIdentityRQ::username("alice")))]
#[case::username_passcode(Some(UserIdentityRQ::username_passcode("bob", &['1', '2', '3'])))]
#[case::kerberos(Some(UserIdentityRQ::kerberos(vec![0x6E; 300])))]
#[case::saml(Some(UserIdentityRQ::saml(b"<Assertion/>".to_vec())))]
#[case::jwt(Some(UserIdentityRQ::jwt(b"eyJhbGciOiJIUzI1NiJ9".to_vec())))]
fn request_length_matches_encoding(#[case] user_identity: Option<UserIdentityRQ>) {
    let mut rq = storage_request();
    rq.set_user_identity(user_identity);

    let mut bytes = Vec::new();
    write_pdu(&mut bytes, &rq.clone().into()).unwrap();
    assert_eq!(bytes.len(), rq.length() + 6);
    // the PDU length field
    assert_eq!(
        u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]) as usize,
        rq.length()
    );
}

#[rstest]
#[case::non_ascii_version_name(Some("V\u{c9}RSION"))]
#[case::no_version_name(None)]
fn request_length_counts_encoded_text(#[case] version_name: Option<&str>) {
    let mut rq = storage_request();
    rq.set_calling_ae_title("\u{c9}CHO-SCU").unwrap();
    rq.set_implementation_version_name(version_name.map(String::from)).unwrap();

    let mut bytes = Vec::new();
    write_pdu(&mut bytes, &rq.clone().into()).unwrap();
    assert_eq!(bytes.len(), rq.length() + 6);
}

/// An answered presentation context as the acceptor would build it
fn answered_context() -> PresentationContext {
    PresentationContext::accepted(1, uids::IMPLICIT_VR_LITTLE_ENDIAN)
}

/// A presentation context taken as proposed,
/// with the abstract syntax still in place
fn proposed_context() -> PresentationContext {
    let mut pc = PresentationContext::new(1, uids::VERIFICATION);
    pc.add_transfer_syntax(uids::IMPLICIT_VR_LITTLE_ENDIAN).unwrap();
    pc
}

#[rstest]
#[case::async_ops(answered_context(), true, false)]
#[case::no_version_name(answered_context(), false, true)]
#[case::both(answered_context(), true, true)]
#[case::abstract_syntax_left_out(proposed_context(), false, false)]
fn acknowledgement_length_matches_encoding(
    #[case] accepted: PresentationContext,
    #[case] async_ops: bool,
    #[case] no_name: bool,
) {
    let mut ac = AssociationAC::from_request(&storage_request());
    ac.add_presentation_context(accepted).unwrap();
    ac.add_presentation_context(PresentationContext::rejected(
        3,
        PresentationContextResultReason::AbstractSyntaxNotSupported,
    ))
    .unwrap();
    if async_ops {
        ac.set_max_ops_invoked(0);
    }
    if no_name {
        ac.set_implementation_version_name(None).unwrap();
    }

    let mut bytes = Vec::new();
    write_pdu(&mut bytes, &ac.clone().into()).unwrap();
    assert_eq!(bytes.len(), ac.length() + 6);
}

#[test]
fn accepted_context_keeps_one_transfer_syntax() -> Result<(), Box<dyn std::error::Error>> {
    let mut pc = PresentationContext::accepted(1, uids::EXPLICIT_VR_LITTLE_ENDIAN);
    pc.add_transfer_syntax(uids::IMPLICIT_VR_LITTLE_ENDIAN)?;
    let mut ac = AssociationAC::from_request(&storage_request());
    ac.add_presentation_context(pc)?;

    let (bytes, result) = round_trip(&ac.clone().into())?;
    assert_eq!(bytes.len(), ac.length() + 6);
    match result {
        Pdu::AssociationAC(read) => {
            assert_eq!(
                read.presentation_context(1).map(|pc| pc.transfer_syntaxes().to_vec()),
                Some(vec![uids::IMPLICIT_VR_LITTLE_ENDIAN.to_string()])
            );
            assert_eq!(read, ac);
        }
        pdu => panic!("unexpected PDU {:?}", pdu),
    }
    Ok(())
}

#[test]
fn can_read_write_associate_rj() -> Result<(), Box<dyn std::error::Error>> {
    let rj = AssociationRJ::from_codes(2, 3, 1);
    let (bytes, result) = round_trip(&rj.into())?;
    assert_eq!(bytes, vec![0x03, 0, 0, 0, 0, 4, 0, 2, 3, 1]);

    match result {
        Pdu::AssociationRJ(read) => {
            assert_eq!(read, rj);
            assert!(read.should_retry());
            assert_eq!(
                read.to_string(),
                "A-ASSOCIATE-RJ[result: 2, source: 3, reason: 1]: transient temporary-congestion"
            );
        }
        pdu => panic!("unexpected PDU {:?}", pdu),
    }

    Ok(())
}

#[test]
fn can_read_write_pdata() -> Result<(), Box<dyn std::error::Error>> {
    let pdata_rq = Pdu::PData {
        data: vec![
            PDataValue {
                presentation_context_id: 3,
                value_type: PDataValueType::Command,
                is_last: true,
                data: vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            },
            PDataValue {
                presentation_context_id: 3,
                value_type: PDataValueType::Data,
                is_last: false,
                data: vec![0xFF; 40],
            },
        ],
    };

    let (bytes, result) = round_trip(&pdata_rq)?;
    // message control headers
    assert_eq!(bytes[11], 0x03);
    assert_eq!(bytes[6 + 4 + 2 + 10 + 5], 0x00);
    assert_eq!(result, pdata_rq);

    Ok(())
}

#[test]
fn can_read_write_release_and_abort() -> Result<(), Box<dyn std::error::Error>> {
    for pdu in [Pdu::ReleaseRQ, Pdu::ReleaseRP] {
        let (bytes, result) = round_trip(&pdu)?;
        assert_eq!(bytes.len(), 10);
        assert_eq!(result, pdu);
    }

    let abort = Pdu::AbortRQ {
        source: AbortRQSource::ServiceProvider(
            AbortRQServiceProviderReason::UnrecognizedPduParameter,
        ),
    };
    let (bytes, result) = round_trip(&abort)?;
    assert_eq!(bytes, vec![0x07, 0, 0, 0, 0, 4, 0, 0, 2, 4]);
    assert_eq!(result, abort);

    Ok(())
}

#[test]
fn unknown_pdu_is_kept() -> Result<(), Box<dyn std::error::Error>> {
    let bytes = [0x09, 0, 0, 0, 0, 3, 1, 2, 3];
    let result = read_pdu(&mut Cursor::new(&bytes), DEFAULT_MAX_PDU, true)?;
    assert!(matches!(
        result,
        Pdu::Unknown { pdu_type: 0x09, ref data } if data == &[1, 2, 3]
    ));
    Ok(())
}

#[test]
fn unknown_user_identity_type_is_skipped() -> Result<(), Box<dyn std::error::Error>> {
    let mut rq = storage_request();
    rq.set_user_identity(Some(UserIdentityRQ::username("alice")));
    let mut bytes = Vec::new();
    write_pdu(&mut bytes, &rq.into())?;

    // the user identity sub-item is the last one written,
    // patch its type to an undefined value
    let pos = bytes
        .windows(4)
        .rposition(|w| w == [0x58, 0x00, 0x00, 0x0B])
        .unwrap();
    bytes[pos + 4] = 0x09;

    match read_pdu(&mut Cursor::new(&bytes), DEFAULT_MAX_PDU, true)? {
        Pdu::AssociationRQ(read) => {
            assert!(read.user_identity().is_none());
            assert_eq!(read.presentation_contexts().len(), 2);
        }
        pdu => panic!("unexpected PDU {:?}", pdu),
    }
    Ok(())
}
