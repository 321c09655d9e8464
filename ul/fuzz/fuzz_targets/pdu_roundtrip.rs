#![no_main]
use std::error::Error;

use dicom_ul_association::pdu::{read_pdu, write_pdu, MAXIMUM_PDU_SIZE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (u32, bool, &[u8])| {
    let (maxlen, strict, data) = data;
    let _ = fuzz(maxlen, strict, data);
});

fn fuzz(maxlen: u32, strict: bool, mut data: &[u8]) -> Result<(), Box<dyn Error>> {
    // anything the reader accepts must survive the writer
    let pdu = read_pdu(&mut data, maxlen, strict)?;

    let mut bytes = Vec::new();
    write_pdu(&mut bytes, &pdu)?;

    // the first decoding may fill in defaults (maximum length, implementation UID),
    // so read the encoded form back without the original size limit
    let pdu2 = read_pdu(&mut bytes.as_slice(), MAXIMUM_PDU_SIZE, false)
        .expect("written PDU should always be readable");

    assert_eq!(pdu, pdu2, "PDU should be equal after writing and reading back");

    Ok(())
}
