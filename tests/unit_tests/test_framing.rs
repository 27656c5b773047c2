// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use hex_literal::hex;
use wrmi_client_rs::{
    cdr::buffer::CdrBuffer,
    models::{
        common::{EYE_CATCHER, PROTOCOL_MAJOR, PROTOCOL_MINOR},
        message::MessageHeader,
        message_type::MessageType,
        reply::{ReplyHeader, ReplyStatus},
        request::RequestHeader,
    },
};

#[test]
fn test_eye_catcher_value() {
    assert_eq!(EYE_CATCHER, 0x57524D49);
    assert_eq!(&EYE_CATCHER.to_be_bytes(), b"WRMI");
}

#[test]
fn test_message_header_wire_layout() {
    // REQUEST with a 9-byte body.
    let mut buf = CdrBuffer::new(MessageHeader::SIZE);
    buf.clear();
    MessageHeader::new(MessageType::Request, 9).write_to(&mut buf);
    buf.flip();

    assert_eq!(buf.as_slice(), hex!("57 52 4D 49 02 01 01 00 00 00 00 09"));
}

#[test]
fn test_message_header_round_trip() {
    let header = MessageHeader::new(MessageType::Oneway, 123);
    let mut buf = CdrBuffer::new(32);
    buf.clear();
    header.write_to(&mut buf);
    assert_eq!(buf.position(), MessageHeader::SIZE);
    buf.flip();

    let parsed = MessageHeader::read_from(&mut buf).expect("header");
    assert_eq!(parsed, header);
    assert_eq!(parsed.protocol_major, PROTOCOL_MAJOR);
    assert_eq!(parsed.protocol_minor, PROTOCOL_MINOR);
    assert_eq!(parsed.message_type().expect("type"), MessageType::Oneway);
    parsed.validate().expect("valid header");
}

#[test]
fn test_message_header_rejects_bad_eye_catcher() {
    let mut header = MessageHeader::new(MessageType::Request, 0);
    header.eye_catcher = 0x4D525049;
    assert!(header.validate().is_err());
}

#[test]
fn test_message_header_rejects_bad_major() {
    let mut header = MessageHeader::new(MessageType::Request, 0);
    header.protocol_major = 3;
    assert!(header.validate().is_err());
}

#[test]
fn test_unknown_message_type_rejected() {
    let mut header = MessageHeader::new(MessageType::Request, 0);
    header.message_type = 9;
    assert!(header.message_type().is_err());
    assert!(MessageType::try_from(0u8).is_err());
}

#[test]
fn test_request_header_wire_layout() {
    let header = RequestHeader::new(7, "wpsserver", "ping");
    let mut buf = CdrBuffer::new(64);
    buf.clear();
    header.write_to(&mut buf);
    buf.flip();

    let mut expected = Vec::new();
    expected.extend_from_slice(&hex!("00 00 00 07"));
    expected.extend_from_slice(&hex!("00 00 00 09"));
    expected.extend_from_slice(b"wpsserver");
    // empty future still emits its length prefix
    expected.extend_from_slice(&hex!("00 00 00 00"));
    expected.extend_from_slice(&hex!("00 00 00 04"));
    expected.extend_from_slice(b"ping");
    expected.push(0);

    assert_eq!(buf.as_slice(), expected.as_slice());
}

#[test]
fn test_request_header_round_trip() {
    let header = RequestHeader {
        request_id: u32::MAX,
        target_object: "b2c6c6de-obj".to_string(),
        future: String::new(),
        operation: "getLineCount".to_string(),
        flags: 0x80,
    };
    let mut buf = CdrBuffer::new(64);
    buf.clear();
    header.write_to(&mut buf);
    buf.flip();

    assert_eq!(RequestHeader::read_from(&mut buf).expect("header"), header);
}

#[test]
fn test_reply_header_round_trip() {
    let header = ReplyHeader::new(42, ReplyStatus::UserException);
    let mut buf = CdrBuffer::new(16);
    buf.clear();
    header.write_to(&mut buf);
    assert_eq!(buf.position(), ReplyHeader::SIZE);
    buf.flip();

    assert_eq!(buf.as_slice(), hex!("00 00 00 2A 01"));
    let parsed = ReplyHeader::read_from(&mut buf).expect("header");
    assert_eq!(parsed, header);
    assert_eq!(
        parsed.reply_status().expect("status"),
        ReplyStatus::UserException
    );
}

#[test]
fn test_unknown_reply_status_rejected() {
    let header = ReplyHeader {
        request_id: 1,
        reply_status: 7,
    };
    assert!(header.reply_status().is_err());
}
