// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::rc::Rc;

use wrmi_client_rs::{
    client::handle::RemoteHandle,
    models::{
        message_type::MessageType, request::RequestHeader,
    },
    stubs::{
        dataset::Dataset,
        libref::{Libref, MemberInfo},
        listing::ListingFile,
        log::LogFile,
        server::Server,
        session::Session,
    },
};

use super::common::{body, orb_with_script, parse_frame, reply_frame};

#[test]
fn test_create_session_happy_path() {
    let (orb, state) = orb_with_script();
    let server = Server::root(&orb);

    state
        .borrow_mut()
        .push_frame(&reply_frame(0, 0, &body(|b| b.write_string("sess-1"))));

    let session = server.create_session().expect("createSession");
    assert_eq!(session.identity(), "sess-1");

    // The outbound request targets the bootstrap identity with request id 0.
    let state = state.borrow();
    let (header, mut frame) = parse_frame(&state.outbound[1]);
    assert_eq!(header.message_type().expect("type"), MessageType::Request);
    let request = RequestHeader::read_from(&mut frame).expect("request header");
    assert_eq!(request.request_id, 0);
    assert_eq!(request.target_object, "wpsserver");
    assert_eq!(request.operation, "createSession");
    assert_eq!(request.future, "");
    assert_eq!(request.flags, 0);
    assert_eq!(frame.remaining(), 0);

    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn test_create_session_null_identity_fails() {
    let (orb, state) = orb_with_script();
    let server = Server::root(&orb);

    state
        .borrow_mut()
        .push_frame(&reply_frame(0, 0, &body(|b| b.write_string(""))));

    let err = server.create_session().expect_err("null identity");
    assert!(err.to_string().contains("null session"));
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn test_server_host_queries() {
    let (orb, state) = orb_with_script();
    let server = Server::root(&orb);

    {
        let mut st = state.borrow_mut();
        st.push_frame(&reply_frame(0, 0, &body(|b| b.write_string("stats-host-7"))));
        st.push_frame(&reply_frame(1, 0, &body(|b| b.write_string("Linux"))));
    }

    assert_eq!(server.get_dns_name().expect("dns"), "stats-host-7");
    assert_eq!(server.get_os_name().expect("os"), "Linux");
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn test_server_shutdown_is_oneway() {
    let (orb, state) = orb_with_script();
    let server = Server::root(&orb);

    server.shutdown().expect("oneway shutdown");

    let state = state.borrow();
    let (header, mut frame) = parse_frame(&state.outbound[1]);
    assert_eq!(header.message_type().expect("type"), MessageType::Oneway);
    let request = RequestHeader::read_from(&mut frame).expect("request header");
    assert_eq!(request.operation, "shutdown");
    assert_eq!(orb.outstanding_buffers(), 0);
}

fn session_over(orb: &Rc<wrmi_client_rs::client::orb::Orb>) -> Session {
    Session::new(RemoteHandle::new(Rc::clone(orb), "sess-1"))
}

#[test]
fn test_session_init_variants() {
    let (orb, state) = orb_with_script();
    let session = session_over(&orb);

    {
        let mut st = state.borrow_mut();
        st.push_frame(&reply_frame(0, 0, &[]));
        st.push_frame(&reply_frame(1, 0, &[]));
    }

    session.init().expect("init");

    let options = vec![
        ("memsize".to_string(), "2G".to_string()),
        ("encoding".to_string(), "utf8".to_string()),
    ];
    session.init_with_options(&options).expect("initWithOptions");

    // Arguments: count then name/value pairs in given order.
    let state = state.borrow();
    let (_, mut frame) = parse_frame(&state.outbound[2]);
    let request = RequestHeader::read_from(&mut frame).expect("request header");
    assert_eq!(request.operation, "initWithOptions");
    assert_eq!(frame.read_i32().expect("count"), 2);
    assert_eq!(frame.read_string().expect("name"), "memsize");
    assert_eq!(frame.read_string().expect("value"), "2G");
    assert_eq!(frame.read_string().expect("name"), "encoding");
    assert_eq!(frame.read_string().expect("value"), "utf8");

    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn test_submit_text_returns_code_and_sends_source() {
    let (orb, state) = orb_with_script();
    let session = session_over(&orb);

    state
        .borrow_mut()
        .push_frame(&reply_frame(0, 0, &body(|b| b.write_i32(4))));

    let rc = session
        .submit_text("data _null_; run;")
        .expect("submitText");
    assert_eq!(rc, 4);

    let state = state.borrow();
    let (_, mut frame) = parse_frame(&state.outbound[1]);
    let request = RequestHeader::read_from(&mut frame).expect("request header");
    assert_eq!(request.operation, "submitText");
    assert_eq!(frame.read_string().expect("code"), "data _null_; run;");

    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn test_macro_variables() {
    let (orb, state) = orb_with_script();
    let session = session_over(&orb);

    {
        let mut st = state.borrow_mut();
        st.push_frame(&reply_frame(0, 0, &[]));
        st.push_frame(&reply_frame(1, 0, &body(|b| b.write_string("WIN"))));
    }

    session.set_macro_variable("sysrc", "WIN").expect("set");
    assert_eq!(session.get_macro_variable("sysrc").expect("get"), "WIN");
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn test_libref_flow() {
    let (orb, state) = orb_with_script();
    let session = session_over(&orb);

    {
        let mut st = state.borrow_mut();
        // assignLibref -> identity
        st.push_frame(&reply_frame(0, 0, &body(|b| b.write_string("lib-9"))));
        // getName
        st.push_frame(&reply_frame(1, 0, &body(|b| b.write_string("mydata"))));
        // getMemberInfos -> 2 members
        st.push_frame(&reply_frame(2, 0, &body(|b| {
            b.write_i32(2);
            b.write_string("prices");
            b.write_string("DATA");
            b.write_string("summary");
            b.write_string("VIEW");
        })));
    }

    let libref = session
        .assign_libref("mydata", "/srv/data", "base")
        .expect("assignLibref");
    assert_eq!(libref.identity(), "lib-9");
    assert_eq!(libref.get_name().expect("name"), "mydata");
    assert_eq!(
        libref.get_member_infos().expect("members"),
        vec![
            MemberInfo {
                name: "prices".to_string(),
                member_type: "DATA".to_string()
            },
            MemberInfo {
                name: "summary".to_string(),
                member_type: "VIEW".to_string()
            },
        ]
    );

    // assignLibref argument order: name, path, engine.
    let state = state.borrow();
    let (_, mut frame) = parse_frame(&state.outbound[1]);
    let request = RequestHeader::read_from(&mut frame).expect("request header");
    assert_eq!(request.operation, "assignLibref");
    assert_eq!(frame.read_string().expect("name"), "mydata");
    assert_eq!(frame.read_string().expect("path"), "/srv/data");
    assert_eq!(frame.read_string().expect("engine"), "base");

    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn test_dataset_metadata() {
    let (orb, state) = orb_with_script();
    let libref = Libref::new(RemoteHandle::new(Rc::clone(&orb), "lib-9"));

    {
        let mut st = state.borrow_mut();
        st.push_frame(&reply_frame(0, 0, &body(|b| b.write_string("ds-3"))));
        st.push_frame(&reply_frame(1, 0, &body(|b| b.write_i64(5_000_000_000))));
        st.push_frame(&reply_frame(2, 0, &body(|b| b.write_i32(12))));
        st.push_frame(&reply_frame(3, 0, &[]));
    }

    let dataset = libref.open_dataset("prices", "input").expect("openDataset");
    assert_eq!(dataset.identity(), "ds-3");
    assert_eq!(dataset.get_nobs().expect("nobs"), 5_000_000_000);
    assert_eq!(dataset.get_nvars().expect("nvars"), 12);
    dataset.close().expect("close");

    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn test_log_lines_decode() {
    let (orb, state) = orb_with_script();
    let log = LogFile::new(RemoteHandle::new(Rc::clone(&orb), "log-1"));

    {
        let mut st = state.borrow_mut();
        st.push_frame(&reply_frame(0, 0, &body(|b| b.write_i64(120))));
        st.push_frame(&reply_frame(1, 0, &body(|b| {
            b.write_i32(0);
            b.write_i32(2);
            b.write_u8(1);
            b.write_u8(0);
            b.write_string("NOTE: step ran");
            b.write_u8(2);
            b.write_u8(1);
            b.write_string("WARNING: truncated");
        })));
    }

    assert_eq!(log.get_line_count().expect("count"), 120);

    let (result, lines) = log.get_lines(100, 20).expect("getLines");
    assert_eq!(result, 0);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].line_type, 1);
    assert_eq!(lines[0].carriage_control, 0);
    assert_eq!(lines[0].text, "NOTE: step ran");
    assert_eq!(lines[1].text, "WARNING: truncated");

    // getLines argument order: first as i64, then max as i32.
    let state = state.borrow();
    let (_, mut frame) = parse_frame(&state.outbound[2]);
    let request = RequestHeader::read_from(&mut frame).expect("request header");
    assert_eq!(request.operation, "getLines");
    assert_eq!(frame.read_i64().expect("first"), 100);
    assert_eq!(frame.read_i32().expect("max"), 20);

    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn test_listing_pages() {
    let (orb, state) = orb_with_script();
    let listing = ListingFile::new(RemoteHandle::new(Rc::clone(&orb), "lst-1"));

    {
        let mut st = state.borrow_mut();
        st.push_frame(&reply_frame(0, 0, &body(|b| b.write_i64(2))));
        st.push_frame(&reply_frame(1, 0, &body(|b| {
            b.write_bool(true);
            b.write_i64(3);
            b.write_i32(2);
            b.write_string("The WPS System");
            b.write_string("Obs  price");
        })));
        st.push_frame(&reply_frame(2, 0, &body(|b| b.write_bool(false))));
    }

    assert_eq!(listing.get_page_count().expect("pages"), 2);

    let page = listing.get_page(1).expect("getPage").expect("page exists");
    assert_eq!(page.geometry_index, 3);
    assert_eq!(
        page.lines,
        vec!["The WPS System".to_string(), "Obs  price".to_string()]
    );

    assert_eq!(listing.get_page(99).expect("getPage"), None);
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn test_clear_listing_and_open_objects() {
    let (orb, state) = orb_with_script();
    let session = session_over(&orb);

    {
        let mut st = state.borrow_mut();
        st.push_frame(&reply_frame(0, 0, &body(|b| b.write_string("log-1"))));
        st.push_frame(&reply_frame(1, 0, &body(|b| b.write_string("lst-1"))));
        st.push_frame(&reply_frame(2, 0, &[]));
    }

    let log = session.open_log().expect("openLog");
    assert_eq!(log.identity(), "log-1");
    let listing = session.open_listing().expect("openListing");
    assert_eq!(listing.identity(), "lst-1");
    session.clear_listing_file().expect("clearListingFile");

    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn test_dataset_reference_type() {
    // Dataset handles stay value-like: cloning does not touch the wire.
    let (orb, state) = orb_with_script();
    let dataset = Dataset::new(RemoteHandle::new(Rc::clone(&orb), "ds-3"));
    let clone = dataset.clone();
    assert_eq!(clone.identity(), dataset.identity());
    assert_eq!(state.borrow().outbound.len(), 1);
}
