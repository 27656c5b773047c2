// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt::Write;

use rand::RngExt;

/// Generates a random v4 UUID in hyphenated lowercase hex, used as the
/// identity for servants registered without a caller-chosen name.
pub fn generate_uuid() -> String {
    let mut raw = [0u8; 16];
    rand::rng().fill(&mut raw);

    // RFC 4122: version 4 in the high nibble of byte 6, variant 10 in the
    // top bits of byte 8.
    raw[6] = (raw[6] & 0x0F) | 0x40;
    raw[8] = (raw[8] & 0x3F) | 0x80;

    let mut out = String::with_capacity(36);
    for (i, byte) in raw.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        write!(&mut out, "{byte:02x}").expect("Writing to String cannot fail");
    }

    out
}
