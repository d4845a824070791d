//! On-chain callback payload encoding.
//!
//! Failure codes can be surfaced inline to contracts that prefer reading a
//! callback field over inspecting artifacts. The payload is the Solidity
//! ABI encoding of a `uint8`: one 32-byte big-endian word, rendered as
//! `0x` plus 64 lowercase hex characters.

use std::fmt::Write;

/// Encode a failure code as an ABI `uint8` word.
pub fn encode_error_callback(code: u8) -> String {
    let mut word = [0u8; 32];
    word[31] = code;

    let mut out = String::with_capacity(2 + 64);
    out.push_str("0x");
    for byte in word {
        // Writing to a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    out
}
