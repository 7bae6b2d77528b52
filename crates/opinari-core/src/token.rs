// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Response token generation.
//!
//! Every recipient gets one opaque token at survey creation. The token is the
//! only credential a recipient needs to record an answer, so it must be
//! unguessable: 32 bytes from a CSPRNG, base64url without padding (43 chars).

use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;

/// Number of random bytes behind each response token.
pub const RESPONSE_TOKEN_BYTES: usize = 32;

/// Generate a fresh URL-safe response token.
///
/// Tokens are unique per recipient in practice (collision probability over
/// 256 bits is negligible); the store additionally enforces uniqueness.
pub fn generate_response_token() -> String {
    let mut bytes = [0u8; RESPONSE_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
