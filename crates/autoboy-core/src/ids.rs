// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opaque identifier generation.

use rand::RngCore;

/// Length in random bytes of a hub client id.
pub const CLIENT_ID_BYTES: usize = 16;

/// Length in random bytes of an opaque token.
pub const TOKEN_BYTES: usize = 32;

/// Generate a hub client id: 16 random bytes, lowercase hex.
pub fn new_client_id() -> String {
    random_hex(CLIENT_ID_BYTES)
}

/// Generate an opaque token: 32 random bytes, lowercase hex.
pub fn new_token() -> String {
    random_hex(TOKEN_BYTES)
}

/// Generate a document primary key.
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ids_are_32_hex_chars() {
        let id = new_client_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn tokens_are_64_hex_chars() {
        assert_eq!(new_token().len(), 64);
    }

    #[test]
    fn ids_do_not_repeat() {
        let a = new_client_id();
        let b = new_client_id();
        assert_ne!(a, b);
        assert_ne!(new_document_id(), new_document_id());
    }
}
