//! AES-128-CBC payload encryption.
//!
//! The protocol manages its own zero padding, so automatic unpadding is
//! disabled on decrypt and trailing pad bytes are left for each verb's
//! own slicing.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::BroadlinkError;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Encrypt a 16-byte-aligned payload with the session key and IV.
pub fn encrypt(key: &[u8; 16], iv: &[u8; 16], payload: &[u8]) -> Vec<u8> {
    Aes128CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<NoPadding>(payload)
}

/// Decrypt a reply body. The ciphertext must be a whole number of blocks.
pub fn decrypt(key: &[u8; 16], iv: &[u8; 16], ciphertext: &[u8]) -> Result<Vec<u8>, BroadlinkError> {
    Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| BroadlinkError::InvalidResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_IV, DEFAULT_KEY};

    #[test]
    fn round_trip_preserves_aligned_payload() {
        let payload = [0x42u8; 48];
        let ciphertext = encrypt(&DEFAULT_KEY, &DEFAULT_IV, &payload);
        assert_eq!(ciphertext.len(), 48);
        assert_ne!(ciphertext.as_slice(), payload.as_slice());

        let clear = decrypt(&DEFAULT_KEY, &DEFAULT_IV, &ciphertext).unwrap();
        assert_eq!(clear.as_slice(), payload.as_slice());
    }

    #[test]
    fn decrypt_keeps_trailing_zero_padding() {
        let mut payload = [0u8; 16];
        payload[..5].copy_from_slice(b"hello");
        let ciphertext = encrypt(&DEFAULT_KEY, &DEFAULT_IV, &payload);
        let clear = decrypt(&DEFAULT_KEY, &DEFAULT_IV, &ciphertext).unwrap();
        assert_eq!(clear.len(), 16);
        assert_eq!(&clear[..5], b"hello");
        assert!(clear[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn decrypt_rejects_partial_block() {
        let err = decrypt(&DEFAULT_KEY, &DEFAULT_IV, &[0u8; 17]);
        assert!(err.is_err());
    }
}
