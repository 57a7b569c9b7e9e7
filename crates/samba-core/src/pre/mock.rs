//! Mock PRE backend for testing
//!
//! NOT SECURE - anyone holding a public key can open what was wrapped for it.
//! Keeps the proxy, instances and tests runnable without a pairing library
//! while preserving the data flow of a real scheme:
//! - `pk = keccak(seed || sk)`
//! - wrapped keys are XORed with a keccak keystream bound to the recipient's pk
//! - a re-encryption key is `pk_from || pk_to`; `re_encrypt` swaps keystreams

use rand::{rngs::OsRng, RngCore};
use tiny_keccak::{Hasher, Keccak};

use super::*;

const KEY_LEN: usize = 32;
const SEED_LEN: usize = 32;

const PK_DOMAIN: &[u8] = b"samba-mock-pk";
const MASK_DOMAIN: &[u8] = b"samba-mock-mask";

pub struct MockScheme;

impl MockScheme {
    fn seed(pp: &PublicParams) -> PreResult<&[u8]> {
        let seed = pp.as_bytes();
        if seed.len() != SEED_LEN {
            return Err(PreError::InvalidParams(format!(
                "Mock params must be {} bytes, got {}",
                SEED_LEN,
                seed.len()
            )));
        }
        Ok(seed)
    }

    fn derive_public(seed: &[u8], secret: &[u8]) -> Vec<u8> {
        let mut out = [0u8; KEY_LEN];
        let mut hasher = Keccak::v256();
        hasher.update(PK_DOMAIN);
        hasher.update(seed);
        hasher.update(secret);
        hasher.finalize(&mut out);
        out.to_vec()
    }

    /// XOR `data` in place with the keystream bound to `pk`
    fn apply_mask(seed: &[u8], pk: &[u8], data: &mut [u8]) {
        for (counter, chunk) in data.chunks_mut(KEY_LEN).enumerate() {
            let mut block = [0u8; KEY_LEN];
            let mut hasher = Keccak::v256();
            hasher.update(MASK_DOMAIN);
            hasher.update(seed);
            hasher.update(pk);
            hasher.update(&(counter as u32).to_le_bytes());
            hasher.finalize(&mut block);
            for (byte, mask) in chunk.iter_mut().zip(block.iter()) {
                *byte ^= mask;
            }
        }
    }

    fn check_len(what: &str, bytes: &[u8], expected: usize) -> PreResult<()> {
        if bytes.len() != expected {
            return Err(PreError::InvalidKey(format!(
                "{} must be {} bytes, got {}",
                what,
                expected,
                bytes.len()
            )));
        }
        Ok(())
    }
}

impl PreScheme for MockScheme {
    fn name(&self) -> &'static str {
        "Mock (TESTING ONLY)"
    }

    fn setup(&self) -> PublicParams {
        let mut seed = vec![0u8; SEED_LEN];
        OsRng.fill_bytes(&mut seed);
        PublicParams::new(seed)
    }

    fn check_params(&self, pp: &PublicParams) -> PreResult<()> {
        Self::seed(pp).map(|_| ())
    }

    fn generate_keypair(&self, pp: &PublicParams) -> PreResult<KeyPair> {
        let seed = Self::seed(pp)?;
        let mut secret = vec![0u8; KEY_LEN];
        OsRng
            .try_fill_bytes(&mut secret)
            .map_err(|e| PreError::KeyGeneration(e.to_string()))?;
        let public = Self::derive_public(seed, &secret);

        Ok(KeyPair {
            public: PublicKey::new(public),
            secret: SecretKey::new(secret),
        })
    }

    fn check_public_key(&self, pp: &PublicParams, pk: &PublicKey) -> PreResult<()> {
        Self::seed(pp)?;
        Self::check_len("Public key", pk.as_bytes(), KEY_LEN)
    }

    fn re_encryption_key(
        &self,
        pp: &PublicParams,
        from_secret: &SecretKey,
        to_public: &PublicKey,
    ) -> PreResult<ReEncryptionKey> {
        let seed = Self::seed(pp)?;
        Self::check_len("Secret key", from_secret.as_bytes(), KEY_LEN)?;
        self.check_public_key(pp, to_public)?;

        let mut rk = Self::derive_public(seed, from_secret.as_bytes());
        rk.extend_from_slice(to_public.as_bytes());
        Ok(ReEncryptionKey::new(rk))
    }

    fn encrypt(&self, pp: &PublicParams, recipient: &PublicKey, plaintext: &[u8]) -> PreResult<Ciphertext1> {
        let seed = Self::seed(pp)?;
        self.check_public_key(pp, recipient)?;

        let mut ct = plaintext.to_vec();
        Self::apply_mask(seed, recipient.as_bytes(), &mut ct);
        Ok(Ciphertext1::new(ct))
    }

    fn re_encrypt(&self, pp: &PublicParams, rk: &ReEncryptionKey, ct: &Ciphertext1) -> PreResult<Ciphertext2> {
        let seed = Self::seed(pp)?;
        let rk = rk.as_bytes();
        if rk.len() != 2 * KEY_LEN {
            return Err(PreError::ReEncryption(format!(
                "Re-encryption key must be {} bytes, got {}",
                2 * KEY_LEN,
                rk.len()
            )));
        }
        let (from, to) = rk.split_at(KEY_LEN);

        let mut out = ct.as_bytes().to_vec();
        Self::apply_mask(seed, from, &mut out);
        Self::apply_mask(seed, to, &mut out);
        Ok(Ciphertext2::new(out))
    }

    fn decrypt(&self, pp: &PublicParams, secret: &SecretKey, ct: &Ciphertext1) -> PreResult<Vec<u8>> {
        let seed = Self::seed(pp)?;
        Self::check_len("Secret key", secret.as_bytes(), KEY_LEN)
            .map_err(|e| PreError::Decryption(e.to_string()))?;

        let pk = Self::derive_public(seed, secret.as_bytes());
        let mut pt = ct.as_bytes().to_vec();
        Self::apply_mask(seed, &pk, &mut pt);
        Ok(pt)
    }

    fn decrypt_re_encrypted(&self, pp: &PublicParams, secret: &SecretKey, ct: &Ciphertext2) -> PreResult<Vec<u8>> {
        self.decrypt(pp, secret, &Ciphertext1::new(ct.as_bytes().to_vec()))
    }
}
