//! `HYBRID_ECDH_V1` envelope wrapping: an ephemeral-static X25519 Diffie-Hellman
//! exchange feeds an HKDF that derives a ChaCha20-Poly1305 key for the actual
//! payload. The symmetric/asymmetric primitives themselves are taken from
//! `x25519-dalek`/`chacha20poly1305` as given; only the mode (ephemeral-static
//! ECDH, one shared secret per message) and the inputs/outputs are specified
//! here.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::proto::cobalt::observation::{EncryptedMessage, EncryptionScheme};
use crate::status::{Status, StatusCode};

const NONCE_LEN: usize = 12;

/// Produces `EncryptedMessage`s for one recipient public key. `ObservationWriter`
/// holds one of these for the analyzer key, `ShippingManager` holds another for
/// the shuffler key.
pub trait Encrypter: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedMessage, Status>;
}

/// `scheme = NONE`: the plaintext is carried verbatim. Used when no public key
/// was configured at startup: key management is limited to loading a PEM
/// key, and absence of one disables encryption rather than erroring.
pub struct PlaintextEncrypter;

impl Encrypter for PlaintextEncrypter {
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedMessage, Status> {
        Ok(EncryptedMessage {
            scheme: EncryptionScheme::None as i32,
            ciphertext: plaintext.to_vec(),
            public_key_fingerprint: Vec::new(),
            ephemeral_public_key: Vec::new(),
        })
    }
}

/// `scheme = HYBRID_ECDH_V1` against a fixed recipient public key, loaded from
/// PEM at startup.
pub struct HybridEcdhEncrypter {
    recipient: PublicKey,
    fingerprint: [u8; 32],
}

impl HybridEcdhEncrypter {
    pub fn new(recipient: PublicKey) -> Self {
        Self {
            fingerprint: fingerprint(&recipient),
            recipient,
        }
    }

    /// Loads a 32-byte raw X25519 public key from a PEM block.
    pub fn from_pem(pem_str: &str) -> Result<Self, Status> {
        let parsed = pem::parse(pem_str)
            .map_err(|e| Status::new(StatusCode::InvalidConfig, format!("invalid PEM: {e}")))?;
        let bytes: [u8; 32] = parsed
            .contents()
            .try_into()
            .map_err(|_| Status::new(StatusCode::InvalidConfig, "public key is not 32 bytes"))?;
        Ok(Self::new(PublicKey::from(bytes)))
    }
}

impl Encrypter for HybridEcdhEncrypter {
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedMessage, Status> {
        let ephemeral_secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let ephemeral_public = PublicKey::from(&ephemeral_secret);
        let shared_secret = ephemeral_secret.diffie_hellman(&self.recipient);

        let key = derive_key(shared_secret.as_bytes(), ephemeral_public.as_bytes());
        let cipher = ChaCha20Poly1305::new((&key).into());

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = cipher
            .encrypt(nonce, Payload { msg: plaintext, aad: &[] })
            .map_err(|_| Status::new(StatusCode::Other, "hybrid ecdh encryption failed"))?;

        let mut framed = Vec::with_capacity(NONCE_LEN + sealed.len());
        framed.extend_from_slice(&nonce_bytes);
        framed.extend_from_slice(&sealed);

        Ok(EncryptedMessage {
            scheme: EncryptionScheme::HybridEcdhV1 as i32,
            ciphertext: framed,
            public_key_fingerprint: self.fingerprint.to_vec(),
            ephemeral_public_key: ephemeral_public.as_bytes().to_vec(),
        })
    }
}

/// Decrypts a `HYBRID_ECDH_V1` message with the paired static secret. Not
/// exercised by the device pipeline itself (only the upstream analyzer/shuffler
/// hold the private key) but kept so the encrypt/decrypt round trip is
/// testable without an external fixture.
pub struct HybridEcdhDecrypter {
    secret: StaticSecret,
}

impl HybridEcdhDecrypter {
    pub fn new(secret: StaticSecret) -> Self {
        Self { secret }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(&self.secret)
    }

    pub fn decrypt(&self, message: &EncryptedMessage) -> Result<Vec<u8>, Status> {
        if message.scheme != EncryptionScheme::HybridEcdhV1 as i32 {
            return Err(Status::new(
                StatusCode::InvalidArguments,
                "message is not HYBRID_ECDH_V1",
            ));
        }
        let ephemeral_bytes: [u8; 32] = message
            .ephemeral_public_key
            .as_slice()
            .try_into()
            .map_err(|_| Status::new(StatusCode::Other, "malformed ephemeral public key"))?;
        let ephemeral_public = PublicKey::from(ephemeral_bytes);
        let shared_secret = self.secret.diffie_hellman(&ephemeral_public);
        let key = derive_key(shared_secret.as_bytes(), ephemeral_public.as_bytes());
        let cipher = ChaCha20Poly1305::new((&key).into());

        if message.ciphertext.len() < NONCE_LEN {
            return Err(Status::new(StatusCode::Other, "ciphertext too short"));
        }
        let (nonce_bytes, sealed) = message.ciphertext.split_at(NONCE_LEN);
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), Payload { msg: sealed, aad: &[] })
            .map_err(|_| Status::new(StatusCode::Other, "hybrid ecdh decryption failed"))
    }
}

fn derive_key(shared_secret: &[u8], ephemeral_public: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut key = [0u8; 32];
    hk.expand(ephemeral_public, &mut key)
        .expect("32 bytes is a valid HKDF output length");
    key
}

fn fingerprint(key: &PublicKey) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"cobalt.hybrid_ecdh.fingerprint");
    hasher.update(key.as_bytes());
    hasher.finalize().into()
}
