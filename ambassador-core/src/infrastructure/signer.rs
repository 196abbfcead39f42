//! Wallet-side signing capability.

use crate::domain::hashes::pub_key_hash;
use crate::domain::signing::{append_witness, sign_tx_id, track_progress};
use crate::domain::{Address, Transaction};
use crate::foundation::{AmbassadorError, PubKeyHash, Result};
use async_trait::async_trait;
use log::debug;
use secp256k1::{Keypair, Secp256k1, SecretKey};

#[async_trait]
pub trait Signer: Send + Sync {
    fn pub_key_hash(&self) -> PubKeyHash;

    fn address(&self) -> Address {
        Address::Key(self.pub_key_hash())
    }

    /// Returns `tx_hex` with this signer's witness added.
    ///
    /// With `partial == false` the result must already satisfy the signer
    /// threshold; otherwise `InsufficientSignatures` is returned and nothing
    /// is handed back.
    async fn sign(&self, tx_hex: &str, partial: bool) -> Result<String>;
}

pub struct KeypairSigner {
    keypair: Keypair,
    pkh: PubKeyHash,
}

impl KeypairSigner {
    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(secret)
            .map_err(|err| AmbassadorError::CryptoError { operation: "parse_secp256k1_secret".to_string(), details: err.to_string() })?;
        let keypair = Keypair::from_secret_key(&Secp256k1::new(), &secret);
        Ok(Self::from_keypair(keypair))
    }

    pub fn from_hex(secret_hex: &str) -> Result<Self> {
        let bytes = hex::decode(secret_hex.trim()).map_err(|err| AmbassadorError::EncodingError(err.to_string()))?;
        Self::from_secret_bytes(&bytes)
    }

    pub fn generate() -> Self {
        let secret = SecretKey::new(&mut rand::thread_rng());
        Self::from_keypair(Keypair::from_secret_key(&Secp256k1::new(), &secret))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        let (xonly, _) = keypair.x_only_public_key();
        Self { keypair, pkh: pub_key_hash(&xonly.serialize()) }
    }
}

#[async_trait]
impl Signer for KeypairSigner {
    fn pub_key_hash(&self) -> PubKeyHash {
        self.pkh
    }

    async fn sign(&self, tx_hex: &str, partial: bool) -> Result<String> {
        let tx = Transaction::from_hex(tx_hex)?;
        let tx_id = tx.id()?;
        let aux_rand: [u8; 32] = rand::random();
        let signed = append_witness(tx_hex, sign_tx_id(&self.keypair, &tx_id, &aux_rand))?;
        if !partial {
            let required = tx.body.required_signers.iter().copied().collect::<Vec<_>>();
            track_progress(&signed, &required, tx.body.signer_threshold)?.ensure_threshold()?;
        }
        debug!("signer produced witness pkh={} tx_id={} partial={}", self.pkh, tx_id, partial);
        Ok(signed)
    }
}
