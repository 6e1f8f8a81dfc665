use std::fs;
use std::path::Path;

use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};

use crate::transaction::Transaction;

/// Node keypair. The identity other participants see is the hex of the
/// compressed public key (didactic, same as the address).
#[derive(Debug, Clone)]
pub struct Wallet {
    secret: SecretKey,
    public: PublicKey,
}

impl Wallet {
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret, public) = secp.generate_keypair(&mut OsRng);
        Self { secret, public }
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public.serialize()) // compressed (33 bytes)
    }

    /// Load a wallet saved by `save`: secret key hex on the first line.
    pub fn load(path: &Path) -> Result<Self, &'static str> {
        let raw = fs::read_to_string(path).map_err(|_| "could not read wallet file")?;
        let sk_hex = raw.lines().next().ok_or("wallet file is empty")?;
        let sk_bytes = hex::decode(sk_hex.trim()).map_err(|_| "invalid secret key hex")?;
        let secret = SecretKey::from_slice(&sk_bytes).map_err(|_| "invalid secret key bytes")?;
        let public = secret.public_key(&Secp256k1::new());
        Ok(Self { secret, public })
    }

    /// Two hex lines: secret key, then public key for inspection.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        fs::write(
            path,
            format!(
                "{}\n{}\n",
                hex::encode(self.secret.secret_bytes()),
                self.public_key_hex()
            ),
        )
    }

    /// Sign the canonical (sender, recipient, amount) triple with this
    /// wallet as the sender. Returns the hex-encoded DER signature.
    pub fn sign_transaction(&self, recipient: &str, amount: u64) -> String {
        let tx = Transaction::new(
            self.public_key_hex(),
            recipient.to_string(),
            String::new(),
            amount,
        );
        let secp = Secp256k1::new();
        let msg = Message::from_slice(&tx.sighash()).expect("sighash is 32 bytes");
        let sig = secp.sign_ecdsa(&msg, &self.secret);
        hex::encode(sig.serialize_der())
    }
}

/// Verify a transaction's signature against its sender, read as a
/// compressed public key. Returns false on any malformed input. Reward
/// transactions are exempt at the call sites and never reach this check.
pub fn verify_transaction_signature(transaction: &Transaction) -> bool {
    let secp = Secp256k1::verification_only();
    let Ok(sig_bytes) = hex::decode(&transaction.signature) else {
        return false;
    };
    let Ok(sig) = Signature::from_der(&sig_bytes) else {
        return false;
    };
    let Ok(pk_bytes) = hex::decode(&transaction.sender) else {
        return false;
    };
    let Ok(pk) = PublicKey::from_slice(&pk_bytes) else {
        return false;
    };
    let Ok(msg) = Message::from_slice(&transaction.sighash()) else {
        return false;
    };
    secp.verify_ecdsa(&msg, &sig, &pk).is_ok()
}
