use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};

use crate::blockchain::{Block, Blockchain};
use crate::transaction::Transaction;
use crate::wallet::Wallet;

/// Shared application state: the ledger engine behind a single mutex (all
/// chain/pool/peer mutation is serialized through it), the node wallet,
/// the peer HTTP client and the cross-request flags.
pub struct AppState {
    pub ledger: Mutex<Blockchain>,
    pub wallet: Mutex<Option<Wallet>>,
    pub http: reqwest::Client,
    /// Raised when a peer signals that our chain is behind (conflict
    /// response or gap block); cleared by a resolve run.
    pub resolve_pending: AtomicBool,
    /// Interrupts an in-flight proof-of-work search.
    pub abort_mining: AtomicBool,
    pub wallet_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        ledger: Blockchain,
        wallet: Option<Wallet>,
        http: reqwest::Client,
        wallet_path: Option<PathBuf>,
    ) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            wallet: Mutex::new(wallet),
            http,
            resolve_pending: AtomicBool::new(false),
            abort_mining: AtomicBool::new(false),
            wallet_path,
        }
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse<'a> {
    pub length: usize,
    pub chain: &'a [Block],
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
}

#[derive(Serialize)]
pub struct MinedResponse {
    pub block: Block,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub replaced: bool,
    pub length: usize,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct NewTxRequest {
    pub recipient: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct NewTxResponse {
    pub transaction: Transaction,
    pub balance: i64,
}

#[derive(Serialize)]
pub struct PoolResponse {
    pub size: usize,
    pub transactions: Vec<Transaction>,
    /// Diagnostic: whether every pooled transaction is still affordable.
    pub all_affordable: bool,
}

/* ---------- Balance / Wallet API Models ---------- */

#[derive(Serialize)]
pub struct BalanceResponse {
    pub participant: String,
    pub balance: i64,
}

#[derive(Serialize)]
pub struct WalletResponse {
    pub public_key: String,
    pub balance: i64,
}

/* ---------- Peer API Models ---------- */

#[derive(Deserialize)]
pub struct PeerRequest {
    pub address: String,
}

#[derive(Serialize)]
pub struct PeersResponse {
    pub peers: Vec<String>,
}

/* ---------- Peer Broadcast (receiving side) ---------- */

#[derive(Deserialize)]
pub struct BroadcastTxRequest {
    pub sender: String,
    pub recipient: String,
    pub signature: String,
    pub amount: u64,
}

#[derive(Deserialize)]
pub struct BroadcastBlockRequest {
    pub block: Block,
}
