use actix_web::{HttpResponse, Responder, post, web};
use log::warn;

use super::models::{AppState, WalletResponse};
use crate::wallet::Wallet;

/// Generate a fresh keypair, persist it and make it the node identity
/// (mining rewards route to it from now on).
#[post("/wallet/new/")]
pub async fn create_wallet(state: web::Data<AppState>) -> impl Responder {
    let wallet = Wallet::generate();
    if let Some(path) = state.wallet_path.as_ref() {
        if let Err(err) = wallet.save(path) {
            warn!("failed to save wallet keys to {}: {err}", path.display());
        }
    }

    let public_key = wallet.public_key_hex();
    let balance = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.identity = Some(public_key.clone());
        ledger.balance_of(&public_key)
    };
    *state.wallet.lock().expect("mutex poisoned") = Some(wallet);

    HttpResponse::Created().json(WalletResponse {
        public_key,
        balance,
    })
}
