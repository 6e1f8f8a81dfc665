mod api;
mod blockchain;
mod error;
mod hashing;
mod storage;
mod sync;
mod transaction;
mod verification;
mod wallet;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;

use api::AppState;
use blockchain::Blockchain;
use wallet::Wallet;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);
    let data_path = PathBuf::from(env::var("DATA_FILE").unwrap_or_else(|_| "ledger.json".into()));
    let wallet_path =
        PathBuf::from(env::var("WALLET_FILE").unwrap_or_else(|_| "wallet.txt".into()));
    let timeout_ms: u64 = env::var("BROADCAST_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);

    let node_wallet = match Wallet::load(&wallet_path) {
        Ok(wallet) => {
            info!("loaded wallet {}", wallet.public_key_hex());
            Some(wallet)
        }
        Err(_) => None,
    };
    let identity = node_wallet.as_ref().map(|w| w.public_key_hex());

    let mut ledger = Blockchain::new(identity, Some(data_path));
    ledger.reward_recipient = env::var("MINER_ADDRESS").ok();

    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .expect("http client builds");

    println!("⛓️ Starting ledger node at http://{host}:{port}");

    let state = web::Data::new(AppState::new(ledger, node_wallet, http, Some(wallet_path)));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
