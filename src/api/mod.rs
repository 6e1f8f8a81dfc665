mod balance;
mod broadcast;
mod chain;
mod health;
pub mod models;
mod peers;
mod tx;
mod wallet;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::validate_chain)
            .service(chain::mine_block)
            .service(chain::resolve_conflicts)
            .service(tx::post_transaction)
            .service(tx::get_pool)
            .service(balance::get_own_balance)
            .service(balance::get_balance)
            .service(wallet::create_wallet)
            .service(peers::list_peers)
            .service(peers::add_peer)
            .service(peers::remove_peer)
            .service(broadcast::receive_transaction)
            .service(broadcast::receive_block),
    );
}
