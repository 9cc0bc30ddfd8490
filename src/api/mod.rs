mod chain;
mod health;
pub mod models;
mod peers;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::get_latest)
            .service(chain::validate_chain)
            .service(chain::mine_block)
            .service(chain::get_version)
            .service(peers::get_peers)
            .service(peers::add_peers),
    );
}
