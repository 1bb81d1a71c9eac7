use std::io;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;

use pow_ledger::api::{self, AppState};
use pow_ledger::{AppConfig, Wallet};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = AppConfig::from_env().map_err(io::Error::other)?;

    println!(
        "⛓️ Starting ledger API at http://{}:{} (difficulty {})",
        config.host, config.port, config.chain.difficulty
    );

    let state = web::Data::new(AppState::new(&config));
    let miner = state.wallets.create_wallet();
    info!("default miner wallet: {}", miner.address());

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
