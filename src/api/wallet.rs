use actix_web::{HttpResponse, Responder, get, post, web};

use super::models::{AppState, NewWalletResponse, WalletSummary};
use crate::wallet::Wallet;

#[post("/wallet/new/")]
pub async fn create_wallet(state: web::Data<AppState>) -> impl Responder {
    let wallet = state.wallets.create_wallet();
    HttpResponse::Ok().json(NewWalletResponse {
        private_key: wallet.secret_key_hex(),
        public_key: wallet.public_key_hex(),
        address: wallet.address().to_string(),
    })
}

#[get("/wallets/")]
pub async fn list_wallets(state: web::Data<AppState>) -> impl Responder {
    let wallets: Vec<WalletSummary> = state
        .wallets
        .list_wallets()
        .into_iter()
        .map(|address| WalletSummary {
            balance: state.blockchain.get_balance(&address),
            address,
        })
        .collect();
    HttpResponse::Ok().json(wallets)
}
