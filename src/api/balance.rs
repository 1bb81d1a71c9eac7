use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, BalanceResponse, BalancesResponse};

#[get("/balance/{address}/")]
pub async fn get_balance(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let address = path.into_inner().0;
    let balance = state.blockchain.get_balance(&address);
    HttpResponse::Ok().json(BalanceResponse { address, balance })
}

/// Balances of every registered wallet.
#[get("/balances/")]
pub async fn get_balances(state: web::Data<AppState>) -> impl Responder {
    let balances = state
        .wallets
        .list_wallets()
        .into_iter()
        .map(|address| {
            let balance = state.blockchain.get_balance(&address);
            (address, balance)
        })
        .collect();
    HttpResponse::Ok().json(BalancesResponse {
        balances,
        total: state.wallets.get_total_balance(),
    })
}
