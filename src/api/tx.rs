use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info, warn};

use super::models::{
    AppState, ErrorResponse, FaucetRequest, NewTxRequest, SubmitAllResponse, TransactionsResponse,
    TxResponse,
};
use crate::error::LedgerError;

/// DEV Faucet: credit an address from the system account and queue it on the chain.
#[post("/faucet/")]
pub async fn post_faucet(
    state: web::Data<AppState>,
    body: web::Json<FaucetRequest>,
) -> impl Responder {
    if body.amount == 0 {
        return HttpResponse::BadRequest().json(ErrorResponse::new("amount must be > 0"));
    }
    let address = body.address.trim();
    if address.is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse::new("address required"));
    }

    let mut manager = state.transactions.lock();
    let tx = manager.create_system_transaction(address, body.amount);
    let submitted = manager.submit_transaction_to_blockchain(&tx.transaction_id);
    debug!(
        "FAUCET - credited {} with {} (txid={})",
        address, body.amount, tx.transaction_id
    );
    let transaction = manager.get_transaction(&tx.transaction_id).cloned().unwrap_or(tx);

    HttpResponse::Ok().json(TxResponse {
        transaction,
        submitted,
    })
}

/// Create a signed transfer from a registered wallet and submit it to the chain.
#[post("/tx/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTxRequest>,
) -> impl Responder {
    if body.amount == 0 {
        warn!("POST /tx/ - rejected: zero amount");
        return HttpResponse::BadRequest().json(ErrorResponse::new("amount must be > 0"));
    }

    let mut manager = state.transactions.lock();
    let tx = match manager.create_transaction(&body.sender, &body.recipient, body.amount) {
        Ok(tx) => tx,
        Err(e @ LedgerError::WalletNotFound(_)) => {
            warn!("POST /tx/ - {e}");
            return HttpResponse::NotFound().json(ErrorResponse::new(e));
        }
        Err(e) => {
            warn!("POST /tx/ - {e}");
            return HttpResponse::BadRequest().json(ErrorResponse::new(e));
        }
    };

    let submitted = manager.submit_transaction_to_blockchain(&tx.transaction_id);
    info!(
        "POST /tx/ - txid={} {}",
        tx.transaction_id,
        if submitted { "submitted" } else { "kept in pool" }
    );
    let transaction = manager.get_transaction(&tx.transaction_id).cloned().unwrap_or(tx);

    HttpResponse::Ok().json(TxResponse {
        transaction,
        submitted,
    })
}

/// Pooled transactions plus the full (reconciled) history.
#[get("/tx/")]
pub async fn list_transactions(state: web::Data<AppState>) -> impl Responder {
    let mut manager = state.transactions.lock();
    manager.update_transaction_statuses();
    HttpResponse::Ok().json(TransactionsResponse {
        pending: manager.get_pending_transactions(),
        history: manager.get_transaction_history(None),
    })
}

#[get("/tx/{id}/")]
pub async fn get_transaction(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let id = path.into_inner().0;
    let manager = state.transactions.lock();
    match manager.get_transaction(&id) {
        Some(tx) => HttpResponse::Ok().json(tx),
        None => HttpResponse::NotFound().json(ErrorResponse::new(format!(
            "transaction {id} not found"
        ))),
    }
}

#[post("/tx/submit-all/")]
pub async fn submit_all(state: web::Data<AppState>) -> impl Responder {
    let submitted = state.transactions.lock().submit_all_pending_transactions();
    HttpResponse::Ok().json(SubmitAllResponse { submitted })
}
