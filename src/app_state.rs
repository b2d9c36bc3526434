use std::sync::Arc;

use crate::{
    auth::TokenIssuer,
    config::AppConfig,
    gateway::PaymentGateway,
    service::{accounts::AccountService, orders::OrderService, payments::PaymentService},
    store::Store,
};

/// Shared handles injected into every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenIssuer>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub accounts: Arc<AccountService>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let tokens = Arc::new(TokenIssuer::new(&config.auth));
        let orders = OrderService::new(
            store.clone(),
            gateway.clone(),
            config.default_currency.clone(),
        );
        let payments = PaymentService::new(store.clone(), gateway.clone());
        let accounts = AccountService::new(store.clone(), gateway, tokens.clone());

        Self {
            store,
            tokens,
            orders: Arc::new(orders),
            payments: Arc::new(payments),
            accounts: Arc::new(accounts),
        }
    }
}
