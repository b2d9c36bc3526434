//! Business workflows. Handlers stay thin and delegate here; everything in
//! this module talks to persistence and the payments platform only through
//! the `Store` and `PaymentGateway` traits.

pub mod accounts;
pub mod orders;
pub mod payments;

use crate::{
    gateway::GatewayCredential,
    models::{Permission, RestaurantEntity, Role},
};

/// The tenant and user a request acts under, resolved once per request.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub restaurant: RestaurantEntity,
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

impl TenantContext {
    pub fn restaurant_id(&self) -> i32 {
        self.restaurant.id
    }

    pub fn credential(&self) -> GatewayCredential {
        GatewayCredential::new(self.restaurant.square_token.clone())
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.role.allows(permission)
    }
}
