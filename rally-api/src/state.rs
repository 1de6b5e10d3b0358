use rally_core::identity::CredentialVerifier;
use rally_session::SessionService;
use rally_shared::Masked;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: Masked<String>,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SessionService>,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub auth: AuthConfig,
    /// Currency label for formatted amounts, e.g. `RM`.
    pub currency: String,
}
