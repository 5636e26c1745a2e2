use crate::auth::AuthKeys;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub nats: Option<async_nats::Client>,
    pub auth: AuthKeys,
}
