use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, create_orm_conn},
    services::token_service::JwtKeys,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(pool: DbPool, config: &AppConfig) -> Self {
        let orm = create_orm_conn(&pool);
        Self {
            pool,
            orm,
            jwt: JwtKeys::from_config(config),
        }
    }
}
