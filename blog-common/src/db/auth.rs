use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool, RevocationStore};
use crate::models::revoked_token::NewRevokedToken;
use crate::schema::revoked_tokens as revoked_token_fields;
use crate::schema::revoked_tokens::dsl::revoked_tokens;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }
}

impl RevocationStore for Dao {
    fn revoke_token(&self, jti: Uuid, token_expiration: u64) -> Result<(), DaoError> {
        let revoked_token = NewRevokedToken {
            jti,
            token_expiration: UNIX_EPOCH + Duration::from_secs(token_expiration),
        };

        dsl::insert_into(revoked_tokens)
            .values(&revoked_token)
            .on_conflict(revoked_token_fields::jti)
            .do_nothing()
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    fn is_token_revoked(&self, jti: Uuid) -> Result<bool, DaoError> {
        Ok(dsl::select(dsl::exists(
            revoked_tokens.filter(revoked_token_fields::jti.eq(jti)),
        ))
        .get_result(&mut self.db_thread_pool.get()?)?)
    }

    fn clear_all_expired_tokens(&self) -> Result<usize, DaoError> {
        Ok(diesel::delete(
            revoked_tokens.filter(revoked_token_fields::token_expiration.lt(SystemTime::now())),
        )
        .execute(&mut self.db_thread_pool.get()?)?)
    }
}
