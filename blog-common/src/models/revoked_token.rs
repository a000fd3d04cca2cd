use diesel::Insertable;
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::revoked_tokens;

#[derive(Debug, Insertable)]
#[diesel(table_name = revoked_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewRevokedToken {
    pub jti: Uuid,
    pub token_expiration: SystemTime,
}
