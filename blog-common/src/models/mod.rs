pub mod blog;
pub mod job_registry_item;
pub mod revoked_token;
pub mod user;
