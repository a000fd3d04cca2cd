use diesel::Insertable;
use std::time::SystemTime;

use crate::schema::job_registry;

#[derive(Debug, Insertable)]
#[diesel(table_name = job_registry)]
pub struct NewJobRegistryItem<'a> {
    pub job_name: &'a str,
    pub last_run_timestamp: SystemTime,
}
