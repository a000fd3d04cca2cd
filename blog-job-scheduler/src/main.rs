use blog_common::db::{self, auth, job_registry};

use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode};
use std::sync::Arc;

mod env;
mod jobs;
mod runner;

use jobs::PruneRevokedTokensJob;
use runner::JobRunner;

fn main() {
    let db_thread_pool = match db::create_db_thread_pool(
        &env::CONF.database_uri(),
        env::CONF.db_max_connections,
        env::CONF.db_idle_timeout,
    ) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("ERROR: Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(env::CONF.worker_threads)
        .max_blocking_threads(env::CONF.max_blocking_threads)
        .enable_all()
        .build()
        .expect("Failed to launch asynchronous runtime")
        .block_on(async move {
            Logger::try_with_str(&env::CONF.log_level)
                .expect(
                    "Invalid log level. Options: ERROR, WARN, INFO, DEBUG, TRACE. \
                     Example: `info, my::critical::module=trace`",
                )
                .log_to_file(FileSpec::default().directory("./logs"))
                .rotate(
                    Criterion::Age(Age::Day),
                    Naming::Timestamps,
                    Cleanup::KeepLogAndCompressedFiles(60, 365),
                )
                .cleanup_in_background_thread(true)
                .duplicate_to_stdout(Duplicate::All)
                .write_mode(WriteMode::BufferAndFlush)
                .format(|writer, now, record| {
                    write!(
                        writer,
                        "{:5} | {} | {}:{} | {}",
                        record.level(),
                        now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                        record.module_path().unwrap_or("<unknown>"),
                        record.line().unwrap_or(0),
                        record.args()
                    )
                })
                .use_utc()
                .start()
                .expect("Failed to start logger");

            // The server owns the schema, but the scheduler may come up first
            if let Err(e) = db::run_migrations(&db_thread_pool) {
                log::error!("{e}");
                std::process::exit(1);
            }

            let registry = Arc::new(job_registry::Dao::new(&db_thread_pool));
            let mut job_runner = JobRunner::new(env::CONF.update_frequency, registry);

            job_runner
                .register(
                    Box::new(PruneRevokedTokensJob::new(Arc::new(auth::Dao::new(
                        &db_thread_pool,
                    )))),
                    env::CONF.prune_revoked_tokens_job_frequency,
                )
                .await;

            job_runner.start().await;
        });

    unsafe {
        env::CONF.zeroize();
    }
}
