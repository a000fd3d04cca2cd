use blog_common::db::{self, memory::MemoryStore, BlogStore, RevocationStore, UserStore};
use blog_common::request_io::inputs::CredentialPair;
use blog_common::token::issuer::TokenIssuer;

use actix_web::{App, HttpServer};
use flexi_logger::{
    Age, Cleanup, Criterion, Duplicate, FileSpec, LogSpecification, Logger, Naming, WriteMode,
};
use std::path::Path;
use std::sync::Arc;

mod bootstrap;
mod env;
mod handlers;
mod middleware;
mod services;
mod utils;

use services::AppState;
use utils::password::{HashParams, PasswordHasher};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let mut ip = String::from("127.0.0.1");
    let mut port = 9000u16;
    let mut in_memory = false;

    let mut args = std::env::args();

    // Eat the first argument, which is the relative path to the executable
    args.next();

    while let Some(arg) = args.next() {
        match arg.to_lowercase().as_str() {
            "--ip" => {
                ip = {
                    let next_arg = args.next();

                    match next_arg {
                        Some(s) => s,
                        None => {
                            eprintln!("ERROR: --ip option specified but no IP was given");
                            std::process::exit(1);
                        }
                    }
                };

                continue;
            }
            "--port" => {
                let port_str = {
                    let next_arg = args.next();

                    match next_arg {
                        Some(s) => s,
                        None => {
                            eprintln!("ERROR: --port option specified but no port was given");
                            std::process::exit(1);
                        }
                    }
                };

                port = {
                    let port_result = port_str.parse::<u16>();

                    match port_result {
                        Ok(p) => p,
                        Err(_) => {
                            eprintln!("ERROR: Incorrect format for port. Integer expected");
                            std::process::exit(1);
                        }
                    }
                };

                continue;
            }
            "--in-memory" => {
                in_memory = true;
                continue;
            }
            a => {
                eprintln!("ERROR: Invalid argument: {}", &a);
                std::process::exit(1);
            }
        }
    }

    let base_addr = format!("{}:{}", &ip, &port);

    let log_spec = match LogSpecification::parse(&env::CONF.log_level) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: Invalid log level: {e}");
            std::process::exit(1);
        }
    };

    let _logger = Logger::with(log_spec)
        .log_to_file(FileSpec::default().directory("./logs"))
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Timestamps,
            Cleanup::KeepLogAndCompressedFiles(60, 365),
        )
        .cleanup_in_background_thread(true)
        .duplicate_to_stdout(Duplicate::All)
        .write_mode(WriteMode::Async)
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

    let actix_workers = env::CONF.actix_worker_count;

    let (users, blogs, revocations): (
        Arc<dyn UserStore>,
        Arc<dyn BlogStore>,
        Arc<dyn RevocationStore>,
    ) = if in_memory {
        log::warn!("Using the in-memory store. Nothing will be persisted");

        let store = Arc::new(MemoryStore::new());
        (store.clone(), store.clone(), store)
    } else {
        log::info!("Connecting to database...");

        // To prevent resource starvation, max connections must be at least as large as the
        // number of actix workers
        let db_max_connections = env::CONF.db_max_connections.max(actix_workers as u32);

        let db_thread_pool = match db::create_db_thread_pool(
            &env::CONF.database_uri(),
            db_max_connections,
            env::CONF.db_idle_timeout,
        ) {
            Ok(p) => p,
            Err(e) => {
                log::error!("{e}");
                eprintln!("ERROR: Failed to connect to database");
                std::process::exit(1);
            }
        };

        log::info!("Successfully connected to database");

        match db::run_migrations(&db_thread_pool) {
            Ok(count) => log::info!("Database schema is up to date ({count} migration(s) applied)"),
            Err(e) => {
                log::error!("{e}");
                eprintln!("ERROR: Failed to run database migrations");
                std::process::exit(1);
            }
        }

        (
            Arc::new(db::user::Dao::new(&db_thread_pool)),
            Arc::new(db::blog::Dao::new(&db_thread_pool)),
            Arc::new(db::auth::Dao::new(&db_thread_pool)),
        )
    };

    let password_hasher = match PasswordHasher::new(
        &env::CONF.hashing_key,
        HashParams {
            salt_length: env::CONF.hash_salt_length,
            hash_length: env::CONF.hash_length,
            iterations: env::CONF.hash_iterations,
            mem_cost_kib: env::CONF.hash_mem_cost_kib,
            threads: env::CONF.hash_threads,
        },
    ) {
        Ok(h) => h,
        Err(e) => {
            log::error!("{e}");
            eprintln!("ERROR: Invalid password hashing parameters");
            std::process::exit(1);
        }
    };

    let token_issuer = TokenIssuer::new(
        &env::CONF.token_signing_key,
        env::CONF.access_token_lifetime,
        env::CONF.refresh_token_lifetime,
    );

    let state = AppState::new(users, blogs, revocations, token_issuer, password_hasher);

    let admin = match (&env::CONF.admin_username, &env::CONF.admin_password) {
        (Some(username), Some(password)) => Some(CredentialPair {
            username: username.clone(),
            password: password.clone(),
        }),
        (None, None) => None,
        _ => {
            log::warn!("Both an admin username and password are needed to seed an administrator");
            None
        }
    };

    if let Err(e) = bootstrap::initialize(
        &**state.users,
        &**state.blogs,
        state.password_hasher.clone().into_inner(),
        admin,
        env::CONF.seed_blogs_path.as_deref().map(Path::new),
    )
    .await
    {
        log::error!("{e}");
        eprintln!("ERROR: Failed to initialize server data");
        std::process::exit(1);
    }

    log::info!("Listening on {base_addr}");

    HttpServer::new(move || {
        let state = state.clone();

        App::new()
            .configure(move |cfg| services::configure(cfg, &state))
            .wrap(actix_web::middleware::Logger::default())
    })
    .workers(actix_workers)
    .bind(base_addr)?
    .run()
    .await?;

    // All worker threads have been joined at this point
    unsafe {
        env::CONF.zeroize();
    }

    Ok(())
}
