use std::{io, sync::Arc};

use actix_web::{web, App, HttpServer};
use event_registration::{
    config::Settings,
    db::{init_db_pool, run_migrations},
    handlers,
    service::{
        log::{init_logger, LoggerMiddleware},
        sweeper::Sweeper,
    },
    PGPool,
};
use log::{error, info};

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    init_logger();
    let settings = Settings::from_env().map_err(|e| startup_error("invalid configuration", e))?;
    let pool: PGPool = init_db_pool(&settings)
        .await
        .map_err(|e| startup_error("failed to connect to database", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| startup_error("failed to apply migrations", e))?;

    let sweeper = Sweeper::new(Arc::new(pool.clone()))
        .with_interval(settings.sweep_interval)
        .start();

    let bind = (settings.host.clone(), settings.port);
    info!("listening on {}:{}", bind.0, bind.1);
    let pool_data = web::Data::new(pool.clone());
    let settings_data = web::Data::new(settings);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(pool_data.clone())
            .app_data(settings_data.clone())
            .wrap(LoggerMiddleware)
            .configure(handlers::configure)
    })
    .bind(bind)?
    .run();

    let result = server.await;
    sweeper.stop().await;
    pool.close().await;
    info!("shutdown complete");
    result
}
