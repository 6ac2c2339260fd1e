use actix_web::middleware::Logger;
use actix_web::{middleware::from_fn, web, App, HttpServer};
use anyhow::Context;
use infra::config::AppConfigImpl;
use log::info;
use log4rs::{
    append::{console::ConsoleAppender, file::FileAppender},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use server::csrf;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {m}{n}";

fn init_logging() -> anyhow::Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build("app.log")
        .context("cannot open app.log")?;
    let console_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file_appender)))
        .appender(Appender::builder().build("stdout", Box::new(console_appender)))
        .build(
            Root::builder()
                .appender("file")
                .appender("stdout")
                .build(log_level.parse().unwrap_or(log::LevelFilter::Info)),
        )
        .context("invalid logging configuration")?;

    log4rs::init_config(config).context("logger already initialised")?;
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let cfg = AppConfigImpl::load().map_err(|e| anyhow::anyhow!("cannot load configuration: {}", e))?;
    let db = infra::database::connect(cfg.database())
        .await
        .context("cannot connect to the database")?;

    let (host, port) = (cfg.server().host.clone(), cfg.server().port);
    let app_state = web::Data::new(server::AppState::new(db, cfg));
    info!("listening on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(from_fn(csrf::ensure_token))
            .wrap(Logger::new("%a \"%r\" %s %b %T"))
            .configure(server::configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;
    Ok(())
}
