// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use log::{info, warn};
use neuromark::{AppState, config::Settings, handlers};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;

    env_logger::init_from_env(
        env_logger::Env::new().default_filter_or(settings.logging.level.as_str()),
    );

    info!("Starting neuromark service...");

    let app_state = AppState::from_settings(&settings)?;

    for (kind, capability) in app_state.engine.capabilities().await {
        match capability.reason {
            None => info!("  {}: available", kind),
            Some(reason) => warn!("  {}: unavailable ({})", kind, reason),
        }
    }
    app_state.engine.ensure_required().await?;

    let bind = (settings.server.host.clone(), settings.server.port);
    info!("Starting HTTP server on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::routes)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
