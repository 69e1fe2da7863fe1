use log::*;
use service::{config::Config, logging::Logger};

#[tokio::main]
async fn main() {
    let config = Config::new();

    Logger::init_logger(&config);

    info!("Starting up...");

    let app_state = match service::init_app_state(config) {
        Ok(app_state) => app_state,
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = web::init_server(app_state.clone()).await {
        error!("Server error: {e}");
    }

    domain::session::terminate(&app_state).await;

    info!("Stopped");
}
