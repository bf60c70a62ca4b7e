use std::net::TcpListener;
use std::sync::Arc;

use postboard::configuration::get_configuration;
use postboard::startup::run;
use postboard::store::{PgStore, Store};
use postboard::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    // A missing signing secret is fatal here, never per request
    let configuration = match get_configuration().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    tracing::info!(database = ?configuration.database, "Connecting to database");
    let store = PgStore::connect(&configuration.database).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to connect to database");
        std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "Database connection error",
        )
    })?;
    let store: Arc<dyn Store> = Arc::new(store);

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!(address = %address, "Server listening");

    let server = run(listener, store, configuration)?;
    server.await
}
