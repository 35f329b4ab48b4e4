use tracing::{error, info};

use postgate::{Authority, Config, Database, SmtpServer, TelegramApi};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = postgate::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        postgate::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    info!("postgate - mail-to-chat delivery bridge");

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };

    let api = match TelegramApi::new(&config.chat) {
        Ok(api) => api,
        Err(e) => {
            error!("Failed to create chat API client: {e}");
            std::process::exit(1);
        }
    };

    let authority = Authority::new(db, Box::new(api), &config.limits);
    let (handle, authority_task) = authority.start();

    let server = SmtpServer::new(&config, handle);
    let server_task = tokio::task::spawn_blocking(move || server.serve());

    tokio::select! {
        result = server_task => match result {
            Ok(Err(e)) => error!("SMTP server failed: {e}"),
            Err(e) => error!("SMTP server task panicked: {e}"),
            Ok(Ok(())) => info!("SMTP server stopped"),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    drop(authority_task);
}
