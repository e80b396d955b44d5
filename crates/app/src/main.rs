use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use payments::{ChannelSink, HttpGateway, Payments};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "kolo={level},server={level},payments={level},ledger={level}",
            level = settings.app.level
        ))
        .init();

    let server = settings.server;
    let gateway = settings.gateway;
    tasks.spawn(async move {
        let db = match parse_database(&server.database).await {
            Ok(db) => db,
            Err(err) => {
                tracing::error!("failed to initialize database: {err}");
                return;
            }
        };

        let ledger = Arc::new(ledger::Ledger::builder().database(db.clone()).build());

        let (sink, events) = ChannelSink::new();
        let payments = Arc::new(Payments::new(
            db,
            Arc::new(HttpGateway::new(gateway.base_url, gateway.secret_key)),
            Arc::new(sink),
        ));
        server::spawn_recorder(ledger.clone(), events);

        let state = server::ServerState {
            ledger,
            payments,
            webhook_secret: gateway.webhook_secret,
        };

        let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
        let addr = format!("{}:{}", bind, server.port);
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(err) => {
                tracing::error!("failed to bind server listener: {err}");
                return;
            }
        };
        if let Err(err) = server::run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
