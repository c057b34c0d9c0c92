//! Composition root: builds every handle once and wires the gateway,
//! the bus subscriber, and the broadcast listener together.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chat_relay::adapters::http::{chat_router, HttpAppState};
use chat_relay::adapters::identity::HttpIdentityValidator;
use chat_relay::adapters::media::HttpMediaStorage;
use chat_relay::adapters::postgres::{PostgresMessageStore, PostgresRoomDirectory};
use chat_relay::adapters::redis::{
    RedisBroadcast, RedisBroadcastListener, RedisEventBus, RedisEventSubscriber, RetryPolicy,
};
use chat_relay::adapters::websocket::{
    gateway_router, ChatEventBridge, GatewayState, RoomRegistry,
};
use chat_relay::application::{
    BacklogLimits, CreateRoomHandler, FetchBacklogHandler, JoinRoomHandler, RoomEventMaterializer,
    SendMessageHandler,
};
use chat_relay::config::AppConfig;
use chat_relay::domain::InstanceId;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config);

    let instance = InstanceId::new();
    tracing::info!(instance = %instance, "Starting chat-relay");

    // Storage: the synchronization point between instances.
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Redis: one client for the stream bus and the broadcast channel.
    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_async_connection().await?;

    // Explicit handles, constructed once and injected everywhere.
    let directory: Arc<PostgresRoomDirectory> = Arc::new(PostgresRoomDirectory::new(pool.clone()));
    let store = Arc::new(PostgresMessageStore::new(pool));
    let bus = Arc::new(RedisEventBus::new(
        redis_conn.clone(),
        config.redis.chat_stream.clone(),
        config.redis.stream_maxlen,
        RetryPolicy {
            attempts: config.delivery.publish_retry_attempts,
            base_delay: config.delivery.publish_retry_base(),
        },
    ));
    let broadcast = Arc::new(RedisBroadcast::new(
        redis_conn,
        config.redis.broadcast_channel.clone(),
    ));
    let identity = Arc::new(HttpIdentityValidator::new(
        config.upstream.user_api_url.clone(),
        config.upstream.auth_timeout(),
    )?);
    let media = Arc::new(HttpMediaStorage::new(
        reqwest::Client::new(),
        config.upstream.media_api_url.clone(),
    ));

    let registry = Arc::new(RoomRegistry::new());
    let bridge = Arc::new(ChatEventBridge::new(
        registry.clone(),
        config.delivery.dedup_capacity,
    ));
    let materializer = Arc::new(RoomEventMaterializer::new(directory.clone()));

    let send_message = SendMessageHandler::new(
        directory.clone(),
        store.clone(),
        bus,
        broadcast.clone(),
        instance,
    );
    let join_room = JoinRoomHandler::new(directory.clone(), store.clone());
    let create_room = CreateRoomHandler::new(directory.clone());
    let backlog = FetchBacklogHandler::new(
        directory.clone(),
        store,
        BacklogLimits {
            default_limit: config.delivery.backlog_default_limit,
            max_limit: config.delivery.backlog_max_limit,
        },
    );

    // Long-running consumers, stopped via the shared shutdown channel.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let subscriber = RedisEventSubscriber::new(
        redis_client.clone(),
        config.redis.chat_stream.clone(),
        config.redis.room_stream.clone(),
        config.redis.read_block(),
    );
    let subscriber_task = tokio::spawn({
        let bridge = bridge.clone();
        let shutdown = shutdown_rx.clone();
        async move { subscriber.run(bridge, materializer, shutdown).await }
    });

    let listener = RedisBroadcastListener::new(
        redis_client,
        config.redis.broadcast_channel.clone(),
        instance,
    );
    let listener_task = tokio::spawn({
        let bridge = bridge.clone();
        let shutdown = shutdown_rx.clone();
        async move { listener.run(bridge, shutdown).await }
    });

    let gateway_state = GatewayState {
        registry,
        identity: identity.clone(),
        join_room,
        send_message: send_message.clone(),
        broadcast,
        instance,
        auth_timeout: config.upstream.auth_timeout(),
        backlog_limit: config.delivery.backlog_default_limit,
        outbound_buffer: config.delivery.outbound_buffer,
    };
    let http_state = HttpAppState {
        identity,
        media,
        directory,
        create_room,
        backlog,
        send_message,
        auth_timeout: config.upstream.auth_timeout(),
    };

    let app = Router::new()
        .merge(chat_router().with_state(http_state))
        .merge(gateway_router().with_state(gateway_state))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors_layer(&config));

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "Gateway listening");
    let tcp = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(tcp, app)
        .with_graceful_shutdown({
            let shutdown_tx = shutdown_tx.clone();
            async move {
                shutdown_signal().await;
                tracing::info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
        })
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = subscriber_task.await;
        let _ = listener_task.await;
    })
    .await;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = config.server.cors_origins_list();
    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
