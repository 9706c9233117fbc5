use storefront_order_management::adapter::driven::{
    JwtConfig, JwtTokenService, MySqlInventoryLedger, MySqlOrderRepository, MySqlUserRepository,
    TracingActivityRecorder,
};
use storefront_order_management::adapter::driver::{create_router, AppState};
use storefront_order_management::adapter::{DatabaseConfig, DatabaseMigration, ServerConfig};
use storefront_order_management::application::auth::AuthorizationGate;
use storefront_order_management::application::service::{
    OrderApplicationService, OrderQueryService,
};

use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .envファイルから環境変数を読み込む
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("storefront_order_management=info,tower_http=info")
            }),
        )
        .init();

    // 設定を読み込む
    let database_config = DatabaseConfig::from_env()?;
    let server_config = ServerConfig::from_env()?;
    let jwt_config = JwtConfig::from_env()?;
    tracing::info!(
        host = %database_config.host,
        port = database_config.port,
        database = %database_config.database,
        "データベース設定を読み込みました"
    );

    // 接続プールを作成
    let pool = MySqlPoolOptions::new()
        .max_connections(database_config.max_connections)
        .connect(&database_config.connection_string())
        .await?;

    // マイグレーションを実行
    DatabaseMigration::new(pool.clone()).run().await?;

    // アダプターを作成
    let order_repository = Arc::new(MySqlOrderRepository::new(pool.clone()));
    let ledger = Arc::new(MySqlInventoryLedger::new(pool.clone()));
    let user_repository = Arc::new(MySqlUserRepository::new(pool.clone()));
    let token_service = Arc::new(JwtTokenService::new(jwt_config));

    // アプリケーションサービスを作成
    let order_query_service = Arc::new(OrderQueryService::new(
        order_repository.clone(),
        ledger.clone(),
        user_repository,
    ));
    let order_service = Arc::new(OrderApplicationService::new(
        order_repository,
        ledger,
        Arc::new(TracingActivityRecorder::new()),
        order_query_service.clone(),
    ));

    let app_state = AppState {
        order_service,
        order_query_service,
        gate: AuthorizationGate::new(token_service),
    };

    // REST APIルーターを作成
    let app = create_router().with_state(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    // サーバーを起動
    let addr = server_config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "REST APIサーバーが起動しました");

    axum::serve(listener, app).await?;

    Ok(())
}
