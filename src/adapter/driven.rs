// 駆動される側アダプター（リポジトリ・在庫台帳・トークンサービスの実装）

mod activity_log;
mod in_memory;
mod jwt_token_service;
mod mysql_inventory_ledger;
mod mysql_order_repository;
mod mysql_user_repository;

pub use activity_log::{InMemoryActivityLog, TracingActivityRecorder};
pub use in_memory::{InMemoryInventoryLedger, InMemoryOrderRepository, InMemoryUserRepository};
pub use jwt_token_service::{JwtConfig, JwtTokenService};
pub use mysql_inventory_ledger::MySqlInventoryLedger;
pub use mysql_order_repository::MySqlOrderRepository;
pub use mysql_user_repository::MySqlUserRepository;
