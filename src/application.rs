// アプリケーション層
// ユースケースの実行と認可を担当

pub mod auth;
pub mod error;
pub mod service;

pub use error::ApplicationError;
