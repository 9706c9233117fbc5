// ドメイン層
// ビジネスルールと、外部への依存を表すポートを定義する

pub mod error;
pub mod event;
pub mod model;
pub mod port;
pub mod service;
