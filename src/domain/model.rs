// ドメインモデル（エンティティと値オブジェクト）

mod value_objects;
mod activity;
mod order;
mod product;
mod user;

pub use value_objects::{
    validate_notes, Money, OrderId, OrderItemId, OrderNumber, OrderStatus, ProductId,
    ShippingAddress, UserId, MAX_NOTES_LEN,
};

pub use order::{Order, OrderItem, OrderRecord};
pub use activity::{Activity, ActivityType};
pub use product::Product;
pub use user::User;
