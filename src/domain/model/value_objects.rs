use crate::domain::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// UUIDをラップした識別子型を定義する
macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// 新しい一意の識別子を生成
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// UUIDから識別子を作成
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// 文字列から識別子を作成
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                let uuid = Uuid::parse_str(s)?;
                Ok(Self(uuid))
            }

            /// 内部のUUIDを取得
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

uuid_identifier!(
    /// 注文の一意識別子
    OrderId
);
uuid_identifier!(
    /// 注文明細の一意識別子
    OrderItemId
);
uuid_identifier!(
    /// 商品の一意識別子
    ProductId
);
uuid_identifier!(
    /// ユーザーの一意識別子
    UserId
);

/// 通貨
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    /// インドネシア・ルピア
    #[allow(clippy::upper_case_acronyms)]
    IDR,
}

/// 金額を表す値オブジェクト
/// 金額は負にならない
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// 金額と通貨から作成
    pub fn new(amount: i64, currency: &str) -> Result<Self, DomainError> {
        let currency = match currency {
            "IDR" => Currency::IDR,
            _ => {
                return Err(DomainError::InvalidValue(format!(
                    "サポートされていない通貨: {}",
                    currency
                )))
            }
        };
        if amount < 0 {
            return Err(DomainError::InvalidValue(format!(
                "金額は0以上である必要があります: {}",
                amount
            )));
        }
        Ok(Self { amount, currency })
    }

    /// ルピアの金額を作成
    pub fn idr(amount: i64) -> Self {
        Self {
            amount,
            currency: Currency::IDR,
        }
    }

    /// ゼロ円相当の金額
    pub fn zero() -> Self {
        Self::idr(0)
    }

    /// 金額を取得
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// 通貨を文字列として取得
    pub fn currency(&self) -> &'static str {
        match self.currency {
            Currency::IDR => "IDR",
        }
    }

    /// 金額を加算
    pub fn add(&self, other: &Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch);
        }
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| DomainError::InvalidValue("金額がオーバーフローしました".to_string()))?;
        Ok(Money {
            amount,
            currency: self.currency,
        })
    }

    /// 金額を乗算
    pub fn multiply(&self, factor: u32) -> Result<Money, DomainError> {
        let amount = self
            .amount
            .checked_mul(i64::from(factor))
            .ok_or_else(|| DomainError::InvalidValue("金額がオーバーフローしました".to_string()))?;
        Ok(Money {
            amount,
            currency: self.currency,
        })
    }
}

/// 人が読める注文番号
/// 形式: `ORD-YYYYMMDD-XXXXXXXX`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// 日付とランダムな接尾辞から注文番号を生成
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        Self(format!("ORD-{}-{}", now.format("%Y%m%d"), suffix))
    }

    /// 永続化された値から復元
    pub fn from_string(s: String) -> Result<Self, DomainError> {
        if s.trim().is_empty() || s.len() > 50 {
            return Err(DomainError::InvalidValue(format!("無効な注文番号: {}", s)));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 配送先を表す値オブジェクト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    address: String,
    phone: String,
}

impl ShippingAddress {
    const MAX_ADDRESS_LEN: usize = 500;
    const MAX_PHONE_LEN: usize = 20;

    /// 新しい配送先を作成
    /// バリデーション:
    /// - 住所は空でなく500文字以内
    /// - 電話番号は20文字以内（省略可）
    pub fn new(address: String, phone: String) -> Result<Self, DomainError> {
        if address.trim().is_empty() {
            return Err(DomainError::OrderValidation(
                "配送先住所は必須です".to_string(),
            ));
        }
        if address.chars().count() > Self::MAX_ADDRESS_LEN {
            return Err(DomainError::OrderValidation(format!(
                "配送先住所は{}文字以内である必要があります",
                Self::MAX_ADDRESS_LEN
            )));
        }
        if phone.chars().count() > Self::MAX_PHONE_LEN {
            return Err(DomainError::OrderValidation(format!(
                "電話番号は{}文字以内である必要があります",
                Self::MAX_PHONE_LEN
            )));
        }
        Ok(Self { address, phone })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }
}

/// 注文メモの最大文字数
pub const MAX_NOTES_LEN: usize = 1000;

/// メモの長さを検証する
pub fn validate_notes(notes: &str) -> Result<(), DomainError> {
    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(DomainError::OrderValidation(format!(
            "メモは{}文字以内である必要があります",
            MAX_NOTES_LEN
        )));
    }
    Ok(())
}

/// 注文のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// 保留中（作成直後）
    Pending,
    /// 確認済み
    Confirmed,
    /// 処理中
    Processing,
    /// 発送済み
    Shipped,
    /// 配達完了
    Delivered,
    /// キャンセル済み
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status_str = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        };
        write!(f, "{}", status_str)
    }
}

impl OrderStatus {
    /// 文字列からOrderStatusを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Confirmed" => Ok(OrderStatus::Confirmed),
            "Processing" => Ok(OrderStatus::Processing),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(DomainError::InvalidValue(format!(
                "無効な注文ステータス: {}",
                s
            ))),
        }
    }

    /// キャンセル可能なステータスかどうか
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}
