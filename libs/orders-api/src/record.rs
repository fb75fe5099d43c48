use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::value::RawValue;

/// Поле документа, содержащее идентификатор заказа.
pub const IDENTIFIER_FIELD: &str = "order_uid";

// ════════════════════════════════════════════════════════════════
//  OrderRecord
// ════════════════════════════════════════════════════════════════

/// Заказ в том виде, в каком он лежит в durable storage.
///
/// `payload` это канонический (компактный) JSON, возвращается побайтно
/// таким же, каким его записал normalizer. `created_at` назначает
/// хранилище при первой вставке и больше не меняет.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: String,
    pub payload: Bytes,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn new(id: impl Into<String>, payload: Bytes, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            payload,
            created_at,
        }
    }
}

impl Serialize for OrderRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        // Payload уже валидный JSON, вставляем inline, без повторного парсинга в Value.
        let payload: &RawValue =
            serde_json::from_slice(&self.payload).map_err(serde::ser::Error::custom)?;

        let mut s = serializer.serialize_struct("OrderRecord", 3)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("payload", payload)?;
        s.serialize_field("created_at", &self.created_at)?;
        s.end()
    }
}
