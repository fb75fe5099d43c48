use std::fmt;

use bytes::Bytes;
use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde_json::value::RawValue;

use orders_api::IDENTIFIER_FIELD;

use crate::error::NormalizeError;

/// Результат нормализации: идентификатор + канонический payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedOrder {
    pub id: String,
    pub payload: Bytes,
}

/// Из документа декодируется только идентификатор, остальное остаётся opaque.
/// При повторе ключа побеждает последнее значение.
struct IdentifierOnly<'a> {
    order_uid: Option<&'a RawValue>,
}

impl<'de> Deserialize<'de> for IdentifierOnly<'de> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(IdentifierVisitor)
    }
}

struct IdentifierVisitor;

impl<'de> Visitor<'de> for IdentifierVisitor {
    type Value = IdentifierOnly<'de>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut order_uid = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == IDENTIFIER_FIELD {
                order_uid = Some(map.next_value::<&'de RawValue>()?);
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(IdentifierOnly { order_uid })
    }
}

/// Проверить входящий payload, извлечь `order_uid` и привести JSON
/// к каноническому виду (без незначащих пробелов).
///
/// Порядок ключей, запись чисел и escape-последовательности в строках
/// сохраняются как есть, поэтому повторная нормализация канонического
/// payload возвращает те же байты.
pub fn normalize(raw: &[u8]) -> Result<NormalizedOrder, NormalizeError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| NormalizeError::MalformedPayload(format!("invalid utf-8: {e}")))?;
    serde_json::from_str::<IgnoredAny>(text)
        .map_err(|e| NormalizeError::MalformedPayload(e.to_string()))?;

    let canonical = compact(text.as_bytes());

    // Struct-десериализатор serde принимает и массивы, отсекаем заранее.
    if canonical.first() != Some(&b'{') {
        return Err(NormalizeError::MissingIdentifier(
            "document is not an object".into(),
        ));
    }

    let head: IdentifierOnly<'_> = serde_json::from_slice(&canonical)
        .map_err(|e| NormalizeError::MissingIdentifier(e.to_string()))?;
    let raw_id = head.order_uid.ok_or_else(|| {
        NormalizeError::MissingIdentifier(format!("no '{IDENTIFIER_FIELD}' field"))
    })?;
    let id: String = serde_json::from_str(raw_id.get()).map_err(|_| {
        NormalizeError::MissingIdentifier(format!("'{IDENTIFIER_FIELD}' is not a string"))
    })?;
    if id.is_empty() {
        return Err(NormalizeError::MissingIdentifier(format!(
            "'{IDENTIFIER_FIELD}' is empty"
        )));
    }

    Ok(NormalizedOrder {
        id,
        payload: Bytes::from(canonical),
    })
}

/// Удаляет пробелы вне строковых литералов. Вход обязан быть валидным JSON.
///
/// Работает побайтно: в UTF-8 байты многобайтных символов никогда не
/// совпадают с ASCII `"`, `\` или пробельными символами.
fn compact(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for &b in input {
        if in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b' ' | b'\t' | b'\n' | b'\r' => {}
            b'"' => {
                in_string = true;
                out.push(b);
            }
            _ => out.push(b),
        }
    }
    out
}
