//! Conversion between plain JSON and DynamoDB `AttributeValue` JSON.

use serde_json::{json, Map, Number, Value};

fn to_attribute(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "NULL": true }),
        Value::Bool(b) => json!({ "BOOL": b }),
        Value::Number(n) => json!({ "N": n.to_string() }),
        Value::String(s) => json!({ "S": s }),
        Value::Array(items) => json!({ "L": items.iter().map(to_attribute).collect::<Vec<_>>() }),
        Value::Object(map) => json!({ "M": marshal_item(map) }),
    }
}

/// Plain JSON object to a DynamoDB item.
pub fn marshal_item(item: &Map<String, Value>) -> Map<String, Value> {
    item.iter()
        .map(|(k, v)| (k.clone(), to_attribute(v)))
        .collect()
}

fn parse_number(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

fn from_attribute(attribute: &Value) -> Value {
    let Some((tag, inner)) = attribute.as_object().and_then(|m| m.iter().next()) else {
        return Value::Null;
    };
    match tag.as_str() {
        "S" | "B" => inner.clone(),
        "N" => inner.as_str().map(parse_number).unwrap_or(Value::Null),
        "BOOL" => inner.clone(),
        "NULL" => Value::Null,
        "SS" | "BS" => inner.clone(),
        "NS" => Value::Array(
            inner
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .map(parse_number)
                .collect(),
        ),
        "L" => Value::Array(
            inner
                .as_array()
                .into_iter()
                .flatten()
                .map(from_attribute)
                .collect(),
        ),
        "M" => inner
            .as_object()
            .map(|m| Value::Object(unmarshal_item(m)))
            .unwrap_or(Value::Null),
        _ => inner.clone(),
    }
}

/// DynamoDB item to plain JSON.
pub fn unmarshal_item(item: &Map<String, Value>) -> Map<String, Value> {
    item.iter()
        .map(|(k, v)| (k.clone(), from_attribute(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marshal_nested() {
        let item = json!({"id": "a", "n": 3, "tags": ["x", 1.5], "meta": {"ok": true, "none": null}});
        let marshalled = marshal_item(item.as_object().unwrap());
        assert_eq!(marshalled["id"], json!({"S": "a"}));
        assert_eq!(marshalled["n"], json!({"N": "3"}));
        assert_eq!(marshalled["tags"], json!({"L": [{"S": "x"}, {"N": "1.5"}]}));
        assert_eq!(
            marshalled["meta"],
            json!({"M": {"ok": {"BOOL": true}, "none": {"NULL": true}}})
        );
    }

    #[test]
    fn test_unmarshal_sets_and_numbers() {
        let item = json!({
            "id": {"S": "a"},
            "count": {"N": "42"},
            "ratio": {"N": "0.25"},
            "names": {"SS": ["a", "b"]},
            "scores": {"NS": ["1", "2.5"]},
            "nested": {"M": {"flag": {"BOOL": false}}}
        });
        let plain = Value::Object(unmarshal_item(item.as_object().unwrap()));
        assert_eq!(
            plain,
            json!({
                "id": "a",
                "count": 42,
                "ratio": 0.25,
                "names": ["a", "b"],
                "scores": [1, 2.5],
                "nested": {"flag": false}
            })
        );
    }
}
