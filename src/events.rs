use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One key/value pair of an operation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

pub fn attr(key: &str, value: impl ToString) -> Attribute {
    Attribute {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Result of a state-changing operation: an ordered attribute list with a
/// fixed `action` attribute first, plus action-specific fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub log: Vec<Attribute>,
}

impl Response {
    pub fn new(log: Vec<Attribute>) -> Self {
        Self { log }
    }

    /// Look up a logged attribute by key (first match).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.log
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    /// Fold the log into a flat JSON object for API responses.
    /// Repeated keys (batch feeds) keep the last value; the ordered list is
    /// preserved under `log`.
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("success".to_string(), json!(true));
        for a in &self.log {
            map.insert(a.key.clone(), json!(a.value));
        }
        map.insert("log".to_string(), json!(self.log));
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_ordering_preserved() {
        let resp = Response::new(vec![
            attr("action", "bet"),
            attr("amount", 100u64),
            attr("position", "up"),
        ]);
        assert_eq!(resp.log[0].key, "action");
        assert_eq!(resp.get("amount"), Some("100"));
        assert_eq!(resp.get("missing"), None);
    }

    #[test]
    fn test_to_json_flattens_attributes() {
        let resp = Response::new(vec![attr("action", "withdraw"), attr("amount", 45u64)]);
        let v = resp.to_json();
        assert_eq!(v["success"], json!(true));
        assert_eq!(v["action"], json!("withdraw"));
        assert_eq!(v["amount"], json!("45"));
        assert_eq!(v["log"].as_array().unwrap().len(), 2);
    }
}
