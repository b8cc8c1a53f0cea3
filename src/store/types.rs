use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Field of the host document that holds the active servers.
pub const ACTIVE_FIELD: &str = "mcpServers";

/// Keys read through the typed accessors of [`ServerDefinition`].
const KNOWN_KEYS: [&str; 6] = ["command", "args", "env", "type", "timeout", "alwaysAllow"];

/// Name → definition, in document order.
pub type ServerMap = IndexMap<String, ServerDefinition>;

/// One MCP server entry as it appears under `mcpServers`.
///
/// The entry is held as the JSON it was read from. Accessors interpret the
/// keys Claude uses (`command`, `args`, `env`, `type`, `timeout`,
/// `alwaysAllow`), but nothing is normalised, so writing an entry back
/// reproduces it key for key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerDefinition(Value);

impl Default for ServerDefinition {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl ServerDefinition {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        let mut map = Map::new();
        map.insert("command".to_string(), Value::String(command.into()));
        map.insert(
            "args".to_string(),
            Value::Array(args.into_iter().map(Value::String).collect()),
        );
        Self(Value::Object(map))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn with_env(self, vars: IndexMap<String, String>) -> Self {
        let vars = vars.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
        self.with("env", Value::Object(vars))
    }

    pub fn with_kind(self, kind: impl Into<String>) -> Self {
        self.with("type", Value::String(kind.into()))
    }

    pub fn with_timeout(self, seconds: u64) -> Self {
        self.with("timeout", Value::Number(Number::from(seconds)))
    }

    pub fn with_always_allow(self, tools: Vec<String>) -> Self {
        self.with(
            "alwaysAllow",
            Value::Array(tools.into_iter().map(Value::String).collect()),
        )
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        if let Value::Object(map) = &mut self.0 {
            map.insert(key.to_string(), value);
        }
        self
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.0.as_object().and_then(|map| map.get(key))
    }

    pub fn command(&self) -> Option<&str> {
        self.field("command").and_then(Value::as_str)
    }

    /// Arguments as text; non-string items are shown as their JSON.
    pub fn args(&self) -> Vec<String> {
        self.field("args")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(display_value).collect())
            .unwrap_or_default()
    }

    pub fn kind(&self) -> Option<&str> {
        self.field("type").and_then(Value::as_str)
    }

    pub fn timeout(&self) -> Option<String> {
        self.field("timeout")
            .filter(|v| !v.is_null())
            .map(display_value)
    }

    pub fn env_keys(&self) -> Vec<&str> {
        self.field("env")
            .and_then(Value::as_object)
            .map(|vars| vars.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn always_allow(&self) -> Vec<String> {
        self.field("alwaysAllow")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(display_value).collect())
            .unwrap_or_default()
    }

    /// Keys other than the ones the accessors above read.
    pub fn extra(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0
            .as_object()
            .into_iter()
            .flat_map(|map| map.iter())
            .filter(|(key, _)| !KNOWN_KEYS.contains(&key.as_str()))
    }

    /// `command args...` on one line, or the URL for remote servers.
    pub fn summary(&self) -> String {
        let Some(command) = self.command().filter(|c| !c.is_empty()) else {
            if let Some(url) = self.field("url").and_then(Value::as_str) {
                return url.to_string();
            }
            return "(no command)".to_string();
        };
        let args = self.args();
        if args.is_empty() {
            command.to_string()
        } else {
            format!("{} {}", command, args.join(" "))
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The active view of the host document.
///
/// Only the server mapping is held here; the remaining fields belong to
/// Claude and are re-read from disk at write time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostDocument {
    pub servers: ServerMap,
}

/// The private document holding disabled servers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisabledDocument {
    #[serde(rename = "disabledMcpServers", default)]
    pub servers: ServerMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trips_key_for_key() {
        let raw = r#"{"type":"http","url":"http://x","headers":{"a":"b"},"env":{"PORT":8080},"timeout":"30"}"#;
        let def: ServerDefinition = serde_json::from_str(raw).expect("parse");
        assert_eq!(serde_json::to_string(&def).expect("encode"), raw);
        assert_eq!(def.kind(), Some("http"));
        assert_eq!(def.env_keys(), vec!["PORT"]);
        let extra: Vec<&String> = def.extra().map(|(k, _)| k).collect();
        assert_eq!(extra, ["url", "headers"]);
    }

    #[test]
    fn builder_uses_claude_key_names() {
        let def = ServerDefinition::new("node", vec!["a.js".to_string()])
            .with_kind("stdio")
            .with_timeout(30)
            .with_always_allow(vec!["read".to_string()]);
        let value = def.as_value();
        assert_eq!(value["command"], "node");
        assert_eq!(value["type"], "stdio");
        assert_eq!(value["timeout"], 30);
        assert_eq!(value["alwaysAllow"][0], "read");
        assert!(value.get("env").is_none());
    }

    #[test]
    fn accessors_tolerate_unexpected_shapes() {
        let def = ServerDefinition::from_value(serde_json::json!({
            "command": "py",
            "args": ["-m", 7],
            "alwaysAllow": "everything"
        }));
        assert_eq!(def.args(), vec!["-m".to_string(), "7".to_string()]);
        assert!(def.always_allow().is_empty());
        assert_eq!(def.summary(), "py -m 7");

        let odd = ServerDefinition::from_value(Value::from(5));
        assert_eq!(odd.command(), None);
        assert_eq!(odd.extra().count(), 0);
    }

    #[test]
    fn summary_falls_back_to_url() {
        let def = ServerDefinition::from_value(serde_json::json!({"url": "https://mcp.example"}));
        assert_eq!(def.summary(), "https://mcp.example");
        assert_eq!(
            ServerDefinition::new("node", vec!["a.js".into()]).summary(),
            "node a.js"
        );
    }
}
