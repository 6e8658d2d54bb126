//! Unit tests for Value and ValueType

use core_types::{Value, ValueType};
use std::time::Duration;

#[test]
fn test_value_display() {
    assert_eq!(Value::Int(-3).to_string(), "-3");
    assert_eq!(Value::Float(1.5).to_string(), "1.5");
    assert_eq!(Value::Str("GET".to_string()).to_string(), "GET");
    assert_eq!(Value::Bool(false).to_string(), "false");
}

#[test]
fn test_value_type_names() {
    assert_eq!(Value::Int(1).type_name(), "int");
    assert_eq!(Value::Duration(Duration::from_secs(3600)).type_name(), "duration");
    assert_eq!(ValueType::Float.to_string(), "float");
}

#[test]
fn test_value_serializes_untagged() {
    assert_eq!(serde_json::to_string(&Value::Int(7)).unwrap(), "7");
    assert_eq!(serde_json::to_string(&Value::Str("a".into())).unwrap(), "\"a\"");
    assert_eq!(serde_json::to_string(&ValueType::String).unwrap(), "\"string\"");
}
