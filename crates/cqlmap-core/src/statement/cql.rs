use crate::statement::{Condition, Using};

/// `keyspace.table`
pub(crate) fn qualified(keyspace: &str, name: &str) -> String {
    format!("{keyspace}.{name}")
}

/// ` USING TTL n AND TIMESTAMP n`, or nothing.
pub(crate) fn using(using: &Using) -> String {
    let mut parts = Vec::new();
    if let Some(ttl) = using.ttl {
        parts.push(format!("TTL {ttl}"));
    }
    if let Some(timestamp) = using.timestamp {
        parts.push(format!("TIMESTAMP {timestamp}"));
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!(" USING {}", parts.join(" AND "))
    }
}

pub(crate) fn condition(condition: Option<&Condition>) -> String {
    match condition {
        None => String::new(),
        Some(Condition::IfExists) => " IF EXISTS".to_string(),
        Some(Condition::IfNotExists) => " IF NOT EXISTS".to_string(),
        Some(Condition::If(predicates)) => format!(" IF {}", predicates.join(" AND ")),
    }
}

pub(crate) const fn if_not_exists(enabled: bool) -> &'static str {
    if enabled { "IF NOT EXISTS " } else { "" }
}

pub(crate) fn markers(count: usize) -> String {
    vec!["?"; count].join(", ")
}
