//! `${VAR}` expansion over the raw YAML tree.
//!
//! Expansion runs on every string scalar before typed decoding, so a
//! reference can appear in any field. Lookups are injected so tests never
//! touch the process environment.
//!
//! Errors name the field path (`connection.password`, `env.list[1]`) and
//! never the value, which may already hold half a secret.

use serde_yaml::Value;

use super::ConfigError;

/// Expand every `${NAME}` in `input`, the value found at `field`.
/// A `$` not followed by `{` is literal.
pub fn expand_env<F>(input: &str, field: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(ConfigError::MalformedReference {
                field: field.to_string(),
            });
        };
        let name = &after[..end];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::MalformedReference {
                field: field.to_string(),
            });
        }
        match lookup(name) {
            Some(value) => out.push_str(&value),
            None => return Err(ConfigError::UnsetEnv(name.to_string())),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Walk a YAML value and expand all string scalars in place.
pub fn expand_value<F>(value: &mut Value, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    expand_at(value, "", lookup)
}

fn expand_at<F>(value: &mut Value, path: &str, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) => {
            if s.contains("${") {
                *s = expand_env(s, path, lookup)?;
            }
        }
        Value::Sequence(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                expand_at(item, &format!("{path}[{i}]"), lookup)?;
            }
        }
        Value::Mapping(map) => {
            for (k, v) in map.iter_mut() {
                let key = key_name(k);
                let child = if path.is_empty() { key } else { format!("{path}.{key}") };
                expand_at(v, &child, lookup)?;
            }
        }
        Value::Tagged(tagged) => expand_at(&mut tagged.value, path, lookup)?,
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}

fn key_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn expands_multiple_references() {
        let lookup = env(&[("HOST", "pq.example"), ("PORT", "8000")]);
        let out = expand_env("https://${HOST}:${PORT}/iris", "connection.url", &lookup).unwrap();
        assert_eq!(out, "https://pq.example:8000/iris");
    }

    #[test]
    fn plain_dollar_is_literal() {
        let lookup = env(&[]);
        assert_eq!(expand_env("cost $5", "name", &lookup).unwrap(), "cost $5");
    }

    #[test]
    fn unset_variable_is_distinct_error() {
        let lookup = env(&[]);
        let err = expand_env("${PQ_PASSWORD}", "connection.password", &lookup).unwrap_err();
        assert!(matches!(err, ConfigError::UnsetEnv(name) if name == "PQ_PASSWORD"));
    }

    #[test]
    fn unterminated_reference_is_malformed() {
        let lookup = env(&[("A", "1")]);
        let err = expand_env("x${A", "name", &lookup).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedReference { field } if field == "name"));
    }

    #[test]
    fn expands_nested_yaml_strings() {
        let lookup = env(&[("NS", "sim_out")]);
        let mut value: Value =
            serde_yaml::from_str("env:\n  OUTPUT_NAMESPACE: ${NS}\nlist: [a, '${NS}']\nn: 3\n")
                .unwrap();
        expand_value(&mut value, &lookup).unwrap();
        assert_eq!(value["env"]["OUTPUT_NAMESPACE"].as_str(), Some("sim_out"));
        assert_eq!(value["list"][1].as_str(), Some("sim_out"));
        assert_eq!(value["n"].as_u64(), Some(3));
    }

    #[test]
    fn malformed_reference_names_the_field_not_the_value() {
        let lookup = env(&[]);
        let mut value: Value = serde_yaml::from_str(
            "connection:\n  url: sim://\n  username: ops\n  password: 's3cr${et'\n",
        )
        .unwrap();
        let err = expand_value(&mut value, &lookup).unwrap_err();
        let message = err.to_string();

        assert!(message.contains("connection.password"), "{message}");
        assert!(!message.contains("s3cr"), "{message}");
    }

    #[test]
    fn sequence_indices_appear_in_the_path() {
        let lookup = env(&[]);
        let mut value: Value = serde_yaml::from_str("args: [ok, '${bad name}']\n").unwrap();
        let err = expand_value(&mut value, &lookup).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedReference { field } if field == "args[1]"));
    }
}
