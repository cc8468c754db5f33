//! Cache key normalization
//!
//! A key is the endpoint name followed by a canonical JSON rendering of the
//! arguments: object members sorted by name at every depth, `null` members
//! dropped. Field order and `None` vs. absent never produce distinct keys.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::error::CacheError;

/// Deterministic identifier of one (endpoint, arguments) query
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Normalizes an endpoint name and its arguments into a key
    pub fn new<A>(endpoint: &str, args: &A) -> Result<Self, CacheError>
    where
        A: Serialize + ?Sized,
    {
        let value = serde_json::to_value(args)?;
        let mut key = String::with_capacity(endpoint.len() + 32);
        key.push_str(endpoint);
        key.push('(');
        write_canonical(&value, &mut key)?;
        key.push(')');
        Ok(Self(key))
    }

    /// The key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn write_canonical(value: &Value, out: &mut String) -> Result<(), serde_json::Error> {
    match value {
        Value::Object(map) => {
            let mut members: Vec<_> = map.iter().filter(|(_, v)| !v.is_null()).collect();
            members.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (name, member)) in members.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(name)?);
                out.push(':');
                write_canonical(member, out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct SubredditFirst {
        subreddit: String,
        limit: u32,
    }

    #[derive(Serialize)]
    struct LimitFirst {
        limit: u32,
        subreddit: String,
    }

    #[test]
    fn test_key_format() {
        let key = CacheKey::new("getSubredditPosts", &json!({"subreddit": "rust", "limit": 25}))
            .expect("json args serialize");
        assert_eq!(key.as_str(), r#"getSubredditPosts({"limit":25,"subreddit":"rust"})"#);
        assert_eq!(key.to_string(), key.as_str());
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let a = CacheKey::new(
            "posts",
            &SubredditFirst {
                subreddit: "x".to_string(),
                limit: 25,
            },
        )
        .unwrap();
        let b = CacheKey::new(
            "posts",
            &LimitFirst {
                limit: 25,
                subreddit: "x".to_string(),
            },
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_map_insertion_order_does_not_matter() {
        let mut first = HashMap::new();
        first.insert("a", 1);
        first.insert("b", 2);
        let mut second = HashMap::new();
        second.insert("b", 2);
        second.insert("a", 1);

        assert_eq!(
            CacheKey::new("ep", &first).unwrap(),
            CacheKey::new("ep", &second).unwrap()
        );
    }

    #[test]
    fn test_nested_objects_are_sorted() {
        let a = CacheKey::new("ep", &json!({"outer": {"z": 1, "a": [{"y": 2, "b": 3}]}})).unwrap();
        assert_eq!(a.as_str(), r#"ep({"outer":{"a":[{"b":3,"y":2}],"z":1}})"#);
    }

    #[test]
    fn test_null_members_are_dropped() {
        let explicit = CacheKey::new("ep", &json!({"subreddit": "x", "limit": null})).unwrap();
        let absent = CacheKey::new("ep", &json!({"subreddit": "x"})).unwrap();
        assert_eq!(explicit, absent);
    }

    #[test]
    fn test_array_order_matters() {
        let a = CacheKey::new("ep", &json!([1, 2])).unwrap();
        let b = CacheKey::new("ep", &json!([2, 1])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_endpoint_name_is_part_of_key() {
        let args = json!({"subreddit": "x"});
        assert_ne!(
            CacheKey::new("getSubredditPosts", &args).unwrap(),
            CacheKey::new("searchPosts", &args).unwrap()
        );
    }

    #[test]
    fn test_unit_args() {
        let key = CacheKey::new("ep", &()).unwrap();
        assert_eq!(key.as_str(), "ep(null)");
    }

    #[test]
    fn test_unserializable_args_are_rejected() {
        let mut args = HashMap::new();
        args.insert((1, 2), "tuple keys are not valid JSON object keys");
        assert!(CacheKey::new("ep", &args).is_err());
    }
}
