use serde::de::DeserializeOwned;

/// Deserialize a bound value tree with key-path context in error messages.
pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, String> {
    match serde_path_to_error::deserialize::<_, T>(value) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at key {path} → {}", err.into_inner()))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Outer {
        inner: Inner,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Inner {
        values: Vec<u8>,
    }

    #[test]
    fn errors_name_the_failing_path() {
        let value = serde_json::json!({"inner": {"values": [1, 2, 300]}});
        let err = from_value_with_path::<Outer>(value).unwrap_err();
        assert!(err.starts_with("at key inner.values[2]"), "{err}");

        let err = from_value_with_path::<Outer>(serde_json::json!({"inner": {}})).unwrap_err();
        assert!(err.contains("missing field `values`"), "{err}");
    }
}
