//! The request envelope: payload separated from credential.
//!
//! Clients wrap what they send as
//!
//! ```json
//! {"data": <payload for the route>, "token": <credential for the permission check>}
//! ```
//!
//! in the JSON/urlencoded body, in the query string, or both.
//! [`Envelope::unpack`] pulls the token out and leaves the payload where
//! route handlers expect it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::utils::value::{is_truthy, to_text, truthy};

/// Query, body and token of one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    pub query: Map<String, Value>,
    /// Decoded body, `None` when there was none or unpacking discarded it.
    pub body: Option<Value>,
    pub token: Option<Value>,
}

impl Envelope {
    pub fn new(query: Map<String, Value>, body: Option<Value>) -> Self {
        Self {
            query,
            body,
            token: None,
        }
    }

    /// Separates token from payload, in place.
    ///
    /// Query: a truthy `token` is taken and removed, then the fields of
    /// `data` are merged over the remaining query fields (`data` wins on
    /// conflicts, the `data` key itself is consumed).
    ///
    /// Body: a truthy `token` is taken, replacing any query token, and the
    /// body is replaced by its `data` field. Everything else at the top
    /// level of the body is dropped.
    ///
    /// A `token` field inside the body's `data` is removed as well.
    pub fn unpack(&mut self) {
        if let Some(token) = truthy(self.query.get("token")) {
            self.token = Some(token.clone());
        }
        self.query.remove("token");
        match self.query.remove("data") {
            Some(Value::Object(data)) => {
                for (key, value) in data {
                    self.query.insert(key, value);
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => {
                self.query.insert("data".to_string(), other);
            }
        }

        if let Some(body) = self.body.take() {
            self.body = match body {
                Value::Object(mut fields) => {
                    if let Some(token) = truthy(fields.get("token")) {
                        self.token = Some(token.clone());
                    }
                    fields.remove("token");
                    fields.remove("data").filter(|data| !data.is_null())
                }
                _ => None,
            };
        }

        if let Some(Value::Object(fields)) = self.body.as_mut() {
            fields.remove("token");
        }
    }

    /// The extracted token as text, if any.
    pub fn token_str(&self) -> Option<String> {
        self.token.as_ref().filter(|t| is_truthy(t)).map(to_text)
    }
}

impl<S> FromRequestParts<S> for Envelope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Envelope>()
            .cloned()
            .ok_or_else(|| AppError::internal("request was not unpacked"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn test_query_token_and_data() {
        let mut envelope = Envelope::new(map(json!({"data": {"a": 1}, "token": "T"})), None);
        envelope.unpack();

        assert_eq!(Value::Object(envelope.query), json!({"a": 1}));
        assert_eq!(envelope.token, Some(json!("T")));
        assert_eq!(envelope.body, None);
    }

    #[test]
    fn test_query_data_merges_over_query() {
        let mut envelope = Envelope::new(map(json!({"data": {"a": 1}, "b": 2})), None);
        envelope.unpack();
        assert_eq!(Value::Object(envelope.query), json!({"a": 1, "b": 2}));
        assert_eq!(envelope.token, None);

        let mut conflict = Envelope::new(map(json!({"data": {"a": "inner"}, "a": "outer"})), None);
        conflict.unpack();
        assert_eq!(Value::Object(conflict.query), json!({"a": "inner"}));
    }

    #[test]
    fn test_body_token_wins_over_query_token() {
        let mut envelope = Envelope::new(
            map(json!({"data": {}, "token": "T2"})),
            Some(json!({"data": {"x": 2}, "token": "T1"})),
        );
        envelope.unpack();

        assert_eq!(envelope.token, Some(json!("T1")));
        assert_eq!(envelope.body, Some(json!({"x": 2})));
        assert_eq!(envelope.token_str().as_deref(), Some("T1"));
    }

    #[test]
    fn test_query_token_survives_tokenless_body() {
        let mut envelope = Envelope::new(
            map(json!({"token": "Q"})),
            Some(json!({"data": {"x": 1}})),
        );
        envelope.unpack();
        assert_eq!(envelope.token, Some(json!("Q")));
    }

    #[test]
    fn test_body_top_level_fields_are_discarded() {
        let mut envelope = Envelope::new(
            Map::new(),
            Some(json!({"data": [1, 2], "extra": true})),
        );
        envelope.unpack();
        assert_eq!(envelope.body, Some(json!([1, 2])));

        let mut no_data = Envelope::new(Map::new(), Some(json!({"name": "x"})));
        no_data.unpack();
        assert_eq!(no_data.body, None);
    }

    #[test]
    fn test_token_inside_body_data_is_removed() {
        let mut envelope = Envelope::new(
            Map::new(),
            Some(json!({"data": {"token": "inner", "keep": 1}})),
        );
        envelope.unpack();

        assert_eq!(envelope.body, Some(json!({"keep": 1})));
        assert_eq!(envelope.token, None);
    }

    #[test]
    fn test_falsy_token_is_not_taken_but_still_removed() {
        let mut envelope = Envelope::new(map(json!({"token": "", "a": 1})), None);
        envelope.unpack();
        assert_eq!(envelope.token, None);
        assert_eq!(Value::Object(envelope.query), json!({"a": 1}));
    }

    #[test]
    fn test_non_object_body_is_dropped() {
        let mut envelope = Envelope::new(Map::new(), Some(json!("just text")));
        envelope.unpack();
        assert_eq!(envelope.body, None);
    }

    #[test]
    fn test_non_object_query_data_is_kept() {
        let mut envelope = Envelope::new(map(json!({"data": "raw"})), None);
        envelope.unpack();
        assert_eq!(Value::Object(envelope.query), json!({"data": "raw"}));
    }
}
