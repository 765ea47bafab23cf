//! Request-scoped inputs consumed by lifecycle hooks.

use serde_json::Value;

/// Caller context for one logical operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Parsed `where` clause of the listing query, if any.
    pub where_clause: Option<Value>,
    /// Acting user id, forwarded into notifications.
    pub user_id: Option<String>,
    /// Requested language; fetched items are localized to it.
    pub language: Option<String>,
}

impl RequestContext {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Attaches a raw JSON `where` clause.
    pub fn with_where_json(mut self, raw: &str) -> Result<Self, serde_json::Error> {
        self.where_clause = Some(serde_json::from_str(raw)?);
        Ok(self)
    }

    /// True when the query explicitly filters for `type=manageable`.
    ///
    /// Such listings are editor views and keep inactive items.
    pub fn requests_manageable(&self) -> bool {
        self.where_clause
            .as_ref()
            .and_then(|clause| clause.get("type"))
            .and_then(Value::as_str)
            == Some("manageable")
    }
}

#[cfg(test)]
mod tests {
    use super::RequestContext;

    #[test]
    fn manageable_filter_is_detected_from_where_clause() {
        let ctx = RequestContext::default()
            .with_where_json(r#"{"type": "manageable"}"#)
            .expect("where clause should parse");
        assert!(ctx.requests_manageable());

        let other = RequestContext::default()
            .with_where_json(r#"{"type": "unmanageable"}"#)
            .expect("where clause should parse");
        assert!(!other.requests_manageable());
        assert!(!RequestContext::default().requests_manageable());
    }
}
