//! HTTP client for the hosted REST table API.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;

use super::{DataError, DataService, Filter, Table};

/// Table access over `/rest/v1/{table}`.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: String,
}

impl RestClient {
    /// Creates a client authorized as the holder of `access_token`.
    pub fn new(base_url: String, api_key: String, access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            access_token,
        }
    }

    /// Builds the endpoint URL for `table`.
    fn table_url(&self, table: Table) -> String {
        let base_url = if !self.base_url.starts_with("http://")
            && !self.base_url.starts_with("https://")
        {
            format!("https://{}", self.base_url)
        } else {
            self.base_url.clone()
        };

        format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table.name())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.access_token))
    }

    async fn check(table: Table, response: Response) -> Result<Response, DataError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });
        tracing::debug!(table = %table, status = status.as_u16(), %message, "Request rejected");

        Err(DataError::Status {
            table,
            status: status.as_u16(),
            message,
        })
    }
}

/// Pulls a human-readable message out of an error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error", "hint"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl DataService for RestClient {
    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Value>, DataError> {
        let request = self
            .http
            .get(self.table_url(table))
            .query(&[("select", "*")])
            .query(&filter.to_query_pairs());

        let response = self.authorized(request).send().await?;
        let response = Self::check(table, response).await?;
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| DataError::Decode(e.to_string()))
    }

    async fn insert(&self, table: Table, record: Value) -> Result<Vec<Value>, DataError> {
        let request = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&record);

        let response = self.authorized(request).send().await?;
        let response = Self::check(table, response).await?;

        // an empty body means the row was stored but not returned
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(rows)) => Ok(rows),
            Ok(row @ Value::Object(_)) => Ok(vec![row]),
            Ok(other) => Err(DataError::Decode(format!("unexpected insert response: {}", other))),
            Err(e) => Err(DataError::Decode(e.to_string())),
        }
    }

    async fn update(
        &self,
        table: Table,
        filter: &Filter,
        changes: Value,
    ) -> Result<(), DataError> {
        let request = self
            .http
            .patch(self.table_url(table))
            .query(&filter.to_query_pairs())
            .json(&changes);

        let response = self.authorized(request).send().await?;
        Self::check(table, response).await?;
        Ok(())
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), DataError> {
        let request = self
            .http
            .delete(self.table_url(table))
            .query(&filter.to_query_pairs());

        let response = self.authorized(request).send().await?;
        Self::check(table, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> RestClient {
        RestClient::new(
            base_url.to_string(),
            "anon-key".to_string(),
            "token".to_string(),
        )
    }

    #[test]
    fn test_table_url() {
        assert_eq!(
            client("https://abc.supabase.co").table_url(Table::Pantry),
            "https://abc.supabase.co/rest/v1/pantry"
        );
        assert_eq!(
            client("https://abc.supabase.co/").table_url(Table::Recipes),
            "https://abc.supabase.co/rest/v1/recipes"
        );
        assert_eq!(
            client("http://localhost:54321").table_url(Table::Pantry),
            "http://localhost:54321/rest/v1/pantry"
        );
        assert_eq!(
            client("abc.supabase.co").table_url(Table::Pantry),
            "https://abc.supabase.co/rest/v1/pantry"
        );
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"code":"42501","message":"permission denied"}"#).as_deref(),
            Some("permission denied")
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_grant"}"#).as_deref(),
            Some("invalid_grant")
        );
        assert_eq!(error_message("not json"), None);
        assert_eq!(error_message(r#"{"code":1}"#), None);
    }
}
