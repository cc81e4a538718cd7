use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::error::AppError;

const RETURN_REPRESENTATION: &str = "return=representation";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document store rejected credentials: {0}")]
    Unauthorized(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document store error ({status}): {body}")]
    Api { status: StatusCode, body: String },

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("document store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not decode document: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Api { status, body } if status == StatusCode::CONFLICT => {
                AppError::BadRequest(body)
            }
            other => AppError::Database(other.to_string()),
        }
    }
}

/// REST client for the document store. Collections are exposed under
/// `/rest/v1/{collection}` and filtered with `column=op.value` query pairs.
pub struct DocumentStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl DocumentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.document_store_url.trim_end_matches('/').to_string(),
            api_key: config.document_store_api_key.clone(),
        }
    }

    fn get_headers(&self, prefer: Option<&'static str>) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(prefer) = prefer {
            headers.insert("Prefer", HeaderValue::from_static(prefer));
        }

        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        prefer: Option<&'static str>,
    ) -> Result<reqwest::Response, StoreError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Document store {} {}", method, url);

        let mut req = self.client.request(method, &url).headers(self.get_headers(prefer)?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Document store error ({}): {}", status, error_text);

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    StoreError::Unauthorized(error_text)
                }
                StatusCode::NOT_FOUND => StoreError::NotFound(error_text),
                _ => StoreError::Api {
                    status,
                    body: error_text,
                },
            });
        }

        Ok(response)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        prefer: Option<&'static str>,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, body, prefer).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Rows of `collection` matching a raw query string such as `org_id=eq.42`.
    pub async fn select<T>(&self, collection: &str, query: &str) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let path = if query.is_empty() {
            format!("/rest/v1/{}", collection)
        } else {
            format!("/rest/v1/{}?{}", collection, query)
        };
        self.request(Method::GET, &path, None, None).await
    }

    pub async fn find_by<T>(
        &self,
        collection: &str,
        column: &str,
        value: &str,
    ) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let rows: Vec<T> = self.select(collection, &eq_filter(column, value)).await?;
        Ok(rows.into_iter().next())
    }

    /// First row whose JSON `column` contains `fragment`.
    pub async fn find_containing<T>(
        &self,
        collection: &str,
        column: &str,
        fragment: &Value,
    ) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let query = format!(
            "{}=cs.{}&limit=1",
            column,
            urlencoding::encode(&fragment.to_string())
        );
        let rows: Vec<T> = self.select(collection, &query).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert<D, T>(&self, collection: &str, document: &D) -> Result<T, StoreError>
    where
        D: Serialize,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(document)?;
        let rows: Vec<T> = self
            .request(
                Method::POST,
                &format!("/rest/v1/{}", collection),
                Some(body),
                Some(RETURN_REPRESENTATION),
            )
            .await?;

        rows.into_iter().next().ok_or_else(|| StoreError::Api {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: format!("insert into {} returned no rows", collection),
        })
    }

    /// Applies `patch` to the matching rows and returns the first updated row.
    pub async fn update_by<T>(
        &self,
        collection: &str,
        column: &str,
        value: &str,
        patch: Value,
    ) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        self.update_where(collection, &[eq_filter(column, value)], patch).await
    }

    /// Like `update_by`, but every filter must match. `None` means no row did.
    pub async fn update_where<T>(
        &self,
        collection: &str,
        filters: &[String],
        patch: Value,
    ) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/{}?{}", collection, filters.join("&"));
        let rows: Vec<T> = self
            .request(Method::PATCH, &path, Some(patch), Some(RETURN_REPRESENTATION))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Deletes the matching rows and returns how many were removed.
    pub async fn delete_by(
        &self,
        collection: &str,
        column: &str,
        value: &str,
    ) -> Result<usize, StoreError> {
        let path = format!("/rest/v1/{}?{}", collection, eq_filter(column, value));
        let rows: Vec<Value> = self
            .request(Method::DELETE, &path, None, Some(RETURN_REPRESENTATION))
            .await?;
        Ok(rows.len())
    }

    pub async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let response = self
            .send(
                Method::HEAD,
                &format!("/rest/v1/{}", collection),
                None,
                Some("count=exact"),
            )
            .await?;

        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        parse_content_range_total(range).ok_or_else(|| StoreError::Api {
            status: response.status(),
            body: format!("missing count in content-range '{}'", range),
        })
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

pub fn eq_filter(column: &str, value: &str) -> String {
    format!("{}=eq.{}", column, urlencoding::encode(value))
}

pub fn is_null_filter(column: &str) -> String {
    format!("{}=is.null", column)
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
fn parse_content_range_total(range: &str) -> Option<usize> {
    range.rsplit_once('/')?.1.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/*"), None);
        assert_eq!(parse_content_range_total(""), None);
    }

    #[test]
    fn test_eq_filter_encodes_value() {
        assert_eq!(eq_filter("login", "a b&c"), "login=eq.a%20b%26c");
    }
}
