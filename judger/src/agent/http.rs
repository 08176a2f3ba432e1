use reqwest::{
    blocking::{Client, RequestBuilder},
    header::{HeaderMap, HeaderValue},
    Url,
};

use crate::error::ClientError;

pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Blocking client; requests are made from judging threads.
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: &str, secret_key: &str) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTH_TOKEN_HEADER,
            HeaderValue::from_str(secret_key)
                .map_err(|e| ClientError::InternalError(anyhow::anyhow!("Bad secret key: {}", e)))?,
        );
        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        Url::parse(&format!("{}{}", self.base_url, path.trim_start_matches('/'))).map_err(|e| {
            ClientError::InternalError(anyhow::anyhow!("Bad url for {}: {}", path, e))
        })
    }

    pub fn get(&self, path: &str) -> Result<RequestBuilder, ClientError> {
        Ok(self.client.get(self.url(path)?))
    }

    pub fn post(&self, path: &str) -> Result<RequestBuilder, ClientError> {
        Ok(self.client.post(self.url(path)?))
    }
}

fn normalize_base_url(base_url: &str) -> String {
    format!("{}/", base_url.trim_end_matches('/'))
}
