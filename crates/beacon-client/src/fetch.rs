//! Typed HTTP request layer.
//!
//! [`HttpFetcher`] issues a single request, serializes an optional JSON body, and decodes a typed
//! JSON response. Failures are classified into the three kinds callers need to tell apart:
//!
//! - [`Error::Transport`]: no response was received (connection failure, timeout).
//! - [`Error::UpstreamStatus`]: a response with a non-2xx status, body attached when present.
//! - [`Error::Decode`]: a 2xx response whose body does not match the expected shape.
//!
//! There are no retries at this layer.

use std::time::Duration;

use reqwest::{
    Client, Method, RequestBuilder, Response, StatusCode,
    header::{ACCEPT, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use crate::error::{Error, Result};

const JSON_ACCEPT: &str = "application/json";

/// Thin wrapper around [`reqwest::Client`] that speaks JSON and classifies failures.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests fail with a transport error after `request_timeout`.
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client })
    }

    /// Creates a fetcher with a custom [`reqwest::Client`].
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Sends a request and decodes the response body into `Res`.
    ///
    /// Returns the status code alongside the decoded body.
    pub async fn fetch<Req, Res>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Req>,
    ) -> Result<(StatusCode, Res)>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let response = send(self.request(method, url, body)).await?;
        let status = response.status();
        Ok((status, decode(response).await?))
    }

    /// Sends a request whose response body is not needed, returning only the status code.
    pub async fn fetch_status<Req>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Req>,
    ) -> Result<StatusCode>
    where
        Req: Serialize + ?Sized,
    {
        let response = send(self.request(method, url, body)).await?;
        Ok(response.status())
    }

    /// GET `url` and decode the response.
    pub async fn get<Res: DeserializeOwned>(&self, url: Url) -> Result<Res> {
        let (_, response) = self.fetch::<(), Res>(Method::GET, url, None).await?;
        Ok(response)
    }

    /// GET `url` and decode the response, allowing `timeout` instead of the client-wide limit.
    ///
    /// For responses too large to download within the default request timeout.
    pub async fn get_with_timeout<Res: DeserializeOwned>(
        &self,
        url: Url,
        timeout: Duration,
    ) -> Result<Res> {
        let request = self.request::<()>(Method::GET, url, None).timeout(timeout);
        decode(send(request).await?).await
    }

    /// POST `body` as JSON to `url`, ignoring the response body.
    pub async fn post<Req: Serialize + ?Sized>(&self, url: Url, body: &Req) -> Result<StatusCode> {
        self.fetch_status(Method::POST, url, Some(body)).await
    }

    fn request<Req: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Req>,
    ) -> RequestBuilder {
        let request = self
            .client
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static(JSON_ACCEPT));
        match body {
            Some(body) => request.json(body),
            None => request,
        }
    }
}

/// Sends an HTTP request and turns non-2xx responses into [`Error::UpstreamStatus`].
async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.ok().filter(|body| !body.is_empty());
        return Err(Error::UpstreamStatus {
            code: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

async fn decode<Res: DeserializeOwned>(response: Response) -> Result<Res> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
