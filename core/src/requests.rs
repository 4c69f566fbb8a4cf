//! Stateless request builder and response parser for the DaData API.
//!
//! # Design
//! `RequestFactory` holds credentials and host configuration and carries no
//! mutable state between calls. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`. `DaDataClient` glues the two together over a
//! `Transport`, but callers with their own HTTP stack can use this directly.

use std::net::IpAddr;

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::{ClientConfig, Credentials};
use crate::decode::{decode, require_field};
use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{CleanKind, FindKind, SuggestKind, SuggestOptions, Suggestion};

const JSON: &str = "application/json";

#[derive(Debug, Clone)]
pub struct RequestFactory {
    credentials: Credentials,
    config: ClientConfig,
}

impl RequestFactory {
    pub fn new(credentials: Credentials, config: ClientConfig) -> Self {
        Self { credentials, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// POST `/clean/{kind}` with the values as a JSON array.
    pub fn build_clean(&self, kind: CleanKind, values: &[Value]) -> Result<HttpRequest> {
        let url = format!("{}/clean/{}", self.config.clean_url, kind.as_str());
        self.post(url, values)
    }

    /// POST `/clean` with a `{structure, data}` body.
    pub fn build_clean_structure(&self, structure: &[&str], data: &[Vec<Value>]) -> Result<HttpRequest> {
        let url = format!("{}/clean", self.config.clean_url);
        self.post(url, &json!({ "structure": structure, "data": data }))
    }

    pub fn build_suggest(&self, kind: SuggestKind, query: &str, options: &SuggestOptions) -> Result<HttpRequest> {
        let url = format!("{}/suggest/{}", self.config.suggestions_url, kind.as_str());
        self.post(url, &with_query(query, options))
    }

    pub fn build_find_by_id(&self, kind: FindKind, query: &str, options: &SuggestOptions) -> Result<HttpRequest> {
        let url = format!("{}/findById/{}", self.config.suggestions_url, kind.as_str());
        self.post(url, &with_query(query, options))
    }

    /// GET `/detectAddressByIp`. Without `ip` the API uses the caller's
    /// own address.
    pub fn build_detect_address_by_ip(&self, ip: Option<IpAddr>) -> HttpRequest {
        let mut url = format!("{}/detectAddressByIp", self.config.suggestions_url);
        if let Some(ip) = ip {
            url.push_str(&format!("?ip={ip}"));
        }
        self.get(url)
    }

    pub fn build_balance(&self) -> HttpRequest {
        self.get(format!("{}/profile/balance", self.config.clean_url))
    }

    /// Response records of a cleansing call, in request order.
    pub fn parse_clean(&self, response: &HttpResponse) -> Result<Vec<Value>> {
        match decode(response)? {
            Value::Array(records) => Ok(records),
            _ => Err(Error::unexpected_answer(response.status)),
        }
    }

    pub fn parse_suggestions(&self, response: &HttpResponse) -> Result<Vec<Suggestion>> {
        let suggestions = require_field(decode(response)?, "suggestions", response.status)?;
        if !suggestions.is_array() {
            return Err(Error::unexpected_answer(response.status));
        }
        serde_json::from_value(suggestions).map_err(|e| Error::Decode {
            message: e.to_string(),
        })
    }

    /// `location` must be present; JSON `null` means the address is unknown.
    pub fn parse_location(&self, response: &HttpResponse) -> Result<Option<Suggestion>> {
        match require_field(decode(response)?, "location", response.status)? {
            Value::Null => Ok(None),
            location => serde_json::from_value(location)
                .map(Some)
                .map_err(|e| Error::Decode {
                    message: e.to_string(),
                }),
        }
    }

    pub fn parse_balance(&self, response: &HttpResponse) -> Result<f64> {
        require_field(decode(response)?, "balance", response.status)?
            .as_f64()
            .ok_or_else(|| Error::unexpected_answer(response.status))
    }

    /// Decoded envelope with no shape check.
    pub fn parse_raw(&self, response: &HttpResponse) -> Result<Value> {
        decode(response)
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Content-Type".to_string(), JSON.to_string()),
            ("Accept".to_string(), JSON.to_string()),
            ("Authorization".to_string(), format!("Token {}", self.credentials.token())),
        ];
        if let Some(secret) = self.credentials.secret() {
            headers.push(("X-Secret".to_string(), secret.to_string()));
        }
        headers.push(("User-Agent".to_string(), self.config.user_agent.clone()));
        headers
    }

    fn post<T: Serialize + ?Sized>(&self, url: String, body: &T) -> Result<HttpRequest> {
        let body = serde_json::to_string(body).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url,
            headers: self.headers(),
            body: Some(body),
        })
    }

    fn get(&self, url: String) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: self.headers(),
            body: None,
        }
    }
}

/// Options merged with `{query}`; the query wins over an option of the same name.
fn with_query(query: &str, options: &SuggestOptions) -> Value {
    let mut body = options.clone();
    body.insert("query".to_string(), Value::String(query.to_string()));
    Value::Object(body)
}
