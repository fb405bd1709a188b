//! Thin synchronous HTTP client against the `hold` daemon, built on `ureq`.
//!
//! `holdctl` runs single-threaded and synchronous against the daemon, so
//! this wraps blocking `ureq` calls rather than pulling in an async
//! runtime.

use std::io::Read;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;
use ureq::Agent;

pub struct Client {
    agent: Agent,
    base: String,
}

impl Client {
    pub fn new(base: impl Into<String>) -> Self {
        let config = Agent::config_builder().http_status_as_error(false).build();
        Self {
            agent: config.into(),
            base: base.into(),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .agent
            .get(self.url(path))
            .call()
            .with_context(|| format!("GET {path} failed"))?;
        self.decode(resp)
    }

    pub fn get_raw(&self, path: &str) -> Result<Vec<u8>> {
        let resp = self
            .agent
            .get(self.url(path))
            .call()
            .with_context(|| format!("GET {path} failed"))?;
        let status = resp.status().as_u16();
        let mut body = Vec::new();
        resp.into_body().into_reader().read_to_end(&mut body)?;
        if status >= 400 {
            bail!(error_message(status, &body));
        }
        Ok(body)
    }

    pub fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self
            .agent
            .post(self.url(path))
            .send_json(body)
            .with_context(|| format!("POST {path} failed"))?;
        self.decode(resp)
    }

    pub fn post_empty(&self, path: &str) -> Result<()> {
        let resp = self
            .agent
            .post(self.url(path))
            .call()
            .with_context(|| format!("POST {path} failed"))?;
        self.check_status(resp)
    }

    /// POSTs with no body, decoding a JSON response (used for `/build`,
    /// whose query string carries all the arguments).
    pub fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .agent
            .post(self.url(path))
            .call()
            .with_context(|| format!("POST {path} failed"))?;
        self.decode(resp)
    }

    pub fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .agent
            .delete(self.url(path))
            .call()
            .with_context(|| format!("DELETE {path} failed"))?;
        self.decode(resp)
    }

    pub fn delete_empty(&self, path: &str) -> Result<()> {
        let resp = self
            .agent
            .delete(self.url(path))
            .call()
            .with_context(|| format!("DELETE {path} failed"))?;
        self.check_status(resp)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn check_status(&self, resp: http::Response<ureq::Body>) -> Result<()> {
        let status = resp.status().as_u16();
        if status >= 400 {
            let mut body = Vec::new();
            resp.into_body().into_reader().read_to_end(&mut body)?;
            bail!(error_message(status, &body));
        }
        Ok(())
    }

    fn decode<T: DeserializeOwned>(&self, resp: http::Response<ureq::Body>) -> Result<T> {
        let status = resp.status().as_u16();
        let mut body = Vec::new();
        resp.into_body().into_reader().read_to_end(&mut body)?;
        if status >= 400 {
            bail!(error_message(status, &body));
        }
        serde_json::from_slice(&body).context("decoding daemon response")
    }
}

fn error_message(status: u16, body: &[u8]) -> String {
    serde_json::from_slice::<hold_api::ApiError>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| format!("daemon returned status {status}"))
}
