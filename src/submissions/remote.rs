use std::time::Duration;

use reqwest::Client;

use crate::error::{Error, Result};

use super::types::SubmissionRow;

/// Client for a remote submissions API exposing the same wire surface as
/// this server. Every call is best-effort; callers fall back to the local
/// repository when it fails.
#[derive(Clone)]
pub struct RemoteClient {
    client: Client,
    base_url: String,
}

fn remote_err(e: reqwest::Error) -> Error {
    Error::RemoteUnreachable(e.to_string())
}

impl RemoteClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(remote_err)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// True when the remote answers its health endpoint with a success status.
    pub async fn health(&self) -> bool {
        match self.client.get(self.url("api/health")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    pub async fn create(&self, row: &SubmissionRow) -> Result<()> {
        self.client
            .post(self.url("api/submissions"))
            .json(row)
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<SubmissionRow>> {
        let rows = self
            .client
            .get(self.url("api/submissions"))
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?
            .json::<Vec<SubmissionRow>>()
            .await
            .map_err(remote_err)?;
        Ok(rows)
    }

    pub async fn clear(&self) -> Result<()> {
        self.client
            .delete(self.url("api/submissions"))
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?;
        Ok(())
    }
}
