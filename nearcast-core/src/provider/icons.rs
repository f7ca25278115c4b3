use async_trait::async_trait;
use reqwest::Client;

/// Fallback condition icon when the response has no weather entry.
pub const DEFAULT_ICON: &str = "03d";

/// `<base>/<code>@2x.png`
pub fn icon_url(base: &str, code: &str) -> String {
    format!("{}/{}@2x.png", base.trim_end_matches('/'), code)
}

/// Fetches condition icon images.
#[async_trait]
pub trait IconLoader: Send + Sync {
    async fn load(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpIconLoader {
    http: Client,
}

impl HttpIconLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IconLoader for HttpIconLoader {
    async fn load(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let bytes = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(bytes.to_vec())
    }
}
