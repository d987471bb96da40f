//! Remote session API
//!
//! [`SessionApi`] is the set of server calls the tracker makes;
//! [`JellyfinClient`] implements it over HTTP.

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::types::{ItemsResponse, PlaybackReport, RemoteItem, StopReport};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

/// Server calls used during a playback session
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn session_playing(&self, report: &PlaybackReport) -> Result<()>;

    async fn session_progress(&self, report: &PlaybackReport) -> Result<()>;

    async fn session_stop(&self, report: &StopReport) -> Result<()>;

    async fn close_live_stream(&self, live_stream_id: &str) -> Result<()>;

    async fn close_transcode(&self, device_id: &str, play_session_id: &str) -> Result<()>;

    async fn get_item(&self, item_id: &str) -> Result<RemoteItem>;

    /// Episodes around `item_id` within the show, in episode order
    async fn get_adjacent_episodes(&self, show_id: &str, item_id: &str) -> Result<ItemsResponse>;

    async fn delete_item(&self, item_id: &str) -> Result<()>;

    /// Base address used to build artwork URLs
    fn server_address(&self) -> &Url;
}

/// Resolves the API for a descriptor's server id
pub trait ServerPool: Send + Sync {
    fn client(&self, server_id: Option<&str>) -> Result<Arc<dyn SessionApi>>;
}

/// Pool with one default server and optional named servers
#[derive(Clone)]
pub struct SingleServer {
    default: Arc<dyn SessionApi>,
    named: HashMap<String, Arc<dyn SessionApi>>,
}

impl SingleServer {
    pub fn new(api: Arc<dyn SessionApi>) -> Self {
        Self {
            default: api,
            named: HashMap::new(),
        }
    }

    pub fn with_server(mut self, server_id: impl Into<String>, api: Arc<dyn SessionApi>) -> Self {
        self.named.insert(server_id.into(), api);
        self
    }
}

impl ServerPool for SingleServer {
    fn client(&self, server_id: Option<&str>) -> Result<Arc<dyn SessionApi>> {
        match server_id {
            None => Ok(self.default.clone()),
            Some(id) if self.named.is_empty() => {
                debug!(server_id = id, "Using default server");
                Ok(self.default.clone())
            }
            Some(id) => self
                .named
                .get(id)
                .cloned()
                .ok_or_else(|| Error::UnknownServer(id.to_string())),
        }
    }
}

/// HTTP client for a Jellyfin server
pub struct JellyfinClient {
    config: ServerConfig,
    client: Client,
}

impl JellyfinClient {
    pub fn new(mut config: ServerConfig) -> Result<Self> {
        // Url::join drops the last segment of a base without a trailing slash
        if !config.address.path().ends_with('/') {
            let path = format!("{}/", config.address.path());
            config.address.set_path(&path);
        }
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self { config, client })
    }

    fn auth_header(&self) -> String {
        format!(
            r#"MediaBrowser Client="{}", Device="Kodi", DeviceId="{}", Version="{}", Token="{}""#,
            self.config.client_name, self.config.device_id, self.config.version, self.config.token
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.config.address.join(path)?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("X-Emby-Authorization", self.auth_header())
    }

    async fn send(&self, call: &'static str, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();

        debug!(call, status = %status, "Server response");

        if !status.is_success() {
            return Err(Error::HttpStatus {
                call,
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl SessionApi for JellyfinClient {
    #[instrument(skip(self, report), fields(item_id = %report.item_id))]
    async fn session_playing(&self, report: &PlaybackReport) -> Result<()> {
        let url = self.endpoint("Sessions/Playing")?;
        self.send("session_playing", self.request(Method::POST, url).json(report))
            .await?;
        Ok(())
    }

    async fn session_progress(&self, report: &PlaybackReport) -> Result<()> {
        let url = self.endpoint("Sessions/Playing/Progress")?;
        self.send("session_progress", self.request(Method::POST, url).json(report))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, report), fields(item_id = %report.item_id))]
    async fn session_stop(&self, report: &StopReport) -> Result<()> {
        let url = self.endpoint("Sessions/Playing/Stopped")?;
        self.send("session_stop", self.request(Method::POST, url).json(report))
            .await?;
        Ok(())
    }

    async fn close_live_stream(&self, live_stream_id: &str) -> Result<()> {
        let mut url = self.endpoint("LiveStreams/Close")?;
        url.query_pairs_mut().append_pair("liveStreamId", live_stream_id);
        self.send("close_live_stream", self.request(Method::POST, url))
            .await?;
        Ok(())
    }

    async fn close_transcode(&self, device_id: &str, play_session_id: &str) -> Result<()> {
        let mut url = self.endpoint("Videos/ActiveEncodings")?;
        url.query_pairs_mut()
            .append_pair("deviceId", device_id)
            .append_pair("playSessionId", play_session_id);
        self.send("close_transcode", self.request(Method::DELETE, url))
            .await?;
        Ok(())
    }

    async fn get_item(&self, item_id: &str) -> Result<RemoteItem> {
        let url = self.endpoint(&format!("Users/{}/Items/{}", self.config.user_id, item_id))?;
        let response = self.send("get_item", self.request(Method::GET, url)).await?;
        Ok(response.json().await?)
    }

    async fn get_adjacent_episodes(&self, show_id: &str, item_id: &str) -> Result<ItemsResponse> {
        let mut url = self.endpoint(&format!("Shows/{}/Episodes", show_id))?;
        url.query_pairs_mut()
            .append_pair("UserId", &self.config.user_id)
            .append_pair("AdjacentTo", item_id)
            .append_pair("Fields", "Overview,Path");
        let response = self
            .send("get_adjacent_episodes", self.request(Method::GET, url))
            .await?;
        Ok(response.json().await?)
    }

    async fn delete_item(&self, item_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("Items/{}", item_id))?;
        self.send("delete_item", self.request(Method::DELETE, url))
            .await?;
        Ok(())
    }

    fn server_address(&self) -> &Url {
        &self.config.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> JellyfinClient {
        let mut config = ServerConfig::new(
            Url::parse("http://jellyfin.local:8096/").unwrap(),
            "token-1",
            "user-1",
        );
        config.device_id = "dev-1".into();
        JellyfinClient::new(config).unwrap()
    }

    #[test]
    fn test_auth_header() {
        let header = client().auth_header();
        assert!(header.starts_with("MediaBrowser Client=\"Jellybridge\""));
        assert!(header.contains("DeviceId=\"dev-1\""));
        assert!(header.contains("Token=\"token-1\""));
    }

    #[test]
    fn test_endpoint_join() {
        let url = client().endpoint("Sessions/Playing/Progress").unwrap();
        assert_eq!(url.as_str(), "http://jellyfin.local:8096/Sessions/Playing/Progress");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = ServerConfig::new(
            Url::parse("https://media.example.com/jellyfin").unwrap(),
            "t",
            "u",
        );
        let client = JellyfinClient::new(config).unwrap();
        let url = client.endpoint("Items/abc").unwrap();
        assert_eq!(url.as_str(), "https://media.example.com/jellyfin/Items/abc");
    }

    #[test]
    fn test_single_server_resolution() {
        let api: Arc<dyn SessionApi> = Arc::new(client());
        let pool = SingleServer::new(api.clone());
        assert!(pool.client(None).is_ok());
        assert!(pool.client(Some("any")).is_ok());

        let pool = pool.with_server("srv-a", api);
        assert!(pool.client(Some("srv-a")).is_ok());
        assert!(matches!(
            pool.client(Some("srv-b")),
            Err(Error::UnknownServer(_))
        ));
    }
}
