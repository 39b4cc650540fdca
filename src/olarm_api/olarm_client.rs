use crate::olarm_api::models::area::{AreaRef, AreaSnapshot};
use crate::olarm_api::models::device::Device;
use crate::olarm_api::models::request::actions_request::{ActionsRequest, AreaAction, PgmCommand};
use crate::olarm_api::models::response::devices_response::DevicesResponse;
use anyhow::Context;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

const API_BASE: &str = "https://apiv4.olarm.co/api/v4";
const PAGE_LENGTH: i64 = 50;

#[derive(Clone)]
pub struct OlarmClient {
    client: reqwest::Client,
    base_url: String,
}

impl OlarmClient {
    /// `timeout` bounds every request, so a hung call can't hold the area
    /// state locked for longer than that.
    pub fn new(api_token: &str, timeout: Duration) -> anyhow::Result<Self> {
        Self::with_base_url(api_token, API_BASE, timeout)
    }

    pub fn with_base_url(api_token: &str, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_token))
                .context("API token is not a valid header value")?,
        );

        Ok(Self {
            client: reqwest::Client::builder()
                .default_headers(headers)
                .timeout(timeout)
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_devices_page(&self, page: i64) -> anyhow::Result<DevicesResponse> {
        let url = format!("{}/devices", self.base_url);
        let response = self
            .client
            .get(url)
            .query(&[("page", page), ("pageLength", PAGE_LENGTH)])
            .send()
            .await?
            .error_for_status()?;
        let contents = response.text().await?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Unable to deserialize response. Body was: \"{}\"", contents))
    }

    async fn get_devices(&self) -> anyhow::Result<Vec<Device>> {
        let mut page = 1;
        let mut devices = Vec::new();
        loop {
            let response = self.get_devices_page(page).await?;
            trace!("Devices page {} of {}", page, response.page_count);
            devices.extend(response.data);
            if page >= response.page_count {
                return Ok(devices);
            }
            page += 1;
        }
    }

    async fn send_action(&self, device_id: &str, payload: ActionsRequest) -> anyhow::Result<()> {
        let url = format!("{}/devices/{}/actions", self.base_url, device_id);
        debug!("POST {} {:?}", url, payload);
        let response = self
            .client
            .request(Method::POST, url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        trace!("Action response: {}", response.status());
        Ok(())
    }
}

impl OlarmApiTrait for OlarmClient {
    async fn get_areas(&self) -> anyhow::Result<Vec<AreaSnapshot>> {
        let devices = self.get_devices().await?;
        Ok(devices
            .iter()
            .flat_map(|device| device.area_snapshots())
            .collect())
    }

    async fn set_area(&self, area: &AreaRef, action: AreaAction) -> anyhow::Result<()> {
        self.send_action(&area.device_id, ActionsRequest::new(action, area.area_number))
            .await
            .with_context(|| format!("Failed to send {:?} to area {}", action, area.area_name))
    }

    async fn set_pgm(&self, area: &AreaRef, channel: u32, command: PgmCommand) -> anyhow::Result<()> {
        self.send_action(&area.device_id, ActionsRequest::new(command, channel))
            .await
            .with_context(|| format!("Failed to send {:?} to PGM {}", command, channel))
    }
}

/// The slice of the Olarm API this bridge talks to.
pub trait OlarmApiTrait {
    fn get_areas(&self) -> impl Future<Output = anyhow::Result<Vec<AreaSnapshot>>> + Send;
    fn set_area(
        &self,
        area: &AreaRef,
        action: AreaAction,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn set_pgm(
        &self,
        area: &AreaRef,
        channel: u32,
        command: PgmCommand,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

// Implement OlarmApiTrait for Arc<T> where T: OlarmApiTrait
impl<T> OlarmApiTrait for Arc<T>
where
    T: OlarmApiTrait + Send + Sync,
{
    async fn get_areas(&self) -> anyhow::Result<Vec<AreaSnapshot>> {
        self.as_ref().get_areas().await
    }

    async fn set_area(&self, area: &AreaRef, action: AreaAction) -> anyhow::Result<()> {
        self.as_ref().set_area(area, action).await
    }

    async fn set_pgm(&self, area: &AreaRef, channel: u32, command: PgmCommand) -> anyhow::Result<()> {
        self.as_ref().set_pgm(area, channel, command).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::olarm_api::models::area::AreaState;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn device(id: &str, label: &str, area: &str) -> serde_json::Value {
        json!({
            "deviceId": id,
            "deviceName": id,
            "deviceTimestamp": 100000,
            "deviceState": { "areas": [area], "zones": ["c"], "zonesStamp": [90000] },
            "deviceProfile": { "areasLimit": 1, "areasLabels": [label] }
        })
    }

    fn page(page: i64, page_count: i64, data: Vec<serde_json::Value>) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "page": page,
            "pageLength": PAGE_LENGTH,
            "pageCount": page_count,
            "data": data
        }))
    }

    #[tokio::test]
    async fn test_get_areas_reads_every_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/devices"))
            .and(query_param("page", "1"))
            .and(header("authorization", "Bearer token"))
            .respond_with(page(1, 2, vec![device("dev-1", "House", "arm")]))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/devices"))
            .and(query_param("page", "2"))
            .respond_with(page(2, 2, vec![device("dev-2", "Cottage", "stay")]))
            .expect(1)
            .mount(&server)
            .await;

        let client = OlarmClient::with_base_url("token", &server.uri(), Duration::from_secs(5)).unwrap();
        let areas = client.get_areas().await.unwrap();

        assert_eq!(areas.len(), 2);
        assert_eq!(areas[0].area_name, "House");
        assert_eq!(areas[1].area_name, "Cottage");
        assert_eq!(areas[1].device_id, "dev-2");
        assert_eq!(areas[1].area_state, AreaState::ArmedStay);
    }

    #[tokio::test]
    async fn test_send_action_posts_command() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/devices/dev-1/actions"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = OlarmClient::with_base_url("token", &server.uri(), Duration::from_secs(5)).unwrap();
        let area = AreaRef {
            device_id: "dev-1".to_string(),
            area_number: 1,
            area_name: "House".to_string(),
        };
        client.set_pgm(&area, 2, PgmCommand::Pulse).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body, json!({"actionCmd": "pgm-pulse", "actionNum": "2"}));
    }

    #[tokio::test]
    async fn test_rejected_action_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = OlarmClient::with_base_url("token", &server.uri(), Duration::from_secs(5)).unwrap();
        let area = AreaRef {
            device_id: "dev-1".to_string(),
            area_number: 1,
            area_name: "House".to_string(),
        };
        assert!(client.set_area(&area, AreaAction::Arm).await.is_err());
    }

    #[tokio::test]
    async fn test_hung_request_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let client =
            OlarmClient::with_base_url("token", &server.uri(), Duration::from_millis(200)).unwrap();
        let area = AreaRef {
            device_id: "dev-1".to_string(),
            area_number: 1,
            area_name: "House".to_string(),
        };
        let started = std::time::Instant::now();
        let err = client.set_pgm(&area, 1, PgmCommand::Pulse).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(10));
        let cause = err.downcast_ref::<reqwest::Error>().unwrap();
        assert!(cause.is_timeout());
    }
}
