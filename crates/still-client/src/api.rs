use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use still_types::api::{
    ApiResponse, CreateMoodRequest, DelayUrgeRequest, DeletedResponse, HealthStatus,
    MoodResponse, MoodsResponse, RegisterDeviceRequest, UpdateMoodRequest,
    UpdateUrgeStatusRequest, UrgeStats, UrgesResponse,
};
use still_types::models::{EmotionMapData, Mood, Urge, User};

use crate::error::ClientError;

const API_PREFIX: &str = "/api";

/// Typed client for the backend. Cheap to clone; clones share one
/// connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}{}", self.base_url, API_PREFIX, path);
        debug!("{} {}", method, url);
        self.http.request(method, url)
    }

    fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> RequestBuilder {
        self.request(Method::POST, path).json(body)
    }

    /// Send and unwrap the `{success, data}` envelope.
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiResponse<serde_json::Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()));
            warn!("Request failed ({}): {}", status, message);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiResponse<T> = serde_json::from_slice(&body)
            .map_err(|e| ClientError::Decode(format!("invalid response body: {}", e)))?;
        envelope
            .data
            .ok_or_else(|| ClientError::Decode("response carried no data".into()))
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.send(self.request(Method::GET, "/health")).await
    }

    pub async fn register_device(&self, device_id: &str) -> Result<User, ClientError> {
        let body = RegisterDeviceRequest {
            device_id: device_id.to_string(),
        };
        self.send(self.post_json("/users/register", &body)).await
    }

    pub async fn get_user_by_device_id(&self, device_id: &str) -> Result<User, ClientError> {
        let req = self
            .request(Method::GET, "/users")
            .query(&[("deviceId", device_id)]);
        self.send(req).await
    }

    pub async fn delay_urge(&self, req: &DelayUrgeRequest) -> Result<Urge, ClientError> {
        self.send(self.post_json("/urges/delay", req)).await
    }

    pub async fn update_urge_status(
        &self,
        req: &UpdateUrgeStatusRequest,
    ) -> Result<Urge, ClientError> {
        self.send(self.post_json("/urges/update", req)).await
    }

    pub async fn get_urges(&self, user_id: Option<Uuid>) -> Result<Vec<Urge>, ClientError> {
        let req = with_user(self.request(Method::GET, "/urges"), user_id);
        let resp: UrgesResponse = self.send(req).await?;
        Ok(resp.urges)
    }

    pub async fn get_urge_stats(&self, user_id: Option<Uuid>) -> Result<UrgeStats, ClientError> {
        let req = with_user(self.request(Method::GET, "/urges/stats"), user_id);
        self.send(req).await
    }

    pub async fn get_emotion_map(
        &self,
        user_id: Uuid,
        weeks: u32,
    ) -> Result<EmotionMapData, ClientError> {
        let req = self
            .request(Method::GET, "/urges/emotion-map")
            .query(&[("userId", user_id.to_string()), ("weeks", weeks.to_string())]);
        self.send(req).await
    }

    pub async fn create_mood(&self, req: &CreateMoodRequest) -> Result<Mood, ClientError> {
        let resp: MoodResponse = self.send(self.post_json("/moods", req)).await?;
        Ok(resp.mood)
    }

    pub async fn get_user_moods(&self, user_id: Uuid) -> Result<Vec<Mood>, ClientError> {
        let path = format!("/moods/user/{}", user_id);
        let resp: MoodsResponse = self.send(self.request(Method::GET, &path)).await?;
        Ok(resp.moods)
    }

    pub async fn get_mood(&self, mood_id: Uuid) -> Result<Mood, ClientError> {
        let path = format!("/moods/{}", mood_id);
        let resp: MoodResponse = self.send(self.request(Method::GET, &path)).await?;
        Ok(resp.mood)
    }

    pub async fn update_mood(
        &self,
        mood_id: Uuid,
        req: &UpdateMoodRequest,
    ) -> Result<Mood, ClientError> {
        let path = format!("/moods/{}", mood_id);
        let resp: MoodResponse = self
            .send(self.request(Method::PUT, &path).json(req))
            .await?;
        Ok(resp.mood)
    }

    pub async fn delete_mood(&self, mood_id: Uuid) -> Result<DeletedResponse, ClientError> {
        let path = format!("/moods/{}", mood_id);
        self.send(self.request(Method::DELETE, &path)).await
    }
}

fn with_user(req: RequestBuilder, user_id: Option<Uuid>) -> RequestBuilder {
    match user_id {
        Some(id) => req.query(&[("userId", id.to_string())]),
        None => req,
    }
}
