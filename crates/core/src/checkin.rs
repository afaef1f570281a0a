//! Typed wrappers for the QR check-in endpoints

use std::borrow::Cow;

use innoverse_domain::{ApiResponse, RequestConfig, ResponseVariant, Result};
use serde_json::json;
use tracing::instrument;
use urlencoding::encode;

use crate::request::ApiClient;

/// Percent-encode a path segment taken from scanned input
fn segment(raw: &str) -> Cow<'_, str> {
    encode(raw.trim())
}

pub fn record_entry_path(qr: &str) -> String {
    format!("/api/recordentry/{}/", segment(qr))
}

pub fn gifts_path(qr: &str) -> String {
    format!("/api/gifts/{}/", segment(qr))
}

pub fn claim_gift_path(gift: &str, qr: &str) -> String {
    format!("/api/gifts/{}/{}/", segment(gift), segment(qr))
}

pub fn participant_info_path(qr: &str) -> String {
    format!("/api/info/{}/", segment(qr))
}

pub fn generic_check_path(page: &str, segment_name: Option<&str>, qr: &str) -> String {
    match segment_name.filter(|s| !s.trim().is_empty()) {
        Some(name) => format!("/api/{}/{}/{}/", segment(page), segment(name), segment(qr)),
        None => format!("/api/{}/{}/", segment(page), segment(qr)),
    }
}

impl ApiClient {
    /// Record gate entry for a scanned code
    #[instrument(skip(self))]
    pub async fn record_entry(&self, qr: &str) -> Result<ApiResponse<ResponseVariant>> {
        let response =
            self.post(&record_entry_path(qr), json!({}), &RequestConfig::uncached()).await?;
        Ok(response.map(ResponseVariant::classify))
    }

    /// Remaining gifts for a participant; always fetched fresh
    #[instrument(skip(self))]
    pub async fn gifts(&self, qr: &str) -> Result<ApiResponse<ResponseVariant>> {
        let response = self.get(&gifts_path(qr), &RequestConfig::uncached()).await?;
        Ok(response.map(ResponseVariant::classify))
    }

    /// Hand out one gift and drop the cached inventory
    #[instrument(skip(self))]
    pub async fn claim_gift(&self, gift: &str, qr: &str) -> Result<ApiResponse<ResponseVariant>> {
        let response =
            self.post(&claim_gift_path(gift, qr), json!({}), &RequestConfig::uncached()).await?;
        self.invalidate(&gifts_path(qr)).await;
        Ok(response.map(ResponseVariant::classify))
    }

    /// Participant or team details
    #[instrument(skip(self))]
    pub async fn participant_info(&self, qr: &str) -> Result<ApiResponse<ResponseVariant>> {
        let response = self.get(&participant_info_path(qr), &RequestConfig::default()).await?;
        Ok(response.map(ResponseVariant::classify))
    }

    /// Access check for a page, optionally scoped to a segment
    #[instrument(skip(self))]
    pub async fn generic_check(
        &self,
        page: &str,
        segment_name: Option<&str>,
        qr: &str,
    ) -> Result<ApiResponse<ResponseVariant>> {
        let response = self
            .get(&generic_check_path(page, segment_name, qr), &RequestConfig::uncached())
            .await?;
        Ok(response.map(ResponseVariant::classify))
    }

    async fn invalidate(&self, endpoint: &str) {
        let key = innoverse_domain::cache_key("GET", &self.config.url_for(endpoint));
        self.cache.remove(&key).await;
    }
}
