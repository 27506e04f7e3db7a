//! Better leisure API client implementation
//!
//! This module implements the BookingClient trait for the Better
//! (better-admin.org.uk) customer API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use log::{debug, info};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::traits::{BookingClient, ClientError, ClientFactory, Reservation, Session};
use crate::domain::{Credentials, Slot};

/// Better API base URL
pub const DEFAULT_BASE_URL: &str = "https://better-admin.org.uk/api/";

/// Default per-request timeout
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:146.0) Gecko/20100101 Firefox/146.0";
const ACCOUNT_ORIGIN: &str = "https://myaccount.better.org.uk";

/// Configuration for the Better client (the `api` section of the config file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BetterConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for BetterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Better API client
#[derive(Clone)]
pub struct BetterClient {
    client: Client,
    base_url: String,
}

impl BetterClient {
    pub fn new(config: &BetterConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-GB,en;q=0.5"));
        headers.insert(ORIGIN, HeaderValue::from_static(ACCOUNT_ORIGIN));
        headers.insert(REFERER, HeaderValue::from_static("https://myaccount.better.org.uk/"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClientError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_http_client(client, &config.base_url))
    }

    /// Build on an existing reqwest client (connection pool is shared, sessions are not)
    pub fn with_http_client(client: Client, base_url: &str) -> Self {
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn times_path(venue: &str, activity: &str) -> String {
        format!("activities/venue/{}/activity/{}/times", venue, activity)
    }

    fn slots_path(venue: &str, activity: &str) -> String {
        format!("activities/venue/{}/activity/{}/slots", venue, activity)
    }

    /// Send a request and return the JSON body, mapping HTTP failures
    async fn send(&self, request: RequestBuilder) -> Result<Value, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::from_status(status.as_u16(), retry_after, body));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    async fn find_bookable(
        &self,
        session: &Session,
        venue: &str,
        activity: &str,
        slot: &Slot,
    ) -> Result<CartItem, ClientError> {
        let body = self
            .send(
                self.client
                    .get(self.url(&Self::slots_path(venue, activity)))
                    .bearer_auth(&session.token)
                    .query(&[
                        ("date", slot.date().format("%Y-%m-%d").to_string()),
                        ("start_time", slot.start().format("%H:%M").to_string()),
                        ("end_time", slot.end().format("%H:%M").to_string()),
                    ]),
            )
            .await?;

        parse_bookable(&body)?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::SlotUnavailable(format!("no bookable space left for {}", slot)))
    }
}

#[async_trait]
impl BookingClient for BetterClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, ClientError> {
        info!("Authenticating user {}...", credentials.username);
        let body = self
            .send(self.client.post(self.url("auth/customer/login")).json(&json!({
                "username": credentials.username,
                "password": credentials.password(),
            })))
            .await?;

        let token = body["token"]
            .as_str()
            .ok_or_else(|| ClientError::InvalidResponse("login response has no token".to_string()))?;

        let user = self
            .send(self.client.get(self.url("auth/user")).bearer_auth(token))
            .await?;
        let account_id = user["data"]["membership_user"]["id"]
            .as_u64()
            .ok_or_else(|| ClientError::InvalidResponse("user response has no membership id".to_string()))?;

        Ok(Session::new(token).with_account_id(account_id))
    }

    async fn list_slots(
        &self,
        session: &Session,
        venue: &str,
        activity: &str,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, ClientError> {
        let body = self
            .send(
                self.client
                    .get(self.url(&Self::times_path(venue, activity)))
                    .bearer_auth(&session.token)
                    .query(&[("date", date.format("%Y-%m-%d").to_string())]),
            )
            .await?;
        debug!("times response: {}", body);
        parse_times(&body, date)
    }

    async fn reserve(
        &self,
        session: &Session,
        venue: &str,
        activity: &str,
        slots: &[Slot],
    ) -> Result<Reservation, ClientError> {
        let account_id = session
            .account_id
            .ok_or_else(|| ClientError::InvalidResponse("session has no membership id".to_string()))?;

        let mut items = Vec::with_capacity(slots.len());
        for slot in slots {
            items.push(self.find_bookable(session, venue, activity, slot).await?);
        }

        let body = self
            .send(
                self.client
                    .post(self.url("activities/cart/add"))
                    .bearer_auth(&session.token)
                    .json(&cart_request(&items, account_id)),
            )
            .await?;
        parse_cart(&body)
    }

    async fn checkout(&self, session: &Session, reservation: &Reservation) -> Result<String, ClientError> {
        let payments = if reservation.amount_due > 0 {
            self.send(
                self.client
                    .post(self.url("credits/apply"))
                    .bearer_auth(&session.token)
                    .json(&json!({
                        "credits_to_reserve": [{ "amount": reservation.amount_due, "type": "general" }],
                        "cart_source": reservation.source,
                        "selected_user_id": null,
                    })),
            )
            .await?;
            json!([{ "tender_type": "credit", "amount": reservation.amount_due }])
        } else {
            json!([])
        };

        let body = self
            .send(
                self.client
                    .post(self.url("checkout/complete"))
                    .bearer_auth(&session.token)
                    .json(&json!({
                        "completed_waivers": [],
                        "payments": payments,
                        "selected_user_id": null,
                        "source": reservation.source,
                        "terms": [1],
                    })),
            )
            .await?;
        parse_order_id(&body)
    }
}

impl std::fmt::Debug for BetterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BetterClient").field("base_url", &self.base_url).finish()
    }
}

/// Hands out a BetterClient per attempt, sharing one connection pool
#[derive(Debug, Clone)]
pub struct BetterClientFactory {
    client: BetterClient,
}

impl BetterClientFactory {
    pub fn new(config: &BetterConfig) -> Result<Self, ClientError> {
        Ok(Self {
            client: BetterClient::new(config)?,
        })
    }
}

impl ClientFactory for BetterClientFactory {
    fn create(&self, _credentials: &Credentials) -> Result<Arc<dyn BookingClient>, ClientError> {
        Ok(Arc::new(self.client.clone()))
    }
}

/// One bookable slot as the cart API wants it
#[derive(Debug, Clone, PartialEq, Eq)]
struct CartItem {
    id: u64,
    pricing_option_id: u64,
    restriction_ids: Vec<u64>,
    cart_type: String,
}

fn has_space(entry: &Value) -> bool {
    entry["spaces"].as_i64().unwrap_or(0) > 0 && entry["booking"].is_null()
}

fn parse_hhmm(value: &Value, field: &str) -> Result<NaiveTime, ClientError> {
    let raw = value[field]["format_24_hour"]
        .as_str()
        .ok_or_else(|| ClientError::InvalidResponse(format!("time entry has no {}", field)))?;
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| ClientError::InvalidResponse(format!("bad {} time '{}'", field, raw)))
}

/// Parse the `times` response into available slots, ordered by start time
fn parse_times(body: &Value, date: NaiveDate) -> Result<Vec<Slot>, ClientError> {
    let entries = body["data"]
        .as_array()
        .ok_or_else(|| ClientError::InvalidResponse("times response has no data array".to_string()))?;

    let mut slots = Vec::new();
    for entry in entries.iter().filter(|e| has_space(e)) {
        let start = parse_hhmm(entry, "starts_at")?;
        let end = parse_hhmm(entry, "ends_at")?;
        let id = format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"));
        // entries running past midnight cannot be expressed as a same-day slot
        match Slot::new(id, date, start, end) {
            Ok(slot) => slots.push(slot),
            Err(e) => debug!("Skipping time entry on {}: {}", date, e),
        }
    }
    slots.sort_by_key(|s| (s.start(), s.end()));
    Ok(slots)
}

/// Parse the `slots` response into cart items that still have space
fn parse_bookable(body: &Value) -> Result<Vec<CartItem>, ClientError> {
    let entries = body["data"]
        .as_array()
        .ok_or_else(|| ClientError::InvalidResponse("slots response has no data array".to_string()))?;

    entries
        .iter()
        .filter(|e| has_space(e))
        .map(|e| {
            let missing = |field: &str| ClientError::InvalidResponse(format!("slot entry has no {}", field));
            Ok(CartItem {
                id: e["id"].as_u64().ok_or_else(|| missing("id"))?,
                pricing_option_id: e["pricing_option_id"]
                    .as_u64()
                    .ok_or_else(|| missing("pricing_option_id"))?,
                restriction_ids: e["restriction_ids"]
                    .as_array()
                    .map(|ids| ids.iter().filter_map(Value::as_u64).collect())
                    .unwrap_or_default(),
                cart_type: e["cart_type"]
                    .as_str()
                    .ok_or_else(|| missing("cart_type"))?
                    .to_string(),
            })
        })
        .collect()
}

fn cart_request(items: &[CartItem], account_id: u64) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|item| {
            json!({
                "activity_restriction_ids": item.restriction_ids,
                "apply_benefit": true,
                "id": item.id,
                "pricing_option_id": item.pricing_option_id,
                "type": item.cart_type,
            })
        })
        .collect();

    json!({
        "items": items,
        "membership_user_id": account_id,
        "selected_user_id": null,
    })
}

fn parse_cart(body: &Value) -> Result<Reservation, ClientError> {
    let data = &body["data"];
    let id = match &data["id"] {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return Err(ClientError::InvalidResponse("cart response has no id".to_string())),
    };
    let amount_due = data["total"]
        .as_u64()
        .ok_or_else(|| ClientError::InvalidResponse("cart response has no total".to_string()))?;
    let source = data["source"]
        .as_str()
        .ok_or_else(|| ClientError::InvalidResponse("cart response has no source".to_string()))?
        .to_string();

    Ok(Reservation { id, amount_due, source })
}

fn parse_order_id(body: &Value) -> Result<String, ClientError> {
    match &body["complete_order_id"] {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        _ => Err(ClientError::InvalidResponse("checkout response has no order id".to_string())),
    }
}
