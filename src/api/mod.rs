//! Typed client for the delivery API.
//!
//! Every command talks to the server through this client; it owns the base
//! URL, the bearer token and the `{"error": ...}` envelope handling so the
//! command handlers only deal in domain types.

pub mod error;

pub use error::ApiError;

use crate::models::{
    CreateOrderRequest, CreateUserRequest, LoginRequest, LoginResponse, Order, OrderStatus, Role,
    ServiceType, UpdateUserRequest, User,
};
use anyhow::{Context, Result};
use reqwest::{multipart, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Client for one API host, carrying the session token when present.
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Build a client against `base_url`, attaching `token` as a bearer
    /// header on every request when given.
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = token {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", token)
                    .parse()
                    .context("Invalid token format")?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ApiError::from_response(response).await);
        }
        response.json().await.map_err(ApiError::from)
    }

    async fn check(response: reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ApiError::from_response(response).await);
        }
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self.client.get(self.url(path)).query(query).send().await?;
        Self::decode(response).await
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::check(response).await
    }

    async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        let response = self.client.post(self.url(path)).send().await?;
        Self::check(response).await
    }

    async fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let response = self.client.put(self.url(path)).json(body).send().await?;
        Self::check(response).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = self.client.delete(self.url(path)).send().await?;
        Self::check(response).await
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    /// Exchange credentials for a token and the signed-in user.
    ///
    /// A 401 here means bad credentials, not an expired session, so the
    /// server's own message is surfaced instead of the sign-in hint.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }
        response.json().await.map_err(ApiError::from)
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, ApiError> {
        self.get_with_query("/orders", &filter.to_query()).await
    }

    pub async fn get_order(&self, id: i64) -> Result<Order, ApiError> {
        self.get(&format!("/orders/{}", id)).await
    }

    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<(), ApiError> {
        self.post("/orders", request).await
    }

    pub async fn assign_courier(&self, order_id: i64, courier_id: i64) -> Result<(), ApiError> {
        self.post(
            &format!("/orders/{}/assign", order_id),
            &AssignRequest {
                assigned_to: courier_id,
            },
        )
        .await
    }

    pub async fn update_status(&self, order_id: i64, status: OrderStatus) -> Result<(), ApiError> {
        self.post(
            &format!("/orders/{}/status", order_id),
            &StatusRequest { status },
        )
        .await
    }

    /// Courier accepts an assigned order; the server moves it to
    /// `in_delivery` and checks the caller is the assignee.
    pub async fn receive_order(&self, order_id: i64) -> Result<(), ApiError> {
        self.post_empty(&format!("/orders/{}/receive", order_id))
            .await
    }

    /// Record a collected amount. The server stamps the payment date.
    pub async fn add_payment(&self, order_id: i64, amount: f64) -> Result<(), ApiError> {
        self.post(
            &format!("/orders/{}/payment", order_id),
            &PaymentRequest { amount },
        )
        .await
    }

    /// Attach a captured signature as a `data:` URL.
    pub async fn upload_signature(
        &self,
        order_id: i64,
        signature_data: String,
    ) -> Result<(), ApiError> {
        self.post(
            &format!("/upload/signature/{}", order_id),
            &SignatureRequest { signature_data },
        )
        .await
    }

    /// Upload a photo as multipart form data: the file under `image`, its
    /// category under `image_type`.
    pub async fn upload_image(
        &self,
        order_id: i64,
        file_name: String,
        mime_type: &str,
        bytes: Vec<u8>,
        image_type: &str,
    ) -> Result<(), ApiError> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_type)?;
        let form = multipart::Form::new()
            .part("image", part)
            .text("image_type", image_type.to_string());
        let response = self
            .client
            .post(self.url(&format!("/upload/order-image/{}", order_id)))
            .multipart(form)
            .send()
            .await?;
        Self::check(response).await
    }

    /// Fetch the raw bytes behind an image path, which the server hands out
    /// either absolute or relative to the API host.
    pub async fn download_image(&self, image_path: &str) -> Result<Vec<u8>, ApiError> {
        let url = if image_path.starts_with("http://") || image_path.starts_with("https://") {
            image_path.to_string()
        } else {
            format!("{}/{}", self.base_url, image_path.trim_start_matches('/'))
        };
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ApiError::from_response(response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>, ApiError> {
        match role {
            Some(role) => {
                self.get_with_query("/users", &[("role", role.as_str().to_string())])
                    .await
            }
            None => self.get("/users").await,
        }
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<(), ApiError> {
        self.post("/users", request).await
    }

    pub async fn update_user(&self, id: i64, request: &UpdateUserRequest) -> Result<(), ApiError> {
        self.put(&format!("/users/{}", id), request).await
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/users/{}", id)).await
    }
}

/// Server-side filters for `GET /orders`. Empty fields are left off the
/// query string entirely.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub search: Option<String>,
    pub service_type: Option<ServiceType>,
    pub status: Option<OrderStatus>,
    pub courier_id: Option<i64>,
    pub assigned_to: Option<i64>,
}

impl OrderFilter {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = &self.search {
            if !search.trim().is_empty() {
                pairs.push(("search", search.clone()));
            }
        }
        if let Some(service_type) = self.service_type {
            pairs.push(("service_type", service_type.as_str().to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(courier_id) = self.courier_id {
            pairs.push(("courier_id", courier_id.to_string()));
        }
        if let Some(assigned_to) = self.assigned_to {
            pairs.push(("assigned_to", assigned_to.to_string()));
        }
        pairs
    }
}

// Request bodies

#[derive(Serialize)]
struct AssignRequest {
    assigned_to: i64,
}

#[derive(Serialize)]
struct StatusRequest {
    status: OrderStatus,
}

#[derive(Serialize)]
struct PaymentRequest {
    amount: f64,
}

#[derive(Serialize)]
struct SignatureRequest {
    signature_data: String,
}
