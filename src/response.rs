use actix_web::{http::StatusCode, HttpResponse, HttpResponseBuilder};
use serde::{Deserialize, Serialize};

/// Success envelope shared by every endpoint.
///
/// The HTTP status of the rendered response always mirrors `status_code`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, data, message)
    }

    /// Starts a response builder with the envelope's status, for handlers that attach cookies.
    pub fn builder(&self) -> HttpResponseBuilder {
        HttpResponse::build(self.status())
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK)
    }

    pub fn into_response(self) -> HttpResponse {
        self.builder().json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use serde_json::json;

    #[actix_rt::test]
    async fn test_envelope_mirrors_status() {
        let response = ApiResponse::created(json!({ "id": 1 }), "task created successfully")
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["statusCode"], 201);
        assert_eq!(json["data"]["id"], 1);
        assert_eq!(json["message"], "task created successfully");
    }

    #[actix_rt::test]
    async fn test_null_data_is_serialized() {
        let response = ApiResponse::ok(Option::<u8>::None, "nothing in window").into_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["data"].is_null());
        assert!(json.get("data").is_some());
    }
}
