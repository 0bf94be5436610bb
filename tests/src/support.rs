use std::net::SocketAddr;

use anyhow::Result;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tokio::net::TcpListener;

pub const OPERATOR_EMAIL: &str = "operator@console.test";
pub const OPERATOR_PASSWORD: &str = "correct-horse-battery";

pub fn temp_workspace() -> Result<TempDir> {
    Ok(tempdir()?)
}

async fn fake_login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if email != OPERATOR_EMAIL {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid credentials" })),
        );
    }
    if password != OPERATOR_PASSWORD {
        return (
            StatusCode::OK,
            Json(json!({ "status": false, "message": "Incorrect password" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "data": {
                "status": true,
                "token": "operator-token",
                "userData": { "email": email, "role": "admin" },
            }
        })),
    )
}

/// Starts an in-process authentication service and returns its base URL.
pub async fn spawn_auth_service() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    let app = Router::new().route("/auth/login", post(fake_login));
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            eprintln!("fake auth service stopped: {err}");
        }
    });
    Ok(format!("http://{addr}"))
}
