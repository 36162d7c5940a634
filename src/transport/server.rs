//! HTTP Peer Server
//!
//! Serves this process's cache groups to peers. A peer request names a
//! group and a key; the handler runs the same lookup path a local caller
//! would, so a remote fetch benefits from both cache tiers and the
//! single-flight funnel of the owning node.

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tracing::{debug, warn};

use crate::error::Error;
use crate::group::get_group;
use crate::peers::{Request, Response};
use crate::transport::client::PEER_ENDPOINT;

/// Router serving the peer protocol.
pub fn router() -> Router {
    Router::new().route(PEER_ENDPOINT, post(handle_peer_get))
}

/// Serve the peer protocol on an already-bound listener until the task
/// is cancelled or the listener fails.
pub async fn serve(listener: tokio::net::TcpListener) -> crate::error::Result<()> {
    axum::serve(listener, router()).await?;
    Ok(())
}

async fn handle_peer_get(
    Json(request): Json<Request>,
) -> Result<Json<Response>, (StatusCode, String)> {
    debug!(group = %request.group, key = %request.key, "peer request received");

    if request.key.is_empty() {
        return Err((StatusCode::BAD_REQUEST, Error::EmptyKey.to_string()));
    }

    let Some(group) = get_group(&request.group) else {
        let err = Error::GroupNotFound {
            name: request.group.clone(),
        };
        return Err((StatusCode::NOT_FOUND, err.to_string()));
    };

    match group.get(&request.key).await {
        Ok(value) => Ok(Json(Response {
            value: value.to_vec(),
        })),
        Err(err) => {
            warn!(group = %request.group, key = %request.key, error = %err, "peer request failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::group::Group;
    use crate::peers::GetterFn;

    #[tokio::test]
    async fn test_unknown_group_is_not_found() {
        let request = Request {
            group: "no-such-group".into(),
            key: "k".into(),
        };
        let err = handle_peer_get(Json(request))
            .await
            .expect_err("unknown group must fail");
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_key_is_bad_request() {
        let request = Request {
            group: "any".into(),
            key: String::new(),
        };
        let err = handle_peer_get(Json(request))
            .await
            .expect_err("empty key must fail");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_served_group_returns_value() {
        let _ = Group::new(
            "t-server-local",
            1024,
            Arc::new(GetterFn(|key: &str| Ok(format!("srv-{key}").into_bytes()))),
        );

        let request = Request {
            group: "t-server-local".into(),
            key: "alpha".into(),
        };
        let Json(response) = handle_peer_get(Json(request))
            .await
            .expect("lookup should succeed");
        assert_eq!(response.value, b"srv-alpha");
    }

    #[tokio::test]
    async fn test_failing_loader_maps_to_server_error() {
        let _ = Group::new(
            "t-server-failing",
            1024,
            Arc::new(GetterFn(|key: &str| {
                Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{key} missing"),
                )))
            })),
        );

        let request = Request {
            group: "t-server-failing".into(),
            key: "k".into(),
        };
        let err = handle_peer_get(Json(request))
            .await
            .expect_err("loader failure must surface");
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
