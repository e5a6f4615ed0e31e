//! HTTP entry point of the producer path.
//!
//! - `GET|POST /message/send?msg=<text>`: publish `msg` once to the configured
//!   topic and tag. A POST may also carry `msg` as an
//!   `application/x-www-form-urlencoded` body. The body is always `succ`; the real outcome is in the
//!   `x-delivery-outcome` header (`SENT` or `FAILED`).

use std::sync::Arc;

use axum::extract::{Form, Query, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use courier_core::{Envelope, Producer};
use serde::Deserialize;

pub const OUTCOME_HEADER: HeaderName = HeaderName::from_static("x-delivery-outcome");

#[derive(Clone)]
pub struct AppState {
    pub producer: Producer,
    pub topic: Arc<str>,
    pub tag: Arc<str>,
}

#[derive(Debug, Deserialize)]
pub struct SendParams {
    msg: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct OptionalSendParams {
    msg: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/message/send", get(send_from_query).post(send_from_query_or_form))
        .with_state(state)
}

async fn send_from_query(State(state): State<AppState>, Query(params): Query<SendParams>) -> Response {
    publish(&state, params.msg).await
}

/// Query string first, then a form body.
async fn send_from_query_or_form(
    State(state): State<AppState>,
    Query(query): Query<OptionalSendParams>,
    form: Option<Form<OptionalSendParams>>,
) -> Response {
    let msg = query
        .msg
        .or_else(|| form.and_then(|Form(params)| params.msg));
    match msg {
        Some(msg) => publish(&state, msg).await,
        None => (StatusCode::BAD_REQUEST, "missing request parameter 'msg'").into_response(),
    }
}

async fn publish(state: &AppState, msg: String) -> Response {
    let envelope = match Envelope::new(state.topic.as_ref(), msg) {
        Ok(envelope) => envelope.with_tag(state.tag.as_ref()),
        Err(err) => {
            tracing::error!(error = %err, "cannot build envelope for configured topic");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let outcome = state.producer.send(&envelope).await;
    let label = if outcome.is_sent() { "SENT" } else { "FAILED" };

    (
        StatusCode::OK,
        [(OUTCOME_HEADER, HeaderValue::from_static(label))],
        "succ",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use courier_core::impls::InMemoryBroker;
    use courier_core::ports::{Delivery as _, DeliverySource as _};
    use tower::ServiceExt as _;

    use super::*;

    fn state_for(broker: Arc<InMemoryBroker>) -> AppState {
        AppState {
            producer: Producer::new(broker),
            topic: Arc::from("TEST_TOPIC"),
            tag: Arc::from("tag"),
        }
    }

    async fn call(app: Router, method: Method, uri: &str) -> (StatusCode, Option<String>, String) {
        send(app, Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Option<String>, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let outcome = response
            .headers()
            .get(OUTCOME_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, outcome, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn get_publishes_and_answers_succ() {
        let broker = Arc::new(InMemoryBroker::default());
        let app = router(state_for(broker.clone()));

        let (status, outcome, body) = call(app, Method::GET, "/message/send?msg=hello%20there").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "succ");
        assert_eq!(outcome.as_deref(), Some("SENT"));
        assert_eq!(broker.stats().await.published, 1);
    }

    #[tokio::test]
    async fn post_is_accepted_too() {
        let broker = Arc::new(InMemoryBroker::default());
        let app = router(state_for(broker.clone()));

        let (status, outcome, _) = call(app, Method::POST, "/message/send?msg=x").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome.as_deref(), Some("SENT"));
    }

    #[tokio::test]
    async fn post_form_body_is_accepted() {
        let broker = Arc::new(InMemoryBroker::default());
        let app = router(state_for(broker.clone()));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/message/send")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("msg=from+the+form"))
            .unwrap();

        let (status, outcome, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "succ");
        assert_eq!(outcome.as_deref(), Some("SENT"));
        let delivery = broker.receive().await.unwrap();
        assert_eq!(delivery.message().body(), b"from the form");
    }

    #[tokio::test]
    async fn post_without_msg_is_bad_request() {
        let app = router(state_for(Arc::new(InMemoryBroker::default())));

        let (status, outcome, _) = call(app, Method::POST, "/message/send").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn failed_send_still_answers_succ() {
        let broker = Arc::new(InMemoryBroker::default());
        broker.close().await;
        let app = router(state_for(broker));

        let (status, outcome, body) = call(app, Method::GET, "/message/send?msg=lost").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "succ");
        assert_eq!(outcome.as_deref(), Some("FAILED"));
    }

    #[tokio::test]
    async fn missing_msg_is_bad_request() {
        let app = router(state_for(Arc::new(InMemoryBroker::default())));

        let (status, outcome, _) = call(app, Method::GET, "/message/send").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(outcome.is_none());
    }
}
