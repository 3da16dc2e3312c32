pub mod documents;
pub mod health;
pub mod listen;
pub mod localization;
pub mod locks;
pub mod revisions;

use axum::Router;

use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(documents::routes())
        .merge(revisions::routes())
        .merge(localization::routes())
        .merge(locks::routes())
        .merge(listen::routes())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use kb_core::DocumentService;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::Claims;
    use crate::config::AppConfig;

    fn app() -> (Router, AppConfig) {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let service = DocumentService::in_memory(config.kb_config());
        let state = AppState::new(service, config.clone(), None);
        (build_router(state), config)
    }

    fn token(config: &AppConfig, user: &str) -> String {
        let claims = Claims {
            sub: user.into(),
            exp: 4_000_000_000,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap()
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn new_document(title: &str, slug: &str, locale: &str) -> Value {
        json!({
            "title": title,
            "slug": slug,
            "locale": locale,
            "category": "how_to",
            "revision": { "content": format!("About {title}") },
        })
    }

    #[tokio::test]
    async fn ping_and_health() {
        let (app, _) = app();
        let (status, body) = send(&app, Method::GET, "/v1/ping", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "in-memory");
    }

    #[tokio::test]
    async fn writes_need_a_valid_token() {
        let (app, _) = app();
        let doc = new_document("Foo", "foo", "en-US");

        let (status, _) = send(&app, Method::POST, "/v1/documents", None, Some(doc.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            send(&app, Method::POST, "/v1/documents", Some("garbage"), Some(doc)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rename_flow_leaves_a_redirect() {
        let (app, config) = app();
        let alice = token(&config, "alice");
        let reviewer = token(&config, "rita");

        let (status, doc) = send(
            &app,
            Method::POST,
            "/v1/documents",
            Some(&alice),
            Some(new_document("Foo", "foo", "en-US")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = doc["id"].as_i64().unwrap();

        let (_, revisions) =
            send(&app, Method::GET, &format!("/v1/documents/{id}/revisions"), None, None).await;
        let rev = revisions[0]["id"].as_i64().unwrap();
        assert_eq!(revisions[0]["creator"], "alice");

        let (status, reviewed) = send(
            &app,
            Method::POST,
            &format!("/v1/revisions/{rev}/review"),
            Some(&reviewer),
            Some(json!({ "approve": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reviewed["reviewer"], "rita");

        let (status, renamed) = send(
            &app,
            Method::PATCH,
            &format!("/v1/documents/{id}"),
            Some(&alice),
            Some(json!({ "slug": "bar" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["slug"], "bar");

        let (status, stub) =
            send(&app, Method::GET, "/v1/documents/by-slug/en-US/foo", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stub["isLocalizable"], false);
        let stub_id = stub["id"].as_i64().unwrap();

        let (status, target) = send(
            &app,
            Method::GET,
            &format!("/v1/documents/{stub_id}/redirect-target"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(target["id"].as_i64(), Some(id));
    }

    #[tokio::test]
    async fn core_errors_map_to_statuses() {
        let (app, config) = app();
        let alice = token(&config, "alice");

        let (_, parent) = send(
            &app,
            Method::POST,
            "/v1/documents",
            Some(&alice),
            Some(new_document("Foo", "foo", "en-US")),
        )
        .await;
        let parent_id = parent["id"].as_i64().unwrap();
        let (_, other) = send(
            &app,
            Method::POST,
            "/v1/documents",
            Some(&alice),
            Some(new_document("Other", "other", "en-US")),
        )
        .await;
        let (_, other_revisions) = send(
            &app,
            Method::GET,
            &format!("/v1/documents/{}/revisions", other["id"]),
            None,
            None,
        )
        .await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/documents",
            Some(&alice),
            Some(new_document("Foo", "foo", "en-US")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["type"], "conflict");

        let mut localizable_de = new_document("Hallo", "hallo", "de");
        localizable_de["isLocalizable"] = json!(true);
        let (status, _) =
            send(&app, Method::POST, "/v1/documents", Some(&alice), Some(localizable_de)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/documents",
            Some(&alice),
            Some(json!({
                "title": "Foo (de)",
                "slug": "foo",
                "locale": "de",
                "parentId": parent_id,
                "revision": { "content": "Hallo", "basedOnId": other_revisions[0]["id"] },
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "badBasedOn");
        // The origin has only an unreviewed draft, which is still the best suggestion.
        assert!(body["error"]["suggestedBasedOn"].is_i64());

        let (status, _) = send(&app, Method::GET, "/v1/documents/999", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lock_claims_respect_the_holder() {
        let (app, config) = app();
        let alice = token(&config, "alice");
        let bob = token(&config, "bob");

        let (_, doc) = send(
            &app,
            Method::POST,
            "/v1/documents",
            Some(&alice),
            Some(new_document("Foo", "foo", "en-US")),
        )
        .await;
        let uri = format!("/v1/documents/{}/lock", doc["id"]);

        let (_, status) = send(&app, Method::POST, &uri, Some(&alice), None).await;
        assert_eq!(status, json!({ "status": "acquired" }));
        let (_, status) = send(&app, Method::POST, &uri, Some(&bob), None).await;
        assert_eq!(status, json!({ "status": "heldBy", "holder": "alice" }));

        send(&app, Method::PUT, &uri, Some(&bob), None).await;
        let (_, released) = send(&app, Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(released["released"], false);
        let (_, holder) = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(holder["holder"], "bob");
    }
}
