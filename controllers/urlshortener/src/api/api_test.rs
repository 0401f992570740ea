//! Router tests: redirect handler, authentication and Shortlink CRUD

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use crds::Shortlink;
    use serde_json::{Value, json};
    use shortlink_client::{MockOperation, MockStore, OwnerAuthorizer, ShortlinkClient, UserShortlinkClient};
    use tower::ServiceExt;

    use crate::api::error::BEARER_ADVICE;
    use crate::api::handlers::ShortlinkView;
    use crate::api::redirect::CACHE_CONTROL;
    use crate::api::templates::Pages;
    use crate::api::{ApiState, router};
    use crate::test_utils::*;

    struct TestApi {
        store: MockStore<Shortlink>,
        metrics: Arc<RecordingMetrics>,
        router: Router,
    }

    fn test_api() -> TestApi {
        let store = MockStore::new(TEST_NAMESPACE);
        let metrics = Arc::new(RecordingMetrics::default());
        let public = ShortlinkClient::new(Arc::new(store.clone()));
        let state = ApiState {
            shortlinks: UserShortlinkClient::new(public.clone(), OwnerAuthorizer),
            public,
            identity: Arc::new(StaticIdentityProvider::new(&[
                ("alice-token", "alice"),
                ("bob-token", "bob"),
                ("mallory-token", "mallory"),
            ])),
            metrics: metrics.clone(),
            pages: Arc::new(Pages::new().unwrap()),
        };
        TestApi {
            store,
            metrics,
            router: router(state),
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        (status, headers, body)
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    fn api(method: Method, path: &str, token: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn wait_for_count(store: &MockStore<Shortlink>, name: &str, expected: u64) -> u64 {
        let mut count = 0;
        for _ in 0..100 {
            count = store.object(name).map_or(0, |link| link.invocation_count());
            if count >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        count
    }

    #[tokio::test]
    async fn test_redirect_to_normalized_target_and_count() {
        let env = test_api();
        env.store.insert(create_test_shortlink("home", "alice", "example.org", 307));

        let (status, headers, _) = send(&env.router, get("/home")).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(headers[header::LOCATION], "http://example.org$request_uri");
        assert_eq!(headers[header::CACHE_CONTROL], CACHE_CONTROL);
        assert_eq!(wait_for_count(&env.store, "home", 1).await, 1);
        assert_eq!(env.metrics.redirects(), [307]);
    }

    #[tokio::test]
    async fn test_sequential_redirects_increase_count() {
        let env = test_api();
        env.store.insert(create_test_shortlink("home", "alice", "https://example.org", 308));

        for expected in 1..=3 {
            let (status, headers, _) = send(&env.router, get("/home")).await;
            assert_eq!(status, StatusCode::PERMANENT_REDIRECT);
            assert_eq!(headers[header::LOCATION], "https://example.org");
            assert_eq!(wait_for_count(&env.store, "home", expected).await, expected);
        }
    }

    #[tokio::test]
    async fn test_permanent_redirect_has_no_page() {
        let env = test_api();
        env.store.insert(create_test_shortlink("docs", "alice", "https://docs.rs", 308));

        let (status, headers, body) = send(&env.router, get("/docs")).await;
        assert_eq!(status, StatusCode::PERMANENT_REDIRECT);
        assert_eq!(headers[header::LOCATION], "https://docs.rs");
        assert!(!String::from_utf8(body).unwrap().contains("<html"));
    }

    #[tokio::test]
    async fn test_code_200_renders_delayed_redirect_page() {
        let env = test_api();
        let mut link = create_test_shortlink("slow", "alice", "https://example.org", 200);
        link.spec.redirect_after = 7;
        env.store.insert(link);

        let (status, headers, body) = send(&env.router, get("/slow")).await;
        let page = String::from_utf8(body).unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(headers.get(header::LOCATION).is_none());
        assert_eq!(headers[header::CACHE_CONTROL], CACHE_CONTROL);
        assert!(page.contains(r#"content="7; url=https:"#));
        assert!(page.contains(r#"var target = "https://example.org";"#));
        assert!(page.contains("var remaining = 7;"));
        assert_eq!(wait_for_count(&env.store, "slow", 1).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_shortlink_renders_404_page() {
        let env = test_api();
        let (status, _, body) = send(&env.router, get("/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(String::from_utf8(body).unwrap().contains("missing</code>"));
        assert_eq!(env.metrics.redirects(), [404]);
    }

    #[tokio::test]
    async fn test_store_failure_renders_500_page() {
        let env = test_api();
        env.store.insert(create_test_shortlink("home", "alice", "example.org", 307));
        env.store.fail_on(MockOperation::Get);

        let (status, _, body) = send(&env.router, get("/home")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(String::from_utf8(body).unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_counter_failure_does_not_fail_redirect() {
        let env = test_api();
        env.store.insert(create_test_shortlink("home", "alice", "example.org", 307));
        env.store.fail_on(MockOperation::UpdateStatus);

        let (status, _, _) = send(&env.router, get("/home")).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn test_security_headers_on_every_response() {
        let env = test_api();
        for request in [get("/missing"), get("/api/v1/shortlink/")] {
            let (_, headers, _) = send(&env.router, request).await;
            assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
            assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
            assert_eq!(
                headers["content-security-policy"],
                "default-src 'self' data: 'unsafe-inline'"
            );
        }
    }

    #[tokio::test]
    async fn test_api_requires_bearer_token() {
        let env = test_api();

        let (status, _, body) = send(&env.router, get("/api/v1/shortlink/")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["advice"], BEARER_ADVICE);

        let (status, _, _) = send(&env.router, api(Method::GET, "/api/v1/shortlink/", "bogus", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_returns_owned_links_only() {
        let env = test_api();
        env.store.insert(create_test_shortlink("a", "alice", "a.org", 307));
        env.store.insert(create_test_shortlink("b", "bob", "b.org", 307));

        let (status, _, body) = send(&env.router, api(Method::GET, "/api/v1/shortlink", "alice-token", None)).await;
        assert_eq!(status, StatusCode::OK);
        let links: Vec<ShortlinkView> = serde_json::from_slice(&body).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].name, "a");
    }

    #[tokio::test]
    async fn test_empty_list_is_ok() {
        let env = test_api();
        env.store.insert(create_test_shortlink("a", "alice", "a.org", 307));

        let (status, _, body) =
            send(&env.router, api(Method::GET, "/api/v1/shortlink/", "mallory-token", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_create_sets_caller_as_owner() {
        let env = test_api();
        let body = json!({"owner": "mallory", "owners": ["bob"], "target": "example.org", "code": 308});

        let (status, _, response) = send(
            &env.router,
            api(Method::POST, "/api/v1/shortlink/home", "alice-token", Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let view: ShortlinkView = serde_json::from_slice(&response).unwrap();
        assert_eq!(view.name, "home");
        assert_eq!(view.spec.owner, "alice");
        assert_eq!(env.store.object("home").unwrap().spec.owner, "alice");
    }

    #[tokio::test]
    async fn test_create_invalid_spec_writes_nothing() {
        let env = test_api();
        let body = json!({"target": "example.org", "after": 100});

        let (status, _, _) = send(
            &env.router,
            api(Method::POST, "/api/v1/shortlink/home", "alice-token", Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(env.store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_create_with_script_scheme_writes_nothing() {
        let env = test_api();
        let body = json!({"target": "javascript://%0aalert(document.domain)", "code": 200});

        let (status, _, response) = send(
            &env.router,
            api(Method::POST, "/api/v1/shortlink/home", "alice-token", Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let response: Value = serde_json::from_slice(&response).unwrap();
        assert!(response["error"].as_str().unwrap().contains("javascript"));
        assert_eq!(env.store.write_count(), 0);
        assert!(env.store.object("home").is_none());
    }

    #[tokio::test]
    async fn test_update_with_script_scheme_keeps_target() {
        let env = test_api();
        env.store.insert(create_test_shortlink("home", "alice", "example.org", 200));
        let writes = env.store.write_count();

        let body = json!({"target": "javascript://%0aalert(1)", "code": 200});
        let (status, _, _) = send(
            &env.router,
            api(Method::PUT, "/api/v1/shortlink/home", "alice-token", Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(env.store.write_count(), writes);
        assert_eq!(env.store.object("home").unwrap().spec.target, "example.org");
    }

    #[tokio::test]
    async fn test_malformed_body_is_500() {
        let env = test_api();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/shortlink/home")
            .header(header::AUTHORIZATION, "Bearer alice-token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, _, body) = send(&env.router, request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("Failed to read ShortLink spec"));
    }

    #[tokio::test]
    async fn test_get_by_owner_co_owner_and_stranger() {
        let env = test_api();
        let mut link = create_test_shortlink("home", "alice", "example.org", 307);
        link.spec.co_owners = vec!["bob".to_string()];
        env.store.insert(link);

        let path = "/api/v1/shortlink/home";
        assert_eq!(send(&env.router, api(Method::GET, path, "alice-token", None)).await.0, StatusCode::OK);
        assert_eq!(send(&env.router, api(Method::GET, path, "bob-token", None)).await.0, StatusCode::OK);
        assert_eq!(
            send(&env.router, api(Method::GET, path, "mallory-token", None)).await.0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            send(&env.router, api(Method::GET, "/api/v1/shortlink/nope", "alice-token", None)).await.0,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_update_by_co_owner_keeps_owner() {
        let env = test_api();
        let mut link = create_test_shortlink("home", "alice", "example.org", 307);
        link.spec.co_owners = vec!["bob".to_string()];
        env.store.insert(link);

        let body = json!({"owner": "bob", "owners": ["bob"], "target": "https://new.example.org", "code": 308});
        let (status, _, response) = send(
            &env.router,
            api(Method::PUT, "/api/v1/shortlink/home", "bob-token", Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let view: ShortlinkView = serde_json::from_slice(&response).unwrap();
        assert_eq!(view.spec.owner, "alice");
        assert_eq!(view.spec.target, "https://new.example.org");
        assert_eq!(view.status.changed_by.as_deref(), Some("bob"));
        assert!(view.status.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_update_by_stranger_is_rejected() {
        let env = test_api();
        env.store.insert(create_test_shortlink("home", "alice", "example.org", 307));
        let writes = env.store.write_count();

        let body = json!({"target": "evil.example.org"});
        let (status, _, _) = send(
            &env.router,
            api(Method::PUT, "/api/v1/shortlink/home", "mallory-token", Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(env.store.write_count(), writes);
        assert_eq!(env.store.object("home").unwrap().spec.target, "example.org");
    }

    #[tokio::test]
    async fn test_delete_returns_deleted_link() {
        let env = test_api();
        env.store.insert(create_test_shortlink("home", "alice", "example.org", 307));

        let path = "/api/v1/shortlink/home";
        assert_eq!(
            send(&env.router, api(Method::DELETE, path, "mallory-token", None)).await.0,
            StatusCode::UNAUTHORIZED
        );
        assert!(env.store.object("home").is_some());

        let (status, _, body) = send(&env.router, api(Method::DELETE, path, "alice-token", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<ShortlinkView>(&body).unwrap().name, "home");
        assert!(env.store.object("home").is_none());
        assert_eq!(
            send(&env.router, api(Method::DELETE, path, "alice-token", None)).await.0,
            StatusCode::NOT_FOUND
        );
    }
}
