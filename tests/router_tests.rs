use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use axum_extra::extract::cookie::Key;
use clinic_cms::db::{ContentStore, NewAdminUser, SqliteStore};
use clinic_cms::router::{CmsState, cms_router};
use clinic_cms::storage::{LocalImageStore, MAX_IMAGE_BYTES};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

async fn test_app() -> (TempDir, Router) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let url = format!("sqlite:{}", dir.path().join("router.db").display());
    let store = SqliteStore::connect(&url)
        .await
        .expect("failed to open sqlite store");
    let password_hash = bcrypt::hash("s3cret", 4).expect("hash failed");
    store
        .create_admin_user(NewAdminUser {
            username: "admin".to_string(),
            password_hash,
        })
        .await
        .expect("failed to create admin");
    store
        .create_admin_user(NewAdminUser {
            username: "legacy".to_string(),
            password_hash: "not-a-bcrypt-hash".to_string(),
        })
        .await
        .expect("failed to create admin");

    let images = LocalImageStore::new(dir.path().join("uploads"));
    let state = CmsState::new(Arc::new(store), Arc::new(images), Key::generate(), true);
    (dir, cms_router(state))
}

const BOUNDARY: &str = "clinic-cms-test-boundary";

fn multipart_request(
    cookie: Option<&str>,
    field: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body))
        .expect("failed to build request")
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("failed to build request")
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not json")
}

async fn login(app: &Router) -> String {
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "username": "admin", "password": "s3cret" }),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("login must set a cookie");
    assert!(set_cookie.starts_with("admin_session="));
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

#[tokio::test]
async fn reads_are_public() {
    let (_dir, app) = test_app().await;
    let resp = app
        .clone()
        .oneshot(empty_request("GET", "/api/banners", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!([]));

    let resp = app
        .oneshot(empty_request("GET", "/api/posts?id=99", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, Value::Null);
}

#[tokio::test]
async fn writes_require_a_session() {
    let (_dir, app) = test_app().await;
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/banners",
            None,
            json!({ "image_url": "https://x/a.png", "order_index": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/banners",
            Some("admin_session=forged"),
            json!({ "image_url": "https://x/a.png", "order_index": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let (_dir, app) = test_app().await;
    for body in [
        json!({ "username": "admin", "password": "nope" }),
        json!({ "username": "ghost", "password": "s3cret" }),
    ] {
        let resp = app
            .clone()
            .oneshot(json_request("POST", "/api/auth/login", None, body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
    }
}

#[tokio::test]
async fn unreadable_stored_hash_is_rejected_as_bad_credentials() {
    let (_dir, app) = test_app().await;
    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "username": "legacy", "password": "anything" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn banner_crud_through_http() {
    let (_dir, app) = test_app().await;
    let cookie = login(&app).await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/banners",
            Some(&cookie),
            json!({ "image_url": "https://x/a.png", "order_index": 2 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created = body_json(resp).await;
    assert_eq!(created["success"], json!(true));
    let id = created["id"].as_i64().expect("id");

    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/banners",
            Some(&cookie),
            json!({ "id": id, "order_index": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["banner"]["order_index"], json!(5));
    assert_eq!(updated["banner"]["image_url"], json!("https://x/a.png"));

    let resp = app
        .clone()
        .oneshot(empty_request("GET", &format!("/api/banners?id={id}"), None))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["order_index"], json!(5));

    let resp = app
        .clone()
        .oneshot(empty_request("DELETE", "/api/banners", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(empty_request(
                "DELETE",
                &format!("/api/banners?id={id}"),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .oneshot(json_request(
            "PUT",
            "/api/banners",
            Some(&cookie),
            json!({ "id": id, "order_index": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn published_filter_hides_drafts() {
    let (_dir, app) = test_app().await;
    let cookie = login(&app).await;

    for (title, published) in [("live", true), ("draft", false)] {
        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/posts",
                Some(&cookie),
                json!({ "title": title, "content": "body", "published": published }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .clone()
        .oneshot(empty_request("GET", "/api/posts?published=true", None))
        .await
        .unwrap();
    let public = body_json(resp).await;
    let titles: Vec<&str> = public
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|p| p["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["live"]);

    let resp = app
        .oneshot(empty_request("GET", "/api/posts", None))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn contact_cards_reject_unknown_types_and_support_path_ids() {
    let (_dir, app) = test_app().await;
    let cookie = login(&app).await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/contact",
            Some(&cookie),
            json!({ "type": "video", "content": "x" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/contact",
            Some(&cookie),
            json!({ "type": "text", "title": "Phone", "content": "+55 11 0000-0000" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let id = body_json(resp).await["id"].as_i64().expect("id");

    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/contact/{id}"),
            Some(&cookie),
            json!({ "title": null }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let card = body_json(resp).await;
    assert_eq!(card["card"]["title"], Value::Null);
    assert_eq!(card["card"]["content"], json!("+55 11 0000-0000"));
    assert_eq!(card["card"]["type"], json!("text"));

    let resp = app
        .oneshot(empty_request(
            "DELETE",
            &format!("/api/contact/{id}"),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let (_dir, app) = test_app().await;
    let cookie = login(&app).await;
    let resp = app
        .oneshot(empty_request("POST", "/api/auth/logout", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("logout must reset the cookie");
    assert!(set_cookie.starts_with("admin_session="));
}

#[tokio::test]
async fn uploads_require_a_session() {
    let (_dir, app) = test_app().await;
    let resp = app
        .clone()
        .oneshot(multipart_request(None, "file", "a.png", "image/png", b"png"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(empty_request(
            "DELETE",
            "/api/upload/delete?url=/uploads/1-a.png",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn uploaded_images_are_served_and_deleted() {
    let (dir, app) = test_app().await;
    let cookie = login(&app).await;
    let data = b"\x89PNG\r\n\x1a\nfake image";

    let resp = app
        .clone()
        .oneshot(multipart_request(
            Some(&cookie),
            "file",
            "clinic photo.png",
            "image/png",
            data,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let uploaded = body_json(resp).await;
    assert_eq!(uploaded["success"], json!(true));
    let filename = uploaded["filename"].as_str().expect("filename").to_string();
    let url = uploaded["url"].as_str().expect("url").to_string();
    assert!(filename.ends_with("-clinic-photo.png"), "{filename}");
    assert_eq!(url, format!("/uploads/{filename}"));
    assert!(dir.path().join("uploads").join(&filename).exists());

    let resp = app
        .clone()
        .oneshot(empty_request("GET", &url, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let served = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&served[..], &data[..]);

    let delete_uri = format!("/api/upload/delete?url={url}");
    let resp = app
        .clone()
        .oneshot(empty_request("DELETE", &delete_uri, Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(empty_request("GET", &url, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .clone()
        .oneshot(empty_request("DELETE", &delete_uri, Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .oneshot(empty_request("DELETE", "/api/upload/delete", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn uploads_reject_bad_types_sizes_and_missing_files() {
    let (dir, app) = test_app().await;
    let cookie = login(&app).await;

    let resp = app
        .clone()
        .oneshot(multipart_request(
            Some(&cookie),
            "file",
            "exam.pdf",
            "application/pdf",
            b"%PDF-1.4",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let oversized = vec![0u8; MAX_IMAGE_BYTES + 1];
    let resp = app
        .clone()
        .oneshot(multipart_request(
            Some(&cookie),
            "file",
            "huge.jpg",
            "image/jpeg",
            &oversized,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(multipart_request(
            Some(&cookie),
            "attachment",
            "a.png",
            "image/png",
            b"png",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert!(!dir.path().join("uploads").exists());
}
