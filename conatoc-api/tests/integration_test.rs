/// Integration tests for the portal HTTP API
///
/// These drive the full router (actor resolution, handlers, error mapping,
/// security headers) against an in-memory database.

mod common;

use axum::http::{header, Method, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{assert_login_redirect, TestContext, TEST_UPLOAD_MAX_BYTES};
use conatoc_shared::models::user::Role;
use serde_json::json;

fn registration(email: &str, password: &str) -> serde_json::Value {
    json!({
        "email": email,
        "name": "Pat Member",
        "affiliation": "Guelph",
        "password": password,
        "consent": true
    })
}

/// Anonymous listing, registration, publish with and without a file, download
#[tokio::test]
async fn test_member_publishes_and_downloads_paper() {
    let ctx = TestContext::new().await;

    assert_login_redirect(&ctx.get("/v1/papers", None).await);

    let registered = ctx
        .post("/v1/auth/register", None, registration("p1@x.org", "longpassword"))
        .await;
    assert_eq!(registered.status, StatusCode::CREATED);
    let session = registered.json();
    assert_eq!(session["user"]["role"], "patient");
    assert!(session["user"].get("password_hash").is_none());
    let token = session["access_token"].as_str().unwrap().to_string();

    let first = ctx
        .post("/v1/papers", Some(&token), json!({ "title": "SLC44A1 review" }))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    let first = first.json();
    assert_eq!(first["listing"][0]["title"], "SLC44A1 review");
    assert_eq!(first["listing"][0]["has_file"], false);

    let pdf: Vec<u8> = (0..2048).map(|i| (i % 251) as u8).collect();
    let staged = ctx
        .post(
            "/v1/uploads",
            Some(&token),
            json!({
                "kind": "paper",
                "file_name": "notes.pdf",
                "content": format!("data:application/pdf;base64,{}", STANDARD.encode(&pdf)),
            }),
        )
        .await;
    assert_eq!(staged.status, StatusCode::CREATED);
    let staged = staged.json();
    assert_eq!(staged["size"], 2048);

    let second = ctx
        .post(
            "/v1/papers",
            Some(&token),
            json!({ "title": "Lipidomics notes", "staging_handle": staged["staging_handle"] }),
        )
        .await
        .json();
    assert_eq!(second["listing"][0]["title"], "Lipidomics notes");
    assert_eq!(second["listing"][0]["has_file"], true);
    assert_eq!(second["listing"][1]["has_file"], false);

    let id = second["record"]["id"].as_i64().unwrap();
    let download = ctx.get(&format!("/v1/papers/{id}/download"), Some(&token)).await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(&download.body[..], pdf.as_slice());
    assert_eq!(download.headers.get(header::CONTENT_TYPE).unwrap(), "application/pdf");
    assert_eq!(
        download.headers.get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"notes.pdf\""
    );

    let page = ctx.get("/v1/papers?q=lipid&page=1", Some(&token)).await.json();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["title"], "Lipidomics notes");

    // The handle was consumed by the publish
    let reused = ctx
        .post(
            "/v1/papers",
            Some(&token),
            json!({ "title": "Again", "staging_handle": staged["staging_handle"] }),
        )
        .await;
    assert_eq!(reused.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_registration_errors() {
    let ctx = TestContext::new().await;

    let mut no_consent = registration("a@x.org", "longpassword");
    no_consent["consent"] = json!(false);
    let response = ctx.post("/v1/auth/register", None, no_consent).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json()["details"][0]["field"], "consent");

    let response = ctx
        .post("/v1/auth/register", None, registration("a@x.org", "1234567"))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json()["details"][0]["field"], "password");

    let response = ctx
        .post("/v1/auth/register", None, registration("a@x.org", "12345678"))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = ctx
        .post("/v1/auth/register", None, registration("A@X.ORG", "12345678"))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = ctx
        .post("/v1/auth/register", None, registration("no-at-sign", "12345678"))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_and_refresh() {
    let ctx = TestContext::new().await;
    ctx.post("/v1/auth/register", None, registration("login@x.org", "longpassword"))
        .await;

    let wrong = ctx
        .post("/v1/auth/login", None, json!({ "email": "login@x.org", "password": "nope-nope" }))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    let unknown = ctx
        .post("/v1/auth/login", None, json!({ "email": "who@x.org", "password": "longpassword" }))
        .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json()["message"], unknown.json()["message"]);

    let session = ctx
        .post("/v1/auth/login", None, json!({ "email": "LOGIN@x.org", "password": "longpassword" }))
        .await;
    assert_eq!(session.status, StatusCode::OK);
    let session = session.json();

    let refreshed = ctx
        .post(
            "/v1/auth/refresh",
            None,
            json!({ "refresh_token": session["refresh_token"] }),
        )
        .await;
    assert_eq!(refreshed.status, StatusCode::OK);
    let access = refreshed.json()["access_token"].as_str().unwrap().to_string();

    let me = ctx.get("/v1/me", Some(&access)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["email"], "login@x.org");

    // An access token is not a refresh token
    let misuse = ctx
        .post("/v1/auth/refresh", None, json!({ "refresh_token": access }))
        .await;
    assert_eq!(misuse.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_researcher_only_datasets() {
    let ctx = TestContext::new().await;
    let admin = ctx.member("admin@x.org", "Admin", Role::Admin).await;
    let researcher = ctx.member("r@x.org", "Res", Role::Researcher).await;
    let doctor = ctx.member("d@x.org", "Doc", Role::Doctor).await;
    let patient = ctx.member("p@x.org", "Pat", Role::Patient).await;

    let denied = ctx
        .post(
            "/v1/datasets",
            Some(&patient.token),
            json!({ "title": "Cohort", "visibility": "researchers" }),
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let data = b"id,choline\n1,7.2\n";
    let staged = ctx
        .post(
            "/v1/uploads",
            Some(&researcher.token),
            json!({ "kind": "dataset", "file_name": "cohort.csv", "content": STANDARD.encode(data) }),
        )
        .await
        .json();
    let published = ctx
        .post(
            "/v1/datasets",
            Some(&researcher.token),
            json!({
                "title": "Cohort",
                "visibility": "researchers",
                "staging_handle": staged["staging_handle"],
            }),
        )
        .await;
    assert_eq!(published.status, StatusCode::CREATED);
    let id = published.json()["record"]["id"].as_i64().unwrap();
    let uri = format!("/v1/datasets/{id}/download");

    for member in [&doctor, &patient] {
        assert_eq!(ctx.get(&uri, Some(&member.token)).await.status, StatusCode::FORBIDDEN);
    }

    let download = ctx.get(&uri, Some(&admin.token)).await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(&download.body[..], data);
    assert_eq!(
        download.headers.get(header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );

    // Listing shows the dataset to everyone
    let listing = ctx.get("/v1/datasets", Some(&patient.token)).await.json();
    assert_eq!(listing["total"], 1);
    assert_eq!(listing["items"][0]["visibility"], "researchers");
}

#[tokio::test]
async fn test_upload_limits() {
    let ctx = TestContext::new().await;
    let member = ctx.member("m@x.org", "Mem", Role::Patient).await;

    let oversized = vec![0u8; TEST_UPLOAD_MAX_BYTES + 1];
    let response = ctx
        .post(
            "/v1/uploads",
            Some(&member.token),
            json!({ "kind": "paper", "content": STANDARD.encode(&oversized) }),
        )
        .await;
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);

    let response = ctx
        .post(
            "/v1/uploads",
            Some(&member.token),
            json!({ "kind": "paper", "content": "***" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let response = ctx
        .post("/v1/uploads", None, json!({ "kind": "paper", "content": "JVBERg==" }))
        .await;
    assert_login_redirect(&response);
}

#[tokio::test]
async fn test_field_length_limits() {
    let ctx = TestContext::new().await;
    let member = ctx.member("m@x.org", "Mem", Role::Researcher).await;
    let token = Some(member.token.as_str());

    let at_limit = ctx
        .post(
            "/v1/papers",
            token,
            json!({ "title": "t".repeat(400), "link": "l".repeat(800), "tags": "g".repeat(300) }),
        )
        .await;
    assert_eq!(at_limit.status, StatusCode::CREATED);

    for body in [
        json!({ "title": "t".repeat(401) }),
        json!({ "title": "Paper", "link": "l".repeat(801) }),
        json!({ "title": "Paper", "tags": "g".repeat(301) }),
    ] {
        let response = ctx.post("/v1/papers", token, body).await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    let response = ctx
        .post("/v1/datasets", token, json!({ "title": "d".repeat(401) }))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json()["details"][0]["field"], "title");

    let response = ctx
        .post("/v1/news", token, json!({ "title": "n".repeat(240), "body": "Update" }))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let response = ctx
        .post("/v1/news", token, json!({ "title": "n".repeat(241), "body": "Update" }))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let upload = |file_name: String| {
        json!({ "kind": "paper", "file_name": file_name, "content": "JVBERg==" })
    };
    assert_eq!(
        ctx.post("/v1/uploads", token, upload("f".repeat(255))).await.status,
        StatusCode::CREATED
    );
    assert_eq!(
        ctx.post("/v1/uploads", token, upload("f".repeat(256))).await.status,
        StatusCode::UNPROCESSABLE_ENTITY
    );

    // Anonymous callers are sent to login before any field is checked
    assert_login_redirect(
        &ctx.post("/v1/papers", None, json!({ "title": "t".repeat(401) })).await,
    );

    let mut long_name = registration("long@x.org", "longpassword");
    long_name["name"] = json!("n".repeat(120));
    assert_eq!(
        ctx.post("/v1/auth/register", None, long_name).await.status,
        StatusCode::CREATED
    );

    let mut too_long = registration("longer@x.org", "longpassword");
    too_long["affiliation"] = json!("a".repeat(181));
    let response = ctx.post("/v1/auth/register", None, too_long).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json()["details"][0]["field"], "affiliation");
}

#[tokio::test]
async fn test_admin_actions() {
    let ctx = TestContext::new().await;
    let admin = ctx.member("admin@x.org", "Admin", Role::Admin).await;
    let researcher = ctx.member("r@x.org", "Res", Role::Researcher).await;
    let target = ctx.member("t@x.org", "Target", Role::Patient).await;
    let role_uri = format!("/v1/admin/users/{}/role", target.user.id);
    let deactivate_uri = format!("/v1/admin/users/{}/deactivate", target.user.id);

    assert_eq!(
        ctx.get("/v1/admin/users", Some(&researcher.token)).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        ctx.post(&role_uri, Some(&researcher.token), json!({ "role": "admin" }))
            .await
            .status,
        StatusCode::FORBIDDEN
    );

    let users = ctx.get("/v1/admin/users", Some(&admin.token)).await.json();
    assert_eq!(users.as_array().unwrap().len(), 3);

    let doctor = ctx
        .post(&role_uri, Some(&admin.token), json!({ "role": "doctor" }))
        .await;
    assert_eq!(doctor.status, StatusCode::UNPROCESSABLE_ENTITY);

    let promoted = ctx
        .post(&role_uri, Some(&admin.token), json!({ "role": "researcher" }))
        .await;
    assert_eq!(promoted.status, StatusCode::OK);

    // The new role applies to the target's existing token
    let channels = ctx.get("/v1/chat/channels", Some(&target.token)).await.json();
    assert_eq!(channels, json!(["general", "research"]));

    let own = format!("/v1/admin/users/{}/deactivate", admin.user.id);
    assert_eq!(
        ctx.send(Method::POST, &own, Some(&admin.token), None).await.status,
        StatusCode::BAD_REQUEST
    );

    let deactivated = ctx
        .send(Method::POST, &deactivate_uri, Some(&admin.token), None)
        .await;
    assert_eq!(deactivated.status, StatusCode::OK);
    assert_eq!(deactivated.json()["active"], false);

    // A deactivated member's token no longer signs anyone in
    assert_login_redirect(&ctx.get("/v1/me", Some(&target.token)).await);

    assert_eq!(
        ctx.send(Method::POST, "/v1/admin/users/9999/deactivate", Some(&admin.token), None)
            .await
            .status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_chat_channels() {
    let ctx = TestContext::new().await;
    let doctor = ctx.member("d@x.org", "Dora", Role::Doctor).await;
    let patient = ctx.member("p@x.org", "Paul", Role::Patient).await;

    let sent = ctx
        .post("/v1/chat/research", Some(&doctor.token), json!({ "message": "trial update" }))
        .await;
    assert_eq!(sent.status, StatusCode::CREATED);

    assert_eq!(
        ctx.get("/v1/chat/research", Some(&patient.token)).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        ctx.post("/v1/chat/research", Some(&patient.token), json!({ "message": "hi" }))
            .await
            .status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        ctx.get("/v1/chat/lounge", Some(&patient.token)).await.status,
        StatusCode::NOT_FOUND
    );
    assert_login_redirect(&ctx.get("/v1/chat/lounge", None).await);
    assert_login_redirect(
        &ctx.post("/v1/chat/lounge", None, json!({ "message": "hi" })).await,
    );
    assert_eq!(
        ctx.post("/v1/chat/general", Some(&patient.token), json!({ "message": "  " }))
            .await
            .status,
        StatusCode::UNPROCESSABLE_ENTITY
    );

    let research = ctx.get("/v1/chat/research", Some(&doctor.token)).await.json();
    assert_eq!(research[0]["message"], "trial update");
    assert_eq!(research[0]["author_name"], "Dora");
}

#[tokio::test]
async fn test_directories_and_overview() {
    let ctx = TestContext::new().await;
    let researcher = ctx.member("r@x.org", "Rhea", Role::Researcher).await;
    let doctor = ctx.member("d@x.org", "Dora", Role::Doctor).await;
    let patient = ctx.member("p@x.org", "Paul", Role::Patient).await;

    let public = ctx.get("/v1/overview", None).await;
    assert_eq!(public.status, StatusCode::OK);
    let public = public.json();
    assert_eq!(public["researchers"], 1);
    assert_eq!(public["patients"], 1);
    assert!(public.get("latest_papers").is_none());

    let member = ctx.get("/v1/overview", Some(&patient.token)).await.json();
    assert!(member["latest_papers"].is_array());

    let doctors = ctx.get("/v1/directory/doctors", Some(&patient.token)).await.json();
    assert_eq!(doctors["items"][0]["name"], "Dora");

    let registry = ctx
        .get("/v1/directory/patients", Some(&researcher.token))
        .await
        .json();
    assert_eq!(registry["view"], "full");
    assert_eq!(registry["patients"]["items"][0]["email"], "p@x.org");
    assert_eq!(registry["patients"]["page_size"], 12);
    assert_eq!(registry["patients"]["total"], 1);

    let own = ctx.get("/v1/directory/patients", Some(&patient.token)).await.json();
    assert_eq!(own["view"], "self_summary");
    assert_eq!(own["profile"]["name"], "Paul");

    assert_eq!(
        ctx.get("/v1/directory/patients", Some(&doctor.token)).await.status,
        StatusCode::FORBIDDEN
    );
    assert_login_redirect(&ctx.get("/v1/directory/researchers", None).await);
}

#[tokio::test]
async fn test_news_feed() {
    let ctx = TestContext::new().await;
    let patient = ctx.member("p@x.org", "Mia", Role::Patient).await;

    let posted = ctx
        .post(
            "/v1/news",
            Some(&patient.token),
            json!({ "title": "Family meetup", "body": "Saturday in Guelph" }),
        )
        .await;
    assert_eq!(posted.status, StatusCode::CREATED);

    let missing_body = ctx
        .post("/v1/news", Some(&patient.token), json!({ "title": "Empty" }))
        .await;
    assert_eq!(missing_body.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(missing_body.json()["details"][0]["field"], "body");

    let feed = ctx.get("/v1/news", Some(&patient.token)).await.json();
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["author_name"], "Mia");
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["database"], "connected");
    assert_eq!(response.headers.get("X-Frame-Options").unwrap(), "DENY");
    assert!(response.headers.get("Strict-Transport-Security").is_none());

    let garbage = ctx.get("/v1/me", Some("not-a-token")).await;
    assert_login_redirect(&garbage);
}
