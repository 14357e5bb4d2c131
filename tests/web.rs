//! Page tests: sessions, role checks and forms

mod common;

use axum::http::{header, StatusCode};

use common::{spawn_app, PASSWORD};
use newsroom::models::{ContentKind, UserRole};
use newsroom::services::SubscriptionTarget;

#[tokio::test]
async fn anonymous_visitors_are_sent_to_login() {
    let app = spawn_app().await;

    for path in ["/", "/editor", "/subscribe", "/articles/new"] {
        let response = app.server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER, "{}", path);
        assert_eq!(response.header(header::LOCATION), "/login");
    }

    let response = app.server.get("/login").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("<form method=\"post\" action=\"/login\">"));
}

#[tokio::test]
async fn register_page_confirms_and_reports_errors() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/register")
        .form(&[
            ("username", "newbie"),
            ("email", "newbie@example.com"),
            ("password1", PASSWORD),
            ("password2", PASSWORD),
            ("role", "reader"),
        ])
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("Registration successful!"));
    let user = app
        .state
        .user_service
        .get_by_username("newbie")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.role, UserRole::Reader);

    let response = app
        .server
        .post("/register")
        .form(&[
            ("username", "other"),
            ("password1", "one"),
            ("password2", "two"),
            ("role", "editor"),
        ])
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let text = response.text();
    assert!(text.contains("The two password fields didn"));
    assert!(text.contains("value=\"other\""));

    let response = app
        .server
        .post("/register")
        .form(&[
            ("username", "other"),
            ("password1", "one"),
            ("password2", "one"),
            ("role", "overlord"),
        ])
        .await;
    assert!(response.text().contains("Select a valid choice. overlord"));
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let app = spawn_app().await;
    app.user("rita", "", UserRole::Reader).await;

    let response = app
        .server
        .post("/login")
        .form(&[("username", "rita"), ("password", PASSWORD)])
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/");
    let cookie = response.header(header::SET_COOKIE);
    let cookie = cookie.to_str().unwrap();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("SameSite=Lax"));

    let response = app
        .server
        .post("/login")
        .form(&[("username", "rita"), ("password", "wrong")])
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("Please enter a correct username and password."));
}

#[tokio::test]
async fn logout_clears_session() {
    let app = spawn_app().await;
    let reader = app.user("rita", "", UserRole::Reader).await;
    let (name, value) = app.session_cookie(&reader).await;

    let response = app.server.post("/logout").add_header(name.clone(), value.clone()).await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/login");
    assert!(response
        .header(header::SET_COOKIE)
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    let response = app.server.get("/").add_header(name, value).await;
    assert_eq!(response.header(header::LOCATION), "/login");
}

#[tokio::test]
async fn home_routes_by_role() {
    let app = spawn_app().await;
    let editor = app.user("ed", "", UserRole::Editor).await;
    let journalist = app.user("jo", "", UserRole::Journalist).await;
    let reader = app.user("rita", "", UserRole::Reader).await;
    let gazette = app.publisher(&editor, "Gazette").await;

    let shown = app.write(&journalist, ContentKind::Article, "Shown **story**", Some(gazette.id)).await;
    app.write(&journalist, ContentKind::Article, "Hidden draft", Some(gazette.id)).await;
    app.approve(&editor, ContentKind::Article, shown.id).await;
    app.state
        .subscription_service
        .subscribe(
            reader.id,
            SubscriptionTarget {
                publisher_id: Some(gazette.id),
                journalist_id: None,
            },
        )
        .await
        .unwrap();

    let (name, value) = app.session_cookie(&editor).await;
    let response = app.server.get("/").add_header(name, value).await;
    assert_eq!(response.header(header::LOCATION), "/editor");

    let (name, value) = app.session_cookie(&journalist).await;
    let response = app.server.get("/").add_header(name, value).await;
    assert_eq!(response.header(header::LOCATION), "/journalist");

    let (name, value) = app.session_cookie(&reader).await;
    let response = app.server.get("/").add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let text = response.text();
    assert!(text.contains("Shown **story**"));
    assert!(text.contains("Gazette"));
    assert!(!text.contains("Hidden draft"));
}

#[tokio::test]
async fn dashboards_check_roles() {
    let app = spawn_app().await;
    let journalist = app.user("jo", "", UserRole::Journalist).await;
    let reader = app.user("rita", "", UserRole::Reader).await;

    let (name, value) = app.session_cookie(&journalist).await;
    let response = app.server.get("/editor").add_header(name.clone(), value.clone()).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(response.text(), "Unauthorized");

    let response = app.server.get("/subscribe").add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let (name, value) = app.session_cookie(&reader).await;
    let response = app.server.get("/journalist").add_header(name.clone(), value.clone()).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let response = app.server.get("/articles/new").add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn journalist_writes_edits_and_deletes() {
    let app = spawn_app().await;
    let journalist = app.user("jo", "", UserRole::Journalist).await;
    let (name, value) = app.session_cookie(&journalist).await;

    let response = app
        .server
        .post("/newsletters/new")
        .add_header(name.clone(), value.clone())
        .form(&[("title", "Weekly"), ("content", "Ten things"), ("publisher", "")])
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/journalist");

    let dashboard = app
        .state
        .content_service
        .journalist_dashboard(&journalist)
        .await
        .unwrap();
    assert_eq!(dashboard.newsletters.len(), 1);
    let item = &dashboard.newsletters[0];
    assert!(item.is_independent());

    let response = app
        .server
        .get("/journalist")
        .add_header(name.clone(), value.clone())
        .await;
    assert!(response.text().contains("Weekly"));

    // Invalid input re-renders the form
    let edit = format!("/newsletters/{}/edit", item.id);
    let response = app
        .server
        .post(&edit)
        .add_header(name.clone(), value.clone())
        .form(&[("title", ""), ("content", "Ten things")])
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("This field is required."));

    let response = app
        .server
        .post(&edit)
        .add_header(name.clone(), value.clone())
        .form(&[("title", "Weekly digest"), ("content", "Eleven things")])
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    let updated = app
        .state
        .content_service
        .get(ContentKind::Newsletter, item.id)
        .await
        .unwrap();
    assert_eq!(updated.title, "Weekly digest");

    let delete = format!("/newsletters/{}/delete", item.id);
    let response = app.server.get(&delete).add_header(name.clone(), value.clone()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("Weekly digest"));

    let response = app.server.post(&delete).add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert!(app
        .state
        .content_service
        .get(ContentKind::Newsletter, item.id)
        .await
        .is_err());
}

#[tokio::test]
async fn journalists_cannot_touch_others_work() {
    let app = spawn_app().await;
    let author = app.user("jo", "", UserRole::Journalist).await;
    let rival = app.user("max", "", UserRole::Journalist).await;
    let editor = app.user("ed", "", UserRole::Editor).await;
    let item = app.write(&author, ContentKind::Article, "Mine", None).await;

    let (name, value) = app.session_cookie(&rival).await;
    let response = app
        .server
        .get(&format!("/articles/{}/edit", item.id))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(
        response.text(),
        "Unauthorized: You can only edit your own articles"
    );

    let (name, value) = app.session_cookie(&editor).await;
    let response = app
        .server
        .get(&format!("/articles/{}/edit", item.id))
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app.server.get("/articles/999/edit").add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn editor_approves_from_dashboard() {
    let app = spawn_app().await;
    let editor = app.user("ed", "", UserRole::Editor).await;
    let journalist = app.user("jo", "", UserRole::Journalist).await;
    let reader = app.user("rita", "rita@example.com", UserRole::Reader).await;
    let item = app.write(&journalist, ContentKind::Article, "Breaking", None).await;
    app.state
        .subscription_service
        .subscribe(
            reader.id,
            SubscriptionTarget {
                publisher_id: None,
                journalist_id: Some(journalist.id),
            },
        )
        .await
        .unwrap();

    let (name, value) = app.session_cookie(&editor).await;
    let response = app.server.get("/editor").add_header(name.clone(), value.clone()).await;
    assert!(response
        .text()
        .contains(&format!("/articles/{}/approve", item.id)));

    let response = app
        .server
        .post(&format!("/articles/{}/approve", item.id))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/editor");

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "rita@example.com");
    assert_eq!(sent[0].subject, "New Article: Breaking");

    let (name, value) = app.session_cookie(&journalist).await;
    let response = app
        .server
        .post(&format!("/articles/{}/approve", item.id))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn failed_approval_page_is_500() {
    let app = spawn_app().await;
    let editor = app.user("ed", "", UserRole::Editor).await;
    let journalist = app.user("jo", "", UserRole::Journalist).await;
    let item = app.write(&journalist, ContentKind::Newsletter, "Weekly", None).await;

    app.break_subscriber_lookup().await;
    let (name, value) = app.session_cookie(&editor).await;
    let response = app
        .server
        .post(&format!("/newsletters/{}/approve", item.id))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "Error approving: Failed to collect subscribers");
    assert!(!app.is_approved(ContentKind::Newsletter, item.id).await);
    assert!(app.poster.posts().is_empty());
}

#[tokio::test]
async fn subscribe_form_replaces_both_sets() {
    let app = spawn_app().await;
    let editor = app.user("ed", "", UserRole::Editor).await;
    let journalist = app.user("jo", "", UserRole::Journalist).await;
    let reader = app.user("rita", "", UserRole::Reader).await;
    let gazette = app.publisher(&editor, "Gazette").await;
    let bugle = app.publisher(&editor, "Bugle").await;
    let (name, value) = app.session_cookie(&reader).await;

    let response = app.server.get("/subscribe").add_header(name.clone(), value.clone()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let text = response.text();
    assert!(text.contains("Gazette"));
    assert!(text.contains("jo"));

    let gazette_id = gazette.id.to_string();
    let bugle_id = bugle.id.to_string();
    let journalist_id = journalist.id.to_string();
    let response = app
        .server
        .post("/subscribe")
        .add_header(name.clone(), value.clone())
        .form(&[
            ("publishers", gazette_id.as_str()),
            ("publishers", bugle_id.as_str()),
            ("journalists", journalist_id.as_str()),
        ])
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    let subs = app.state.subscription_service.get(reader.id).await.unwrap();
    assert_eq!(subs.publishers.len(), 2);
    assert_eq!(subs.journalists, vec![journalist.id]);

    // Picking an editor as a journalist is rejected and nothing changes
    let editor_id = editor.id.to_string();
    let response = app
        .server
        .post("/subscribe")
        .add_header(name, value)
        .form(&[("journalists", editor_id.as_str())])
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("Select a valid choice."));
    let subs = app.state.subscription_service.get(reader.id).await.unwrap();
    assert_eq!(subs.publishers.len(), 2);
}
