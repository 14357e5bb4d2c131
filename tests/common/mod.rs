//! Shared fixtures for the HTTP tests

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::http::{header, HeaderName, HeaderValue};
use axum_test::TestServer;
use data_encoding::BASE64;
use std::sync::{Arc, Mutex};

use newsroom::api::{self, AppState};
use newsroom::config::Config;
use newsroom::db::{create_test_pool, migrations};
use newsroom::models::{Content, ContentInput, ContentKind, Publisher, User, UserRole};
use newsroom::services::{Mailer, OutgoingEmail, RegisterInput, SocialPoster};

pub const PASSWORD: &str = "correct-horse-battery";

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        if email.to.ends_with("@bounce.test") {
            return Err(anyhow!("mailbox unavailable"));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPoster {
    posts: Mutex<Vec<String>>,
}

impl RecordingPoster {
    pub fn posts(&self) -> Vec<String> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SocialPoster for RecordingPoster {
    async fn post(&self, text: &str) -> Result<()> {
        self.posts.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub poster: Arc<RecordingPoster>,
}

pub async fn spawn_app() -> TestApp {
    let pool = create_test_pool().await.unwrap();
    migrations::run_migrations(&pool).await.unwrap();

    let config = Config::default();
    let mailer = Arc::new(RecordingMailer::default());
    let poster = Arc::new(RecordingPoster::default());
    let state = AppState::new(pool, &config, mailer.clone(), poster.clone()).unwrap();

    let router = api::build_router(state.clone(), &config.server.cors_origin);
    TestApp {
        server: TestServer::new(router).unwrap(),
        state,
        mailer,
        poster,
    }
}

impl TestApp {
    pub async fn user(&self, username: &str, email: &str, role: UserRole) -> User {
        self.state
            .user_service
            .register(RegisterInput::new(username, email, PASSWORD, role))
            .await
            .unwrap()
    }

    pub async fn publisher(&self, editor: &User, name: &str) -> Publisher {
        self.state
            .publisher_service
            .create(editor, name)
            .await
            .unwrap()
    }

    pub async fn write(
        &self,
        journalist: &User,
        kind: ContentKind,
        title: &str,
        publisher: Option<i64>,
    ) -> Content {
        self.state
            .content_service
            .create(
                journalist,
                kind,
                ContentInput::new(title, format!("Body of {}", title), publisher),
            )
            .await
            .unwrap()
    }

    pub async fn approve(&self, editor: &User, kind: ContentKind, id: i64) {
        self.state
            .content_service
            .approve(editor, kind, id)
            .await
            .unwrap();
    }

    /// Hide the journalist subscription table so collecting an audience fails
    pub async fn break_subscriber_lookup(&self) {
        sqlx::query("ALTER TABLE subscriptions_journalists RENAME TO subscriptions_journalists_off")
            .execute(&self.state.pool)
            .await
            .unwrap();
    }

    pub async fn restore_subscriber_lookup(&self) {
        sqlx::query("ALTER TABLE subscriptions_journalists_off RENAME TO subscriptions_journalists")
            .execute(&self.state.pool)
            .await
            .unwrap();
    }

    pub async fn is_approved(&self, kind: ContentKind, id: i64) -> bool {
        self.state.content_service.get(kind, id).await.unwrap().approved
    }

    /// Cookie header of a fresh browser session
    pub async fn session_cookie(&self, user: &User) -> (HeaderName, HeaderValue) {
        let (_, session) = self
            .state
            .user_service
            .login(newsroom::services::LoginInput::new(&user.username, PASSWORD))
            .await
            .unwrap();
        (
            header::COOKIE,
            HeaderValue::from_str(&format!("session={}", session.id)).unwrap(),
        )
    }
}

/// `Authorization` header with Basic credentials
pub fn basic(user: &User) -> (HeaderName, HeaderValue) {
    let encoded = BASE64.encode(format!("{}:{}", user.username, PASSWORD).as_bytes());
    (
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Basic {}", encoded)).unwrap(),
    )
}
