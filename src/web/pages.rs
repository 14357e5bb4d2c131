//! Account pages, dashboards and the subscription form

use axum::{
    extract::{Form, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde_json::json;

use crate::api::middleware::{
    clear_session_cookie_header, session_cookie, session_cookie_header, AppState,
};
use crate::models::{Subscriptions, User, UserRole};
use crate::services::{FieldErrors, LoginInput, RegisterInput, UserServiceError};
use crate::web::{
    item_views, page_context, templates, CurrentUser, FormFields, WebError,
};

const LOGIN_FAILED: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

// ============================================================================
// Registration and login
// ============================================================================

pub async fn register_form(State(state): State<AppState>) -> Result<Html<String>, WebError> {
    render_register(&state, &FormFields::default(), &FieldErrors::new())
}

pub async fn register(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Html<String>, WebError> {
    let form = FormFields::new(pairs);

    let role = match form.value("role").trim() {
        "" => Err("This field is required.".to_string()),
        raw => raw.parse::<UserRole>().map_err(|_| {
            format!(
                "Select a valid choice. {} is not one of the available choices.",
                raw
            )
        }),
    };
    let role = match role {
        Ok(role) => role,
        Err(msg) => {
            return render_register(&state, &form, &FieldErrors::single("role", msg));
        }
    };

    let input = RegisterInput {
        username: form.value("username").to_string(),
        email: form.value("email").trim().to_string(),
        password: form.value("password1").to_string(),
        password_confirm: Some(form.value("password2").to_string()),
        role: Some(role),
    };

    match state.user_service.register(input).await {
        Ok(user) => {
            tracing::info!("Registered {} through the sign-up page", user.username);
            let mut context = page_context(None);
            context.insert("message", "Registration successful!");
            Ok(Html(templates::render(
                &state.templates,
                "registration_confirm.html",
                &context,
            )?))
        }
        Err(UserServiceError::ValidationError(errors)) => render_register(&state, &form, &errors),
        Err(UserServiceError::UserExists(_)) => render_register(
            &state,
            &form,
            &FieldErrors::single("username", "A user with that username already exists."),
        ),
        Err(e) => Err(e.into()),
    }
}

fn render_register(
    state: &AppState,
    form: &FormFields,
    errors: &FieldErrors,
) -> Result<Html<String>, WebError> {
    let mut context = page_context(None);
    context.insert(
        "form",
        &json!({
            "username": form.value("username"),
            "email": form.value("email"),
            "role": form.value("role"),
        }),
    );
    context.insert("errors", errors);
    context.insert(
        "roles",
        &UserRole::ALL
            .iter()
            .map(|r| json!({"value": r.as_str(), "label": r.label()}))
            .collect::<Vec<_>>(),
    );
    Ok(Html(templates::render(&state.templates, "register.html", &context)?))
}

pub async fn login_form(State(state): State<AppState>) -> Result<Html<String>, WebError> {
    render_login(&state, "", &FieldErrors::new(), None)
}

pub async fn login(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let form = FormFields::new(pairs);
    let username = form.value("username").trim();
    let password = form.value("password");

    let mut errors = FieldErrors::new();
    if username.is_empty() {
        errors.add("username", "This field is required.");
    }
    if password.is_empty() {
        errors.add("password", "This field is required.");
    }
    if !errors.is_empty() {
        return Ok(render_login(&state, username, &errors, None)?.into_response());
    }

    match state
        .user_service
        .login(LoginInput::new(username, password))
        .await
    {
        Ok((user, session)) => {
            tracing::debug!("{} logged in", user.username);
            Ok((
                [(header::SET_COOKIE, session_cookie_header(&session))],
                Redirect::to("/"),
            )
                .into_response())
        }
        Err(UserServiceError::AuthenticationError(_)) => {
            Ok(render_login(&state, username, &errors, Some(LOGIN_FAILED))?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

fn render_login(
    state: &AppState,
    username: &str,
    errors: &FieldErrors,
    failure: Option<&str>,
) -> Result<Html<String>, WebError> {
    let mut context = page_context(None);
    context.insert("username", username);
    context.insert("errors", errors);
    if let Some(failure) = failure {
        context.insert("failure", failure);
    }
    Ok(Html(templates::render(&state.templates, "login.html", &context)?))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, WebError> {
    if let Some(token) = session_cookie(&headers) {
        state.user_service.logout(&token).await?;
    }
    Ok((
        [(header::SET_COOKIE, clear_session_cookie_header())],
        Redirect::to("/login"),
    )
        .into_response())
}

// ============================================================================
// Dashboards
// ============================================================================

/// Readers get their feed, staff are sent to their dashboard
pub async fn home(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, WebError> {
    match user.role {
        UserRole::Journalist => Ok(Redirect::to("/journalist").into_response()),
        UserRole::Editor => Ok(Redirect::to("/editor").into_response()),
        UserRole::Reader => {
            let feed = state.content_service.feed_for(&user).await?;
            let publishers = state.publisher_service.list().await?;

            let mut context = page_context(Some(&user));
            context.insert("articles", &item_views(feed.articles, &publishers));
            context.insert("newsletters", &item_views(feed.newsletters, &publishers));
            Ok(Html(templates::render(&state.templates, "reader_home.html", &context)?).into_response())
        }
    }
}

pub async fn journalist_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, WebError> {
    let lists = state.content_service.journalist_dashboard(&user).await?;
    let publishers = state.publisher_service.list().await?;

    let mut context = page_context(Some(&user));
    context.insert("articles", &item_views(lists.articles, &publishers));
    context.insert("newsletters", &item_views(lists.newsletters, &publishers));
    Ok(Html(templates::render(
        &state.templates,
        "journalist_dashboard.html",
        &context,
    )?))
}

pub async fn editor_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, WebError> {
    let dashboard = state.content_service.editor_dashboard(&user).await?;
    let publishers = state.publisher_service.list().await?;

    let mut context = page_context(Some(&user));
    context.insert(
        "unapproved_articles",
        &item_views(dashboard.unapproved_articles, &publishers),
    );
    context.insert(
        "approved_articles",
        &item_views(dashboard.approved_articles, &publishers),
    );
    context.insert(
        "unapproved_newsletters",
        &item_views(dashboard.unapproved_newsletters, &publishers),
    );
    context.insert(
        "approved_newsletters",
        &item_views(dashboard.approved_newsletters, &publishers),
    );
    Ok(Html(templates::render(
        &state.templates,
        "editor_dashboard.html",
        &context,
    )?))
}

// ============================================================================
// Subscriptions
// ============================================================================

pub async fn subscribe_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, WebError> {
    if !user.is_reader() {
        return Err(WebError::forbidden());
    }
    let current = state.subscription_service.get(user.id).await?;
    render_subscribe(&state, &user, &current, &FieldErrors::new()).await
}

/// Replace both subscription sets from the checkbox form
pub async fn subscribe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    if !user.is_reader() {
        return Err(WebError::forbidden());
    }
    let form = FormFields::new(pairs);

    let mut errors = FieldErrors::new();
    let publishers = form.ids("publishers").unwrap_or_else(|msg| {
        errors.add("publishers", msg);
        Vec::new()
    });
    let journalists = form.ids("journalists").unwrap_or_else(|msg| {
        errors.add("journalists", msg);
        Vec::new()
    });
    let wanted = Subscriptions {
        publishers,
        journalists,
    };
    if !errors.is_empty() {
        return Ok(render_subscribe(&state, &user, &wanted, &errors).await?.into_response());
    }

    match state.subscription_service.replace(&user, wanted.clone()).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(crate::services::SubscriptionServiceError::Validation(errors)) => {
            Ok(render_subscribe(&state, &user, &wanted, &errors).await?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn render_subscribe(
    state: &AppState,
    user: &User,
    selected: &Subscriptions,
    errors: &FieldErrors,
) -> Result<Html<String>, WebError> {
    let publishers = state.publisher_service.list().await?;
    let journalists = state.user_service.list_journalists().await?;

    let mut context = page_context(Some(user));
    context.insert("publishers", &publishers);
    context.insert("journalists", &journalists);
    context.insert("selected_publishers", &selected.publishers);
    context.insert("selected_journalists", &selected.journalists);
    context.insert("errors", errors);
    Ok(Html(templates::render(&state.templates, "subscribe.html", &context)?))
}
