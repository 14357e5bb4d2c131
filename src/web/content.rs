//! Article and newsletter pages
//!
//! Mounted once per [`ContentKind`] under `/articles` and `/newsletters`.

use axum::{
    extract::{Form, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Router,
};
use serde_json::json;

use crate::api::middleware::AppState;
use crate::models::{Content, ContentInput, ContentKind, User};
use crate::services::content::INVALID_CHOICE;
use crate::services::{ContentServiceError, FieldErrors};
use crate::web::{dashboard_path, page_context, templates, CurrentUser, FormFields, WebError};

pub fn router(kind: ContentKind) -> Router<AppState> {
    Router::new()
        .route("/new", get(new_form).post(create))
        .route("/{id}/edit", get(edit_form).post(update))
        .route("/{id}/delete", get(confirm_delete).post(delete))
        .route("/{id}/approve", post(approve))
        .layer(Extension(kind))
}

async fn new_form(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, WebError> {
    if !user.is_journalist() {
        return Err(WebError::forbidden());
    }
    render_form(&state, &user, kind, None, &ContentInput::default(), &FieldErrors::new()).await
}

async fn create(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(user): CurrentUser,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    if !user.is_journalist() {
        return Err(WebError::forbidden());
    }
    let (input, errors) = parse_form(&FormFields::new(pairs));
    if !errors.is_empty() {
        return Ok(render_form(&state, &user, kind, None, &input, &errors).await?.into_response());
    }

    match state.content_service.create(&user, kind, input.clone()).await {
        Ok(_) => Ok(Redirect::to("/journalist").into_response()),
        Err(ContentServiceError::Validation(errors)) => {
            Ok(render_form(&state, &user, kind, None, &input, &errors).await?.into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn edit_form(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Html<String>, WebError> {
    let item = state.content_service.get_for_edit(&user, kind, id).await?;
    let values = ContentInput::new(item.title.clone(), item.content.clone(), item.publisher);
    render_form(&state, &user, kind, Some(&item), &values, &FieldErrors::new()).await
}

async fn update(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, WebError> {
    let item = state.content_service.get_for_edit(&user, kind, id).await?;
    let (input, errors) = parse_form(&FormFields::new(pairs));
    if !errors.is_empty() {
        return Ok(render_form(&state, &user, kind, Some(&item), &input, &errors)
            .await?
            .into_response());
    }

    match state.content_service.update(&user, kind, id, input.clone()).await {
        Ok(_) => Ok(Redirect::to(dashboard_path(&user)).into_response()),
        Err(ContentServiceError::Validation(errors)) => Ok(render_form(
            &state,
            &user,
            kind,
            Some(&item),
            &input,
            &errors,
        )
        .await?
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

async fn confirm_delete(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Html<String>, WebError> {
    let item = state.content_service.get_for_edit(&user, kind, id).await?;

    let mut context = page_context(Some(&user));
    context.insert("object", &item);
    context.insert("kind_label", kind.label());
    context.insert("action", &format!("/{}/{}/delete", kind.plural(), id));
    context.insert("cancel_url", dashboard_path(&user));
    Ok(Html(templates::render(&state.templates, "confirm_delete.html", &context)?))
}

async fn delete(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Redirect, WebError> {
    state.content_service.delete(&user, kind, id).await?;
    Ok(Redirect::to(dashboard_path(&user)))
}

/// Approve and notify; any failure past the role check is a 500
async fn approve(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Redirect, WebError> {
    state
        .content_service
        .approve(&user, kind, id)
        .await
        .map_err(|e| match e {
            ContentServiceError::InternalError(e) => {
                tracing::error!("Approving {} {} failed: {:#}", kind, id, e);
                WebError::Approval(e.to_string())
            }
            other => other.into(),
        })?;
    Ok(Redirect::to("/editor"))
}

/// Read title, content and the optional publisher choice
fn parse_form(form: &FormFields) -> (ContentInput, FieldErrors) {
    let mut errors = FieldErrors::new();
    let publisher = match form.value("publisher").trim() {
        "" => None,
        raw => match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add("publisher", INVALID_CHOICE);
                None
            }
        },
    };
    (
        ContentInput::new(form.value("title"), form.value("content"), publisher),
        errors,
    )
}

async fn render_form(
    state: &AppState,
    user: &User,
    kind: ContentKind,
    item: Option<&Content>,
    values: &ContentInput,
    errors: &FieldErrors,
) -> Result<Html<String>, WebError> {
    let publishers = state.publisher_service.list().await?;
    let action = match item {
        Some(item) => format!("/{}/{}/edit", kind.plural(), item.id),
        None => format!("/{}/new", kind.plural()),
    };

    let mut context = page_context(Some(user));
    context.insert("kind_label", kind.label());
    context.insert("action", &action);
    context.insert("editing", &item.is_some());
    context.insert(
        "form",
        &json!({
            "title": values.title,
            "content": values.content,
            "publisher": values.publisher,
        }),
    );
    context.insert("errors", errors);
    context.insert("publishers", &publishers);
    context.insert("cancel_url", dashboard_path(user));
    Ok(Html(templates::render(&state.templates, "content_form.html", &context)?))
}
