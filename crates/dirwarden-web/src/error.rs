//! HTTP-facing error type for the admin UI.

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use dirwarden_directory::DirectoryError;

/// Error page template.
#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    status: u16,
    title: &'a str,
    message: String,
}

/// Error type for the web layer.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// A store operation failed; mapped onto an HTTP status below.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// A page failed to render.
    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, title, message) = match &self {
            WebError::Directory(DirectoryError::NotFound { identifier }) => (
                StatusCode::NOT_FOUND,
                "Not Found",
                format!("No entry found for '{identifier}'."),
            ),
            WebError::Directory(DirectoryError::AlreadyExists { identifier }) => (
                StatusCode::CONFLICT,
                "Conflict",
                format!("An entry named '{identifier}' already exists."),
            ),
            WebError::Directory(DirectoryError::Conversion(e)) => (
                StatusCode::BAD_REQUEST,
                "Bad Request",
                format!("Invalid identifier: {e}"),
            ),
            WebError::Directory(e) => {
                tracing::error!(error = %e, "directory operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    "The directory operation failed.".to_string(),
                )
            }
            WebError::Template(e) => {
                tracing::error!(error = %e, "template render error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    "The page could not be rendered.".to_string(),
                )
            }
        };

        let template = ErrorTemplate {
            status: status.as_u16(),
            title,
            message,
        };
        match template.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "error page render failed");
                (status, title.to_string()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let response =
            WebError::from(DirectoryError::not_found("cn=ghost,ou=people")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflict_maps_to_409() {
        let response = WebError::from(DirectoryError::AlreadyExists {
            identifier: "engineers".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn conversion_maps_to_400() {
        let dn_err = dirwarden_core::Dn::parse("garbage").unwrap_err();
        let response = WebError::from(DirectoryError::from(dn_err)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn write_failure_maps_to_500() {
        let response =
            WebError::from(DirectoryError::write_failed("server unreachable")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
