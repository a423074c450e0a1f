use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use tracing::error;

/// Application error surfaced to the HTTP layer. Handlers return
/// `Result<HttpResponse, AppError>` and propagate with `?`; actix turns the
/// error into the matching status through the `ResponseError` impl below.
///
/// A missing record is a controlled `NotFound` here rather than a generic
/// server fault, so the detail page for an unknown variety renders a 404.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

impl AppError {
    fn title(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "Not Found",
            AppError::Conflict(_) => "Conflict",
            AppError::BadRequest(_) => "Bad Request",
            AppError::Database(_) | AppError::Template(_) => "Server Error",
        }
    }

    /// Message shown on the error page. Client errors carry their own text;
    /// server-side failures get a fixed line and the detail goes to the log.
    fn public_detail(&self) -> String {
        match self {
            AppError::NotFound(msg) | AppError::Conflict(msg) | AppError::BadRequest(msg) => {
                msg.clone()
            }
            AppError::Database(_) | AppError::Template(_) => {
                "Something went wrong on our side.".to_string()
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("request failed: {self}");
        }
        HttpResponse::build(status)
            .content_type("text/html; charset=utf-8")
            .body(error_page(status, self.title(), &self.public_detail()))
    }
}

/// Self-contained error page. Rendered without the template engine so a
/// template failure still produces a readable response.
fn error_page(status: StatusCode, title: &str, detail: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\">\
         <title>{code} {title}</title></head>\n\
         <body style=\"font-family: sans-serif; margin: 4rem auto; max-width: 32rem;\">\n\
         <h1>{code} {title}</h1>\n<p>{detail}</p>\n\
         <p><a href=\"/\">Back to the storefront</a></p>\n</body>\n</html>\n",
        code = status.as_u16(),
        title = title,
        detail = escape_html(detail),
    )
}

// Bad-request messages can echo form input, so the detail line is escaped.
fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
