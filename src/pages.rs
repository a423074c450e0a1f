//! Public, read-only pages: home, the variety listing and the detail view.

use actix_web::{web, HttpResponse};
use tera::Context;
use tracing::info;

use crate::db::Database;
use crate::error::AppError;
use crate::templates::TemplateEngine;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(home))
        .route("/chais", web::get().to(all_chai))
        .route("/chais/{id}", web::get().to(chai_detail));
}

async fn home(templates: web::Data<TemplateEngine>) -> Result<HttpResponse, AppError> {
    templates.page("home.html", &Context::new())
}

async fn all_chai(
    db: web::Data<Database>,
    templates: web::Data<TemplateEngine>,
) -> Result<HttpResponse, AppError> {
    let chais = db.list_chais().await?;
    info!("serving catalog with {} varieties", chais.len());

    let mut ctx = Context::new();
    ctx.insert("chais", &chais);
    templates.page("chai_list.html", &ctx)
}

/// Detail page for one variety: its reviews, the stores stocking it and the
/// certificate if one was issued. An unknown id is a plain 404, not an error.
async fn chai_detail(
    path: web::Path<i64>,
    db: web::Data<Database>,
    templates: web::Data<TemplateEngine>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let chai = db
        .get_chai(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no chai variety with id {id}")))?;
    let reviews = db.reviews_for_chai(id).await?;
    let stores = db.stores_for_chai(id).await?;
    let certificate = db.certificate_for_chai(id).await?;

    let mut ctx = Context::new();
    ctx.insert("chai", &chai);
    ctx.insert("reviews", &reviews);
    ctx.insert("stores", &stores);
    ctx.insert("certificate", &certificate);
    templates.page("chai_detail.html", &ctx)
}
