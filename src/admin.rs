//! Management pages under `/admin`.
//!
//! Each entity gets the same surface: a column listing, a create form, an
//! edit form and a delete action. The variety form carries inline review
//! rows (two blank slots plus one row per saved review) and the store form
//! a multi-select over the catalog. Successful saves redirect back to the
//! listing with 303 See Other so a refresh never replays the POST.

use actix_web::{http::header, web, HttpResponse};
use chrono::Utc;
use tera::Context;
use tracing::info;

use crate::db::Database;
use crate::error::AppError;
use crate::forms::{self, FormData, INLINE_REVIEW_ROWS};
use crate::models::chai::{ChaiFields, ChaiType, DEFAULT_DESCRIPTION, DEFAULT_PRICE};
use crate::templates::TemplateEngine;

type RawForm = web::Form<Vec<(String, String)>>;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("", web::get().to(index))
            .route("/varieties", web::get().to(variety_list))
            .route("/varieties/new", web::get().to(variety_create_form))
            .route("/varieties/new", web::post().to(variety_create))
            .route("/varieties/{id}", web::get().to(variety_edit_form))
            .route("/varieties/{id}", web::post().to(variety_update))
            .route("/varieties/{id}/delete", web::post().to(variety_delete))
            .route("/stores", web::get().to(store_list))
            .route("/stores/new", web::get().to(store_create_form))
            .route("/stores/new", web::post().to(store_create))
            .route("/stores/{id}", web::get().to(store_edit_form))
            .route("/stores/{id}", web::post().to(store_update))
            .route("/stores/{id}/delete", web::post().to(store_delete))
            .route("/certificates", web::get().to(certificate_list))
            .route("/certificates/new", web::get().to(certificate_create_form))
            .route("/certificates/new", web::post().to(certificate_create))
            .route("/certificates/{id}", web::get().to(certificate_edit_form))
            .route("/certificates/{id}", web::post().to(certificate_update))
            .route("/certificates/{id}/delete", web::post().to(certificate_delete)),
    );
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn required_text(form: &FormData, key: &str) -> Result<String, AppError> {
    let value = form.text(key);
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{key} is required")));
    }
    Ok(value)
}

/// Variety fields from a submitted form. Description and price fall back to
/// the catalog defaults when left blank.
fn chai_fields(form: &FormData) -> Result<ChaiFields, AppError> {
    Ok(ChaiFields {
        name: required_text(form, "name")?,
        image: form.text("image"),
        chai_type: form.chai_type("type")?,
        description: form.text_or("description", DEFAULT_DESCRIPTION),
        price: form.f64_or("price", DEFAULT_PRICE)?,
    })
}

async fn index(
    db: web::Data<Database>,
    templates: web::Data<TemplateEngine>,
) -> Result<HttpResponse, AppError> {
    let mut ctx = Context::new();
    ctx.insert("variety_count", &db.list_chais().await?.len());
    ctx.insert("store_count", &db.list_stores().await?.len());
    ctx.insert("certificate_count", &db.list_certificates().await?.len());
    templates.page("admin/index.html", &ctx)
}

// ----- varieties -----

async fn variety_list(
    db: web::Data<Database>,
    templates: web::Data<TemplateEngine>,
) -> Result<HttpResponse, AppError> {
    let mut ctx = Context::new();
    ctx.insert("chais", &db.list_chais().await?);
    templates.page("admin/variety_list.html", &ctx)
}

async fn variety_create_form(
    db: web::Data<Database>,
    templates: web::Data<TemplateEngine>,
) -> Result<HttpResponse, AppError> {
    let mut ctx = Context::new();
    ctx.insert("type_options", &ChaiType::options());
    ctx.insert("selected_type", "");
    ctx.insert("users", &db.list_users().await?);
    ctx.insert("inline_rows", &(1..=INLINE_REVIEW_ROWS).collect::<Vec<_>>());
    ctx.insert("action", "/admin/varieties/new");
    templates.page("admin/variety_form.html", &ctx)
}

async fn variety_create(
    form: RawForm,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let form = FormData::new(form.into_inner());
    let fields = chai_fields(&form)?;
    let new_reviews = forms::new_review_rows(&form)?;
    let chai = db.create_chai(&fields, &new_reviews).await?;
    info!("created chai variety {} ({})", chai.id, chai.name);
    Ok(see_other("/admin/varieties"))
}

async fn variety_edit_form(
    path: web::Path<i64>,
    db: web::Data<Database>,
    templates: web::Data<TemplateEngine>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let chai = db
        .get_chai(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no chai variety with id {id}")))?;

    let mut ctx = Context::new();
    ctx.insert("chai", &chai);
    ctx.insert("reviews", &db.reviews_for_chai(id).await?);
    ctx.insert("type_options", &ChaiType::options());
    ctx.insert("selected_type", chai.chai_type.label());
    ctx.insert("users", &db.list_users().await?);
    ctx.insert("inline_rows", &(1..=INLINE_REVIEW_ROWS).collect::<Vec<_>>());
    ctx.insert("action", &format!("/admin/varieties/{id}"));
    templates.page("admin/variety_form.html", &ctx)
}

async fn variety_update(
    path: web::Path<i64>,
    form: RawForm,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let form = FormData::new(form.into_inner());
    let fields = chai_fields(&form)?;
    let edits = forms::existing_review_rows(&form)?;
    let new_reviews = forms::new_review_rows(&form)?;
    db.update_chai(id, &fields, &edits, &new_reviews).await?;
    info!("updated chai variety {id}");
    Ok(see_other("/admin/varieties"))
}

async fn variety_delete(
    path: web::Path<i64>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db.delete_chai(id).await?;
    info!("deleted chai variety {id}");
    Ok(see_other("/admin/varieties"))
}

// ----- stores -----

async fn store_list(
    db: web::Data<Database>,
    templates: web::Data<TemplateEngine>,
) -> Result<HttpResponse, AppError> {
    let mut ctx = Context::new();
    ctx.insert("stores", &db.list_stores().await?);
    templates.page("admin/store_list.html", &ctx)
}

async fn store_create_form(
    db: web::Data<Database>,
    templates: web::Data<TemplateEngine>,
) -> Result<HttpResponse, AppError> {
    let mut ctx = Context::new();
    ctx.insert("chais", &db.list_chais().await?);
    ctx.insert("selected_ids", &Vec::<i64>::new());
    ctx.insert("action", "/admin/stores/new");
    templates.page("admin/store_form.html", &ctx)
}

async fn store_create(form: RawForm, db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    let form = FormData::new(form.into_inner());
    let name = required_text(&form, "name")?;
    let location = required_text(&form, "location")?;
    let varieties = form.i64_list("varieties")?;

    let store = db.create_store(&name, &location, &varieties).await?;
    info!("created store {} ({})", store.id, store.name);
    Ok(see_other("/admin/stores"))
}

async fn store_edit_form(
    path: web::Path<i64>,
    db: web::Data<Database>,
    templates: web::Data<TemplateEngine>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let store = db
        .get_store(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no store with id {id}")))?;
    let selected_ids: Vec<i64> = db
        .varieties_for_store(id)
        .await?
        .iter()
        .map(|chai| chai.id)
        .collect();

    let mut ctx = Context::new();
    ctx.insert("store", &store);
    ctx.insert("chais", &db.list_chais().await?);
    ctx.insert("selected_ids", &selected_ids);
    ctx.insert("action", &format!("/admin/stores/{id}"));
    templates.page("admin/store_form.html", &ctx)
}

async fn store_update(
    path: web::Path<i64>,
    form: RawForm,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let form = FormData::new(form.into_inner());
    let name = required_text(&form, "name")?;
    let location = required_text(&form, "location")?;
    let varieties = form.i64_list("varieties")?;

    db.update_store(id, &name, &location, &varieties).await?;
    info!("updated store {id}");
    Ok(see_other("/admin/stores"))
}

async fn store_delete(
    path: web::Path<i64>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db.delete_store(id).await?;
    info!("deleted store {id}");
    Ok(see_other("/admin/stores"))
}

// ----- certificates -----

async fn certificate_list(
    db: web::Data<Database>,
    templates: web::Data<TemplateEngine>,
) -> Result<HttpResponse, AppError> {
    let mut ctx = Context::new();
    ctx.insert("certificates", &db.list_certificates().await?);
    templates.page("admin/certificate_list.html", &ctx)
}

async fn certificate_create_form(
    db: web::Data<Database>,
    templates: web::Data<TemplateEngine>,
) -> Result<HttpResponse, AppError> {
    let mut ctx = Context::new();
    ctx.insert("chais", &db.list_chais().await?);
    ctx.insert("action", "/admin/certificates/new");
    templates.page("admin/certificate_form.html", &ctx)
}

async fn certificate_create(
    form: RawForm,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let form = FormData::new(form.into_inner());
    let chai_id = form.i64("chai_id")?;
    let number = required_text(&form, "certificate_number")?;
    // Blank issue date means "issued now"; the expiry has no sane default.
    let issued_date = form.datetime_or("issued_date", Utc::now())?;
    let valid_until = form.datetime("valid_until")?;

    let id = db
        .insert_certificate(chai_id, &number, issued_date, valid_until)
        .await?;
    info!("issued certificate {id} for chai variety {chai_id}");
    Ok(see_other("/admin/certificates"))
}

async fn certificate_edit_form(
    path: web::Path<i64>,
    db: web::Data<Database>,
    templates: web::Data<TemplateEngine>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let certificate = db
        .get_certificate(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no certificate with id {id}")))?;

    let mut ctx = Context::new();
    ctx.insert("certificate", &certificate);
    ctx.insert("chais", &db.list_chais().await?);
    ctx.insert("action", &format!("/admin/certificates/{id}"));
    templates.page("admin/certificate_form.html", &ctx)
}

async fn certificate_update(
    path: web::Path<i64>,
    form: RawForm,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let form = FormData::new(form.into_inner());
    let chai_id = form.i64("chai_id")?;
    let number = required_text(&form, "certificate_number")?;
    let issued_date = form.datetime_or("issued_date", Utc::now())?;
    let valid_until = form.datetime("valid_until")?;

    db.update_certificate(id, chai_id, &number, issued_date, valid_until)
        .await?;
    info!("updated certificate {id}");
    Ok(see_other("/admin/certificates"))
}

async fn certificate_delete(
    path: web::Path<i64>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db.delete_certificate(id).await?;
    info!("deleted certificate {id}");
    Ok(see_other("/admin/certificates"))
}
