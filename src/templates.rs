//! Page rendering over Tera with templates compiled into the binary.

use actix_web::HttpResponse;
use rust_embed::Embed;
use tera::{Context, Tera};

use crate::error::AppError;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

/// The template engine shared through `web::Data`. Immutable after startup;
/// Tera renders through `&self`, so no locking is involved.
#[derive(Clone)]
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Register every embedded template in one batch so `extends` chains
    /// resolve regardless of file order.
    pub fn new() -> Result<Self, AppError> {
        let mut files = Vec::new();
        for name in EmbeddedTemplates::iter() {
            if let Some(file) = EmbeddedTemplates::get(name.as_ref()) {
                if let Ok(source) = std::str::from_utf8(&file.data) {
                    files.push((name.to_string(), source.to_string()));
                }
            }
        }
        let mut tera = Tera::default();
        tera.add_raw_templates(files)?;
        Ok(TemplateEngine { tera })
    }

    pub fn render(&self, name: &str, ctx: &Context) -> Result<String, AppError> {
        Ok(self.tera.render(name, ctx)?)
    }

    /// Render a template into a complete HTML response.
    pub fn page(&self, name: &str, ctx: &Context) -> Result<HttpResponse, AppError> {
        let html = self.render(name, ctx)?;
        Ok(HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_template_registers() {
        let engine = TemplateEngine::new().unwrap();
        for name in [
            "base.html",
            "home.html",
            "chai_list.html",
            "chai_detail.html",
            "admin/index.html",
            "admin/variety_list.html",
            "admin/variety_form.html",
            "admin/store_list.html",
            "admin/store_form.html",
            "admin/certificate_list.html",
            "admin/certificate_form.html",
        ] {
            assert!(
                engine.tera.get_template_names().any(|n| n == name),
                "template {name} missing"
            );
        }
    }

    #[test]
    fn home_renders_without_context() {
        let engine = TemplateEngine::new().unwrap();
        let html = engine.render("home.html", &Context::new()).unwrap();
        assert!(html.contains("<html"));
    }
}
