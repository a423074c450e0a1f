use std::io;

use actix_files::Files;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chaiwala::config::Config;
use chaiwala::db::Database;
use chaiwala::templates::TemplateEngine;
use chaiwala::{admin, pages};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = Config::parse();

    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Initialize the database and make sure the schema is in place.
    let db = Database::new(&config.database).map_err(io::Error::other)?;
    db.create_schema().await.map_err(io::Error::other)?;

    std::fs::create_dir_all(&config.media_root)?;
    let media_root = config.media_root.clone();
    let assets_root = config.assets_root.clone();

    let templates = TemplateEngine::new().map_err(io::Error::other)?;

    info!("listening on http://{}", config.bind);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(templates.clone()))
            .configure(pages::configure)
            .configure(admin::configure)
            // Variety images live on disk under the media root.
            .service(Files::new("/media", media_root.clone()))
            .service(Files::new("/assets", assets_root.clone()))
    })
    .bind(config.bind)?
    .run()
    .await
}
