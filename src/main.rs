mod auth;
mod db;
mod error;
mod handlers;
mod models;
pub mod schema;

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use db::DbPool;
use std::env;

async fn health_check_handler(
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, error::ServiceError> {
    match pool.get().await {
        Ok(_conn) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "message": "Backend is running and DB pool accessible"
        }))),
        Err(e) => {
            log::error!("Failed to get connection from pool: {:?}", e);
            Err(error::ServiceError::InternalServerError(
                "Failed to check DB pool".to_string(),
            ))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    if cfg!(debug_assertions) {
        match dotenvy::dotenv() {
            Ok(path) => log::info!(".env file loaded from path: {}", path.display()),
            Err(e) => log::warn!(
                "Could not load .env file: {}, using environment variables.",
                e
            ),
        }
    }

    let database_url = env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set in environment variables or .env file");

    let pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database connection pool.");

    log::info!("Copy Cat Log backend starting...");

    let allowed_origin =
        env::var("CORS_ALLOWED_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .expect("PORT must be a valid number");

    log::info!("Server will start at http://{}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&allowed_origin)
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            // The public surface uses trailing-slash paths (/project/, /log/{project}/).
            .wrap(middleware::NormalizePath::trim())
            .wrap(cors)
            .app_data(web::Data::new(pool.clone()))
            .service(web::resource("/health").route(web::get().to(health_check_handler)))
            .service(
                web::scope("/project")
                    .service(handlers::project_handlers::list_projects_handler)
                    .service(handlers::project_handlers::create_project_handler),
            )
            .service(
                web::scope("/channel")
                    .service(handlers::channel_handlers::list_channels_handler)
                    .service(handlers::channel_handlers::create_channel_handler),
            )
            .service(
                web::scope("/log")
                    .service(handlers::log_handlers::list_events_handler)
                    .service(handlers::log_handlers::ingest_event_handler)
                    .service(handlers::log_handlers::list_project_events_handler)
                    .service(handlers::log_handlers::list_channel_events_handler),
            )
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
