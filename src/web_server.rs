use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::{web, App, HttpServer, HttpResponse};
use futures::TryStreamExt;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use crate::comparator::Comparator;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::storage::ImageStore;

async fn index(app_config: web::Data<AppConfig>) -> Result<NamedFile, AppError> {
    let path = Path::new(&app_config.static_directory).join("index.html");
    NamedFile::open_async(&path).await.map_err(|e| {
        log::error!("Error serving index.html: {}", e);
        AppError::Io(e)
    })
}

async fn upload(
    store: web::Data<ImageStore>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != "file" {
            log::trace!("Ignoring multipart field: {}", field.name());
            continue;
        }

        let original = field
            .content_disposition()
            .get_filename()
            .unwrap_or_default()
            .to_string();
        log::debug!("Received upload: {:?}", original);
        let filename = store.check_upload_name(&original)?;

        let mut contents = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            contents.extend_from_slice(&chunk);
        }
        store.save(&filename, &contents).await?;

        return Ok(HttpResponse::Ok().json(json!({
            "filename": filename,
            "uploaded": true,
        })));
    }

    Err(AppError::Validation("No file part in request".into()))
}

async fn compare(
    comparator: web::Data<Comparator>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    // Only a non-empty JSON object counts as a request body.
    let request: Map<String, Value> = match serde_json::from_slice(&body) {
        Ok(Value::Object(map)) if !map.is_empty() => map,
        Ok(other) => {
            log::debug!("Rejecting compare body: {}", other);
            return Err(AppError::Validation("No JSON data provided".into()));
        }
        Err(e) => {
            log::debug!("Rejecting compare body: {}", e);
            return Err(AppError::Validation("No JSON data provided".into()));
        }
    };
    log::debug!("Received compare request: {:?}", request);

    match (image_name(&request, "image1"), image_name(&request, "image2")) {
        (Some(image1), Some(image2)) => {
            let result = comparator.compare(image1, image2).await?;
            Ok(HttpResponse::Ok().json(result))
        }
        _ => Err(AppError::Validation("Both image1 and image2 are required".into())),
    }
}

fn image_name<'a>(request: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    request.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

async fn list_uploads(store: web::Data<ImageStore>) -> Result<HttpResponse, AppError> {
    let images = store.list().await?;
    log::debug!("Listing {} uploads", images.len());
    Ok(HttpResponse::Ok().json(json!({ "images": images })))
}

async fn get_upload(
    path: web::Path<String>,
    store: web::Data<ImageStore>,
) -> Result<NamedFile, AppError> {
    let filename = path.into_inner();
    let file_path = store.resolve(&filename).await?;
    log::trace!("Serving upload from: {:?}", file_path);
    Ok(NamedFile::open_async(&file_path).await?)
}

async fn delete_upload(
    path: web::Path<String>,
    store: web::Data<ImageStore>,
) -> Result<HttpResponse, AppError> {
    let filename = path.into_inner();
    store.delete(&filename).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("File {} deleted successfully", filename),
    })))
}

/// API routes, shared by the server and the handler tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/upload", web::post().to(upload))
        .route("/compare", web::post().to(compare))
        .route("/uploads", web::get().to(list_uploads))
        .route("/uploads/{filename}", web::get().to(get_upload))
        .route("/delete/{filename}", web::delete().to(delete_upload));
}

pub async fn start_web_server(
    config: Arc<AppConfig>,
    store: ImageStore,
    comparator: Comparator,
) -> std::io::Result<()> {
    let port = config.web_port;
    let static_directory = config.static_directory.clone();
    let config_data = web::Data::from(config);
    let store_data = web::Data::new(store);
    let comparator_data = web::Data::new(comparator);

    log::info!("Starting web server on port: {}", port);
    log::debug!("Serving static files from {} directory.", static_directory);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(store_data.clone())
            .app_data(comparator_data.clone())
            .configure(routes)
            .service(actix_files::Files::new("/static", &static_directory))
            .route("/", web::get().to(index))
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await
}
