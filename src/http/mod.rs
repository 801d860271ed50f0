pub mod api;
mod http_error;

use self::api::{
    DeleteConfirmation, HistoryQuery, HistoryResponse, MessageInfo, RegisterUser, UserInfo,
};
use self::http_error::HttpError;
use crate::config::Config;
use crate::message_service::{EditMessage, MessageService, SendMessage};
use actix_web::web::{
    Bytes, Data, Json, JsonConfig, Path, PathConfig, PayloadConfig, Query, QueryConfig,
    ServiceConfig,
};
use actix_web::{
    delete, get, http::StatusCode, middleware, patch, post, put, App, HttpRequest, HttpResponse,
    HttpServer, Responder, ResponseError, Result,
};
use log::info;
use std::sync::Arc;

type ThreadData = Arc<MessageService>;

/// Header carrying the id of the user making the request, set by the authenticating proxy
const USER_HEADER: &str = "X-User-Id";

/// Determine which user is making the request
fn acting_user(req: &HttpRequest) -> Result<i32, HttpError> {
    req.headers()
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| HttpError::from_status_code(StatusCode::UNAUTHORIZED))
}

/// Report a request that couldn't be extracted with the same JSON body as other errors
fn extractor_error<E: ResponseError>(err: E, _req: &HttpRequest) -> actix_web::Error {
    HttpError::DetailedError(err.status_code(), err.to_string()).into()
}

#[get("/messages/", name = "messages")]
async fn list_messages(
    query: Query<HistoryQuery>,
    req: HttpRequest,
    data: Data<ThreadData>,
) -> Result<impl Responder> {
    let (page, messages) = data
        .history(&query.filter(), query.page, query.page_size)
        .map_err(HttpError::from)?;
    Ok(Json(HistoryResponse::new(page, messages, &req)?))
}

#[post("/messages/")]
async fn send_message(
    body: Json<SendMessage>,
    req: HttpRequest,
    data: Data<ThreadData>,
) -> Result<HttpResponse> {
    let sender = acting_user(&req)?;
    let message = data
        .send(sender, body.into_inner())
        .map_err(HttpError::from)?;
    Ok(HttpResponse::Created().json(MessageInfo::from_message(message, &req)?))
}

#[get("/messages/{message_id}")]
async fn get_message(
    message_id: Path<String>,
    req: HttpRequest,
    data: Data<ThreadData>,
) -> Result<impl Responder> {
    let message = data.get(&message_id).map_err(HttpError::from)?;
    Ok(Json(MessageInfo::from_message(message, &req)?))
}

#[patch("/messages/{message_id}")]
async fn edit_message(
    message_id: Path<String>,
    body: Json<EditMessage>,
    req: HttpRequest,
    data: Data<ThreadData>,
) -> Result<impl Responder> {
    let actor = acting_user(&req)?;
    let message = data
        .edit(actor, &message_id, body.into_inner())
        .map_err(HttpError::from)?;
    Ok(Json(MessageInfo::from_message(message, &req)?))
}

#[delete("/messages/{message_id}")]
async fn delete_message(
    message_id: Path<String>,
    req: HttpRequest,
    data: Data<ThreadData>,
) -> Result<impl Responder> {
    let actor = acting_user(&req)?;
    let message = data
        .delete(actor, &message_id)
        .map_err(HttpError::from)?;
    Ok(Json(DeleteConfirmation {
        r#type: "delete_confirmation".to_owned(),
        message_id: message.message_id,
    }))
}

#[put("/messages/{message_id}/file")]
async fn upload_file(
    message_id: Path<String>,
    body: Bytes,
    req: HttpRequest,
    data: Data<ThreadData>,
) -> Result<impl Responder> {
    let actor = acting_user(&req)?;
    let message = data
        .attach_file(actor, &message_id, &body)
        .map_err(HttpError::from)?;
    Ok(Json(MessageInfo::from_message(message, &req)?))
}

#[get("/messages/{message_id}/file", name = "message_file")]
async fn download_file(message_id: Path<String>, data: Data<ThreadData>) -> Result<HttpResponse> {
    let (message, contents) = data.read_file(&message_id).map_err(HttpError::from)?;
    let content_type = message
        .file_type
        .unwrap_or_else(|| "application/octet-stream".to_owned());
    Ok(HttpResponse::Ok().content_type(content_type).body(contents))
}

#[post("/users/")]
async fn register_user(body: Json<RegisterUser>, data: Data<ThreadData>) -> Result<HttpResponse> {
    let user = data
        .register_user(&body.username)
        .map_err(HttpError::from)?;
    Ok(HttpResponse::Created().json(UserInfo::from(user)))
}

#[get("/users/{id}")]
async fn get_user(id: Path<i32>, data: Data<ThreadData>) -> Result<impl Responder> {
    let user = data.get_user(*id).map_err(HttpError::from)?;
    Ok(Json(UserInfo::from(user)))
}

#[post("/users/{id}/last-seen")]
async fn touch_last_seen(
    id: Path<i32>,
    req: HttpRequest,
    data: Data<ThreadData>,
) -> Result<impl Responder> {
    let actor = acting_user(&req)?;
    let user = data
        .touch_last_seen(actor, *id)
        .map_err(HttpError::from)?;
    Ok(Json(UserInfo::from(user)))
}

/// Register the routes and shared state of the API
fn configure(data: ThreadData, max_file_size: usize) -> impl FnOnce(&mut ServiceConfig) {
    move |config| {
        config
            .app_data(Data::new(data))
            .app_data(PayloadConfig::new(max_file_size))
            .app_data(JsonConfig::default().error_handler(extractor_error))
            .app_data(QueryConfig::default().error_handler(extractor_error))
            .app_data(PathConfig::default().error_handler(extractor_error))
            .service(list_messages)
            .service(send_message)
            .service(get_message)
            .service(edit_message)
            .service(delete_message)
            .service(upload_file)
            .service(download_file)
            .service(register_user)
            .service(get_user)
            .service(touch_last_seen);
    }
}

pub async fn start_server(data: ThreadData, config: &Config) -> Result<(), std::io::Error> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let max_file_size = config.media.max_file_size;
    info!("Starting HTTP server on {host}:{port}");
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Compress::default())
            .wrap(middleware::Logger::default())
            .configure(configure(data.clone(), max_file_size))
    })
    .shutdown_timeout(config.server.shutdown_timeout.as_secs())
    .bind((host, port))?
    .run()
    .await
}
