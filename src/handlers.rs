use actix_web::error::InternalError;
use actix_web::{web, HttpResponse, ResponseError};
use log::{error, info};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{payload_rejection, ForwardError};
use crate::forwarder::PredictionForwarder;
use crate::models::PredictionEnvelope;

// Same ceiling as Express' JSON body parser; oversized bodies get 413.
const JSON_BODY_LIMIT: usize = 100 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .content_type_required(false)
        .error_handler(|err, _req| {
            let response = payload_rejection(err.status_code(), &err);
            InternalError::from_response(err, response).into()
        });

    cfg.app_data(json_config)
        .service(web::resource("/predict").route(web::post().to(predict)));
}

pub async fn predict(
    forwarder: web::Data<PredictionForwarder>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ForwardError> {
    let request_id = Uuid::new_v4();
    let body = body.into_inner();
    info!("[{request_id}] prediction request: {body}");

    match forwarder.forward(&body).await {
        Ok(prediction) => Ok(HttpResponse::Ok().json(PredictionEnvelope { prediction })),
        Err(err) => {
            error!("[{request_id}] prediction failed: {err}");
            Err(err)
        }
    }
}
