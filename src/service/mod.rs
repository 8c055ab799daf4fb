//service/mod.rs
pub mod storage_service;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError, Error};
use actix_web::error::ErrorInternalServerError;
use bytes::BytesMut;
use futures::StreamExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::integrity::Fingerprint;
use crate::storage::{Status, StorageError};

/// Header carrying the transfer count of a successful read
pub const BYTES_PROCESSED_HEADER: &str = "X-Bytes-Processed";

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub offset: i64,
    pub size: i64,
}

#[derive(Debug, Deserialize)]
pub struct RemovalQuery {
    pub budget: i64,
}

/// JSON body returned by every control call
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CallResponse {
    pub status: Status,
    pub value: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FingerprintResponse {
    pub status: Status,
    pub fingerprint: Fingerprint,
}

impl ResponseError for StorageError {
    fn status_code(&self) -> StatusCode {
        match self {
            StorageError::DeviceNotPresent => StatusCode::SERVICE_UNAVAILABLE,
            StorageError::OutOfBounds => StatusCode::RANGE_NOT_SATISFIABLE,
            StorageError::NotSupported => StatusCode::NOT_IMPLEMENTED,
            StorageError::Aborted | StorageError::Generic => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // failed calls always report zero bytes processed
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(CallResponse {
            status: Status::from(*self),
            value: 0,
        })
    }
}

fn success(value: u64) -> HttpResponse {
    HttpResponse::Ok().json(CallResponse {
        status: Status::Success,
        value,
    })
}

pub async fn read_handler(query: web::Query<RangeQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, StorageError> {
    log_mdc::insert("op", "read");
    debug!("READ offset={} size={}", query.offset, query.size);

    let data = app_state.storage_service.read(query.offset, query.size)?;
    Ok(HttpResponse::Ok()
        .content_type("application/octet-stream")
        .insert_header((BYTES_PROCESSED_HEADER, data.len().to_string()))
        .body(data))
}

pub async fn write_handler(query: web::Query<RangeQuery>, mut payload: web::Payload, app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    log_mdc::insert("op", "write");
    debug!("WRITE offset={} size={}", query.offset, query.size);

    let mut bytes = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(ErrorInternalServerError)?;
        bytes.extend_from_slice(&chunk);
    }
    if bytes.len() > app_state.storage_service.dataport_size() {
        warn!("Payload of {} bytes exceeds dataport of {} bytes", bytes.len(), app_state.storage_service.dataport_size());
    }

    let written = app_state.storage_service.write(query.offset, query.size, &bytes)?;
    Ok(success(written))
}

pub async fn erase_handler(query: web::Query<RangeQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, StorageError> {
    log_mdc::insert("op", "erase");
    debug!("ERASE offset={} size={}", query.offset, query.size);

    let erased = app_state.storage_service.erase(query.offset, query.size)?;
    Ok(success(erased))
}

pub async fn size_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, StorageError> {
    log_mdc::insert("op", "size");
    Ok(success(app_state.storage_service.size()?))
}

pub async fn block_size_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, StorageError> {
    log_mdc::insert("op", "block_size");
    Ok(success(app_state.storage_service.block_size()?))
}

pub async fn state_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, StorageError> {
    log_mdc::insert("op", "state");
    let flags = app_state.storage_service.state()?;
    Ok(success(flags as u64))
}

pub async fn removal_handler(query: web::Query<RemovalQuery>, app_state: web::Data<AppState>) -> HttpResponse {
    log_mdc::insert("op", "trigger_removal");
    info!("Removal requested with budget {}", query.budget);

    app_state.storage_service.trigger_removal(query.budget);
    success(0)
}

pub async fn fingerprint_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, StorageError> {
    log_mdc::insert("op", "fingerprint");

    let fingerprint = app_state.storage_service.fingerprint()?;
    Ok(HttpResponse::Ok().json(FingerprintResponse {
        status: Status::Success,
        fingerprint,
    }))
}

/// Register the block-device call surface
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/storage/read", web::post().to(read_handler))
        .route("/storage/write", web::post().to(write_handler))
        .route("/storage/erase", web::post().to(erase_handler))
        .route("/storage/size", web::get().to(size_handler))
        .route("/storage/block-size", web::get().to(block_size_handler))
        .route("/storage/state", web::get().to(state_handler))
        .route("/storage/fingerprint", web::get().to(fingerprint_handler))
        .route("/disk/removal", web::post().to(removal_handler));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(StorageError::DeviceNotPresent.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(StorageError::OutOfBounds.status_code(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(StorageError::NotSupported.status_code(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(StorageError::Aborted.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_call_response_json() {
        let body = serde_json::to_value(CallResponse { status: Status::DeviceNotPresent, value: 0 }).unwrap();
        assert_eq!(body, serde_json::json!({"status": "DeviceNotPresent", "value": 0}));
    }
}
