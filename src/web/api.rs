// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register API endpoints
//!
//! - `GET /api/state`: copy of the four tables plus `dataPoints` and `unitId`
//! - `POST /api/write`: overwrite a contiguous range of one table
//!
//! The write payload is parsed by hand rather than through a typed `Json<T>`
//! guard so that each malformed field gets its own error message.

use std::sync::Arc;

use log::warn;
use rocket::http::Status;
use rocket::response::{self, status, Responder};
use rocket::serde::json::{Json, Value};
use rocket::{get, post, Request, State};
use serde::Serialize;

use crate::registers::{InstrumentedAccessor, RegisterTable, StoreError, StoreSnapshot};

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
}

impl ErrorBody {
    pub fn new(status: Status, error: impl Into<String>) -> status::Custom<Json<ErrorBody>> {
        status::Custom(
            status,
            Json(ErrorBody {
                error: error.into(),
                status: status.code,
            }),
        )
    }
}

/// Errors returned by the API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn malformed(message: &str) -> Self {
        ApiError::MalformedPayload(message.to_string())
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::MalformedPayload(_) => Status::BadRequest,
            ApiError::Store(StoreError::InvalidConfiguration(_)) => Status::InternalServerError,
            ApiError::Store(_) => Status::BadRequest,
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        warn!("Rejected {} {}: {}", req.method(), req.uri(), self);
        ErrorBody::new(status, self.to_string()).respond_to(req)
    }
}

/// A validated `POST /api/write` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub table: RegisterTable,
    pub address: usize,
    pub values: Vec<u16>,
}

impl WriteRequest {
    /// Validate a raw request body.
    ///
    /// Checks run in a fixed order and the first failure is reported: JSON
    /// syntax, object shape, table name, address, values list, value types,
    /// value range. Range checks against the store happen later, in the
    /// accessor.
    pub fn parse(body: &[u8]) -> Result<Self, ApiError> {
        let payload: Value =
            serde_json::from_slice(body).map_err(|_| ApiError::malformed("Invalid JSON payload"))?;
        let object = payload
            .as_object()
            .ok_or_else(|| ApiError::malformed("Payload must be a JSON object"))?;

        let table = object
            .get("table")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .parse::<RegisterTable>()?;

        // Addresses beyond usize saturate and fail the accessor's range check
        let address = match object.get("address").map(|a| (a.as_u64(), a.as_i64())) {
            Some((Some(address), _)) => usize::try_from(address).unwrap_or(usize::MAX),
            Some((None, Some(_))) => {
                return Err(ApiError::malformed("Address must be non-negative"));
            }
            _ => return Err(ApiError::malformed("Address must be an integer")),
        };

        let raw_values = object
            .get("values")
            .and_then(Value::as_array)
            .ok_or_else(|| ApiError::malformed("Values must be a list"))?;
        if raw_values.iter().any(|v| !(v.is_u64() || v.is_i64())) {
            return Err(ApiError::malformed("Values must be integers"));
        }
        let values = raw_values
            .iter()
            .map(|v| v.as_u64().and_then(|v| u16::try_from(v).ok()))
            .collect::<Option<Vec<u16>>>()
            .ok_or_else(|| ApiError::malformed("Values must be between 0 and 65535"))?;

        Ok(WriteRequest {
            table,
            address,
            values,
        })
    }
}

/// Current contents of every table.
#[get("/api/state")]
pub fn get_state(accessor: &State<Arc<InstrumentedAccessor>>) -> Json<StoreSnapshot> {
    Json(accessor.snapshot())
}

/// Overwrite a range of one table.
///
/// Body: `{"table": "holding_registers", "address": 2, "values": [42]}`
#[post("/api/write", data = "<body>")]
pub fn post_write(
    accessor: &State<Arc<InstrumentedAccessor>>,
    body: Vec<u8>,
) -> Result<Json<Value>, ApiError> {
    let request = WriteRequest::parse(&body)?;
    accessor.write(request.table, request.address, &request.values)?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(body: &str) -> String {
        WriteRequest::parse(body.as_bytes()).unwrap_err().to_string()
    }

    #[test]
    fn parses_a_valid_request() {
        let request =
            WriteRequest::parse(br#"{"table":"coils","address":3,"values":[1,0,1]}"#).unwrap();
        assert_eq!(
            request,
            WriteRequest {
                table: RegisterTable::Coils,
                address: 3,
                values: vec![1, 0, 1],
            }
        );
    }

    #[test]
    fn empty_values_are_accepted() {
        let request = WriteRequest::parse(br#"{"table":"coils","address":0,"values":[]}"#).unwrap();
        assert!(request.values.is_empty());
    }

    #[test]
    fn reports_the_first_failing_check() {
        assert_eq!(parse_err("{not json"), "Invalid JSON payload");
        assert_eq!(
            WriteRequest::parse(b"\xff\xfe{}").unwrap_err().to_string(),
            "Invalid JSON payload"
        );
        assert_eq!(parse_err("[1, 2]"), "Payload must be a JSON object");
        assert_eq!(parse_err(r#"{"table":"unknown","address":"x"}"#), "Unknown table");
        assert_eq!(parse_err(r#"{"address":0,"values":[1]}"#), "Unknown table");
        assert_eq!(
            parse_err(r#"{"table":"coils","address":"1","values":[1]}"#),
            "Address must be an integer"
        );
        assert_eq!(
            parse_err(r#"{"table":"coils","address":1.5,"values":[1]}"#),
            "Address must be an integer"
        );
        assert_eq!(
            parse_err(r#"{"table":"coils","address":-1,"values":[1]}"#),
            "Address must be non-negative"
        );
        assert_eq!(
            parse_err(r#"{"table":"coils","address":0,"values":1}"#),
            "Values must be a list"
        );
        assert_eq!(
            parse_err(r#"{"table":"coils","address":0,"values":[1,"a"]}"#),
            "Values must be integers"
        );
        assert_eq!(
            parse_err(r#"{"table":"holding_registers","address":0,"values":[65536]}"#),
            "Values must be between 0 and 65535"
        );
        assert_eq!(
            parse_err(r#"{"table":"holding_registers","address":0,"values":[-1]}"#),
            "Values must be between 0 and 65535"
        );
    }

    #[test]
    fn store_errors_are_client_errors() {
        let err = ApiError::from(StoreError::UnknownTable("x".to_string()));
        assert_eq!(err.status(), Status::BadRequest);
        assert_eq!(ApiError::malformed("x").status(), Status::BadRequest);
    }
}
