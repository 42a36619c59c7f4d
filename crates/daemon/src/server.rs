// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface over the table and the transaction log
//!
//! Every mutation is applied to the table first and then enqueued on the
//! logger; reads only touch the table.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::put;
use axum::Router;
use kv_core::{LogError, Table, TableError, TransactionLogger};
use thiserror::Error;
use tracing::{debug, error};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<Table>,
    pub logger: Arc<dyn TransactionLogger>,
}

/// Errors a request can end in
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("transaction log: {0}")]
    Log(#[from] LogError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Table(TableError::NoSuchKey(_)) => StatusCode::NOT_FOUND,
            ApiError::Table(TableError::EmptyKey) => StatusCode::BAD_REQUEST,
            ApiError::Log(LogError::EmptyKey) => StatusCode::BAD_REQUEST,
            ApiError::Log(e) => {
                error!(error = %e, "request failed in transaction log");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, format!("{}\n", self)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/:key",
            put(put_value).get(get_value).delete(delete_value),
        )
        .with_state(state)
}

async fn put_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
    value: String,
) -> Result<StatusCode, ApiError> {
    // Not atomic with the enqueue: concurrent writers to one key may reach
    // the log in a different order than the table
    state.table.put(&key, &value)?;
    state.logger.write_put(&key, &value).await?;
    debug!(%key, bytes = value.len(), "PUT");
    Ok(StatusCode::CREATED)
}

async fn get_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<String, ApiError> {
    let value = state.table.get(&key)?;
    debug!(%key, "GET");
    Ok(value)
}

async fn delete_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.table.delete(&key)?;
    state.logger.write_delete(&key).await?;
    debug!(%key, "DELETE");
    Ok(StatusCode::OK)
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
