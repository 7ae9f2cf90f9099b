//! MongoDB Database Engine
//!
//! MongoDB realization of [`DatabaseClient`](crate::database::DatabaseClient)
//! and the mapping of driver failures onto [`DbError`].

pub mod client;
pub mod config;
mod convert;

pub use client::MongoClient;
pub use config::{MongoConfig, MongoConnectionOptions};

use crate::database::types::BackendType;
use crate::error::DbError;
use mongodb::error::{Error as MongoError, ErrorKind as MongoErrorKind, WriteFailure};

/// Server error codes reported for unique index violations
const DUPLICATE_KEY_CODES: [i32; 3] = [11000, 11001, 12582];

fn is_duplicate_key(code: i32) -> bool {
    DUPLICATE_KEY_CODES.contains(&code)
}

/// MongoDB specific error conversion
///
/// Infrastructure faults are checked before write faults; anything else is
/// passed through untouched.
pub(crate) fn convert_mongodb_error(err: MongoError) -> DbError {
    let classified = match err.kind.as_ref() {
        MongoErrorKind::Command(_)
        | MongoErrorKind::Io(_)
        | MongoErrorKind::ServerSelection { .. }
        | MongoErrorKind::ConnectionPoolCleared { .. }
        | MongoErrorKind::Authentication { .. } => Some(DbError::Connection {
            backend: BackendType::Mongo,
        }),
        MongoErrorKind::Write(WriteFailure::WriteError(write_error))
            if is_duplicate_key(write_error.code) =>
        {
            Some(DbError::already_exists())
        }
        MongoErrorKind::InsertMany(failure)
            if failure
                .write_errors
                .as_ref()
                .is_some_and(|errors| errors.iter().any(|e| is_duplicate_key(e.code))) =>
        {
            Some(DbError::already_exists())
        }
        _ => None,
    };

    classified.unwrap_or_else(|| DbError::backend(BackendType::Mongo, err))
}

/// Number of leading documents an ordered insert stored before failing.
///
/// `failed` lists the indexes the server rejected; an ordered insert stops at
/// the first of them. No indexed failure means every document was stored.
pub(crate) fn stored_prefix(failed: impl IntoIterator<Item = usize>, total: usize) -> usize {
    failed.into_iter().min().unwrap_or(total).min(total)
}

/// Stored prefix length for a failed `insert_many`.
///
/// `None` when the driver gives no per-document outcome (I/O fault, server
/// selection, a later batch failing), so the stored subset must be looked up.
pub(crate) fn stored_prefix_for(err: &MongoError, total: usize) -> Option<usize> {
    match err.kind.as_ref() {
        MongoErrorKind::InsertMany(failure) => Some(match failure.write_errors.as_ref() {
            Some(errors) => stored_prefix(errors.iter().map(|e| e.index), total),
            None => total,
        }),
        _ => None,
    }
}
