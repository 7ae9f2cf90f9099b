//! Database Engines Module
//!
//! Backend adapters implementing the shared client contract

#[cfg(feature = "mongodb-backend")]
pub mod mongodb;

#[cfg(feature = "mongodb-backend")]
pub use self::mongodb::MongoClient;
