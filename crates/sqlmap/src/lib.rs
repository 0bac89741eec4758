//! `sqlmap`: execution core of a SQL-mapping data-access layer over `LibSQL`
//!
//! Mapper interfaces declare methods; each method is bound once to a registered
//! statement and to the result shape its caller expects. Calls run through a session
//! whose executor reuses prepared statements within the session's transaction, and
//! select results may be served from bounded, transaction-aware namespace caches.
pub mod binding;
pub mod cache;
pub mod config;
pub mod configuration;
pub mod connection;
pub mod constants;
pub mod cursor;
pub mod decode;
pub mod error;
pub mod executor;
pub mod mapping;
pub mod models;
pub mod reflection;
pub mod session;
pub mod statement;
pub mod store;
pub mod transaction;
pub mod utils;

// Re-export the types most callers need
pub use binding::{
    Argument, ElementType, MapperInterface, MapperResult, MethodDecl, ParamDecl, ParamMap,
    PrimitiveKind, ReturnType,
};
pub use config::Settings;
pub use configuration::Configuration;
pub use cursor::RowCursor;
pub use error::{ErrorKind, MapperError, Result};
pub use mapping::{MappedStatement, ParameterMapping, ParameterObject, SqlCommandType};
pub use models::*;
pub use session::{SqlSession, SqlSessionFactory};

#[cfg(test)]
mod tests;
