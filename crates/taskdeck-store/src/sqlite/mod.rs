//! `SQLite` layer: connection pool, schema migrations, and stateless
//! repositories that take a `&Connection`.

pub mod connection;
pub mod migrations;
pub mod repositories;
