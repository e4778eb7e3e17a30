// SPDX-FileCopyrightText: 2026 Dialflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL migration files are compiled into the binary at build time via
//! `embed_migrations!`. Migrations run automatically on database open.

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection, from inside a
/// `tokio_rusqlite` call closure, so errors must be
/// `rusqlite::Error`-compatible. Refinery tracks applied migrations in its
/// own `refinery_schema_history` table.
pub(crate) fn run_migrations_sync(
    conn: &mut rusqlite::Connection,
) -> Result<(), rusqlite::Error> {
    embedded::migrations::runner().run(conn).map_err(|e| {
        rusqlite::Error::ToSqlConversionFailure(Box::new(e))
    })?;
    Ok(())
}
