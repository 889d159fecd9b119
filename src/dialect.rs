//! SQL dialect capabilities — identifier quoting and literal escaping.
//!
//! Two quoting schemes coexist in a migration: the source speaks
//! PostgreSQL (double-quoted identifiers) and the target speaks
//! MariaDB/MySQL (backticks). Rather than scattering free quoting
//! functions, every SQL builder takes a [`Dialect`] and asks it.

/// The SQL dialect a statement is being built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
}

impl Dialect {
    /// Quote a single identifier, escaping embedded quote characters by
    /// doubling them.
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Dialect::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
        }
    }

    /// Quote a `schema.table` pair. The MySQL target is a flat namespace,
    /// so only the table part is quoted there.
    pub fn qualify(&self, schema: &str, table: &str) -> String {
        match self {
            Dialect::Postgres => format!("{}.{}", self.quote_ident(schema), self.quote_ident(table)),
            Dialect::MySql => self.quote_ident(table),
        }
    }

    /// Render a string as a single-quoted SQL literal.
    ///
    /// Both engines accept doubled single quotes; MySQL additionally
    /// treats backslash as an escape character, so it is doubled too.
    pub fn quote_literal(&self, value: &str) -> String {
        let escaped = match self {
            Dialect::Postgres => value.replace('\'', "''"),
            Dialect::MySql => value.replace('\\', "\\\\").replace('\'', "''"),
        };
        format!("'{}'", escaped)
    }

    /// Join and quote a column list: `"a", "b"` / `` `a`, `b` ``.
    pub fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
