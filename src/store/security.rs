use rusqlite::{Connection, Result, params};

use crate::model::SecurityRecord;

/// Reads the securities whose symbols the quote source can resolve, ordered by symbol.
pub fn read_securities(conn: &Connection, max_symbol_length: usize) -> Result<Vec<SecurityRecord>> {
    let mut stmt = conn.prepare(
        "SELECT zuniqueid, zsymbol
         FROM zsecurity
         WHERE LENGTH(zsymbol) <= ?1
         ORDER BY zsymbol",
    )?;
    let securities = stmt.query_map(params![max_symbol_length], |row| {
        Ok(SecurityRecord {
            id: row.get(0)?,
            symbol: row.get(1)?,
        })
    })?;

    securities.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support;

    #[test]
    fn reads_short_symbols_in_order() {
        let conn = test_support::store();
        test_support::add_security(&conn, "SEC-2", "MSFT");
        test_support::add_security(&conn, "SEC-1", "AAPL");
        test_support::add_security(&conn, "SEC-3", "VTSAX1");

        let securities = read_securities(&conn, 5).unwrap();

        assert_eq!(
            securities,
            vec![
                SecurityRecord { id: "SEC-1".into(), symbol: "AAPL".into() },
                SecurityRecord { id: "SEC-2".into(), symbol: "MSFT".into() },
            ]
        );
    }

    #[test]
    fn skips_securities_without_symbol() {
        let conn = test_support::store();
        conn.execute(
            "INSERT INTO zsecurity (zuniqueid, zsymbol) VALUES ('SEC-9', NULL)",
            [],
        )
        .unwrap();

        assert!(read_securities(&conn, 5).unwrap().is_empty());
    }

    #[test]
    fn empty_store_reads_nothing() {
        let conn = test_support::store();
        assert!(read_securities(&conn, 5).unwrap().is_empty());
    }

    #[test]
    fn missing_table_is_error() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(read_securities(&conn, 5).is_err());
    }
}
