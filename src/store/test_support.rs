//! In-memory store carrying the parts of the host schema the sync touches.

use rusqlite::{Connection, OptionalExtension, params};

use crate::{constants, model::Amount};

const SCHEMA: &str = "
    CREATE TABLE zsecurity (
        z_pk INTEGER PRIMARY KEY,
        zuniqueid VARCHAR,
        zsymbol VARCHAR
    );
    CREATE TABLE zprice (
        z_pk INTEGER PRIMARY KEY,
        z_ent INTEGER,
        z_opt INTEGER,
        zdate TIMESTAMP,
        zsecurityid VARCHAR,
        zvolume INTEGER,
        zclosingprice DECIMAL,
        zhighprice DECIMAL,
        zlowprice DECIMAL,
        zopeningprice DECIMAL
    );
    CREATE TABLE z_primarykey (
        z_ent INTEGER PRIMARY KEY,
        z_name VARCHAR,
        z_super INTEGER,
        z_max INTEGER
    );
    INSERT INTO z_primarykey (z_ent, z_name, z_super, z_max) VALUES (42, 'Price', 0, 0);
    INSERT INTO z_primarykey (z_ent, z_name, z_super, z_max) VALUES (43, 'Security', 0, 0);
";

#[derive(Debug, PartialEq)]
pub struct StoredPrice {
    pub open: Amount,
    pub high: Amount,
    pub low: Amount,
    pub close: Amount,
    pub volume: i64,
}

pub fn store() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn
}

pub fn add_security(conn: &Connection, id: &str, symbol: &str) {
    conn.execute(
        "INSERT INTO zsecurity (zuniqueid, zsymbol) VALUES (?1, ?2)",
        params![id, symbol],
    )
    .unwrap();
}

pub fn price(conn: &Connection, security_id: &str, encoded_date: i64) -> Option<StoredPrice> {
    conn.query_row(
        "SELECT zopeningprice, zhighprice, zlowprice, zclosingprice, zvolume
         FROM zprice
         WHERE z_ent = ?1 AND z_opt = ?2 AND zdate = ?3 AND zsecurityid = ?4",
        params![
            constants::PRICE_ENT,
            constants::PRICE_OPT,
            encoded_date,
            security_id
        ],
        |row| {
            Ok(StoredPrice {
                open: row.get(0)?,
                high: row.get(1)?,
                low: row.get(2)?,
                close: row.get(3)?,
                volume: row.get(4)?,
            })
        },
    )
    .optional()
    .unwrap()
}

pub fn price_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM zprice", [], |row| row.get(0))
        .unwrap()
}

pub fn price_key_max(conn: &Connection) -> Option<i64> {
    conn.query_row(
        "SELECT z_max FROM z_primarykey WHERE z_name = 'Price'",
        [],
        |row| row.get(0),
    )
    .unwrap()
}
