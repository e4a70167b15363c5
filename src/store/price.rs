use rusqlite::{Connection, Result, params};

use crate::{
    constants::{PRICE_ENT, PRICE_ENTITY_NAME, PRICE_OPT},
    model::{PriceQuote, SecurityRecord, UpsertOutcome},
};

/// Writes `quote` as the price of `security` on the quote's date.
///
/// The row keyed by (entity, option, date, security) is updated in place when
/// it exists, otherwise a new row is inserted, so a day never gets two rows.
pub fn upsert_price(
    conn: &Connection,
    security: &SecurityRecord,
    quote: &PriceQuote,
) -> Result<UpsertOutcome> {
    let date = quote.date.encoded();

    let updated = conn
        .prepare_cached(
            "UPDATE zprice
             SET
                zvolume = ?1,
                zclosingprice = ?2,
                zhighprice = ?3,
                zlowprice = ?4,
                zopeningprice = ?5
             WHERE
                z_ent = ?6 AND z_opt = ?7 AND
                zdate = ?8 AND zsecurityid = ?9",
        )?
        .execute(params![
            quote.volume,
            quote.close,
            quote.high,
            quote.low,
            quote.open,
            PRICE_ENT,
            PRICE_OPT,
            date,
            security.id,
        ])?;
    if updated > 0 {
        log::debug!("Existing entry for {} updated", security.symbol);
        return Ok(UpsertOutcome::Updated);
    }

    conn.prepare_cached(
        "INSERT INTO zprice (
            z_ent, z_opt, zdate, zsecurityid,
            zvolume, zclosingprice, zhighprice, zlowprice, zopeningprice
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?
    .execute(params![
        PRICE_ENT,
        PRICE_OPT,
        date,
        security.id,
        quote.volume,
        quote.close,
        quote.high,
        quote.low,
        quote.open,
    ])?;
    log::debug!("New entry for {} created", security.symbol);
    Ok(UpsertOutcome::Inserted)
}

/// Brings the price entity's key counter in line with the price table.
pub fn update_primary_key(conn: &Connection) -> Result<()> {
    conn.execute(
        "UPDATE z_primarykey
         SET z_max = (SELECT MAX(z_pk) FROM zprice)
         WHERE z_name = ?1",
        params![PRICE_ENTITY_NAME],
    )?;
    log::debug!("Primary key for price updated");
    Ok(())
}
