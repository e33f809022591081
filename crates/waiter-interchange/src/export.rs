use std::io::Write;

use serde::Serialize;
use waiter_core::Order;

use crate::InterchangeError;

pub const EXPORT_HEADER: [&str; 7] = ["id", "status", "waiter", "start", "end", "arguments", "error"];

/// One exported line. Field order is the header order; None becomes an empty field.
#[derive(Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    status: &'static str,
    waiter: Option<&'a str>,
    start: Option<f64>,
    end: Option<f64>,
    /// JSON array so argument boundaries survive the round trip.
    arguments: String,
    error: Option<&'a str>,
}

pub fn write_orders<W: Write>(writer: W, orders: &[Order]) -> Result<(), InterchangeError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(EXPORT_HEADER)?;
    for o in orders {
        wtr.serialize(ExportRow {
            id: o.id.as_str(),
            status: o.status.as_str(),
            waiter: o.waiter.as_deref(),
            start: o.start,
            end: o.end,
            arguments: serde_json::to_string(&o.arguments)?,
            error: o.error.as_deref(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
