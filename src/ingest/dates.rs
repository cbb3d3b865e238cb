// src/ingest/dates.rs

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::catalog::Frequency;
use crate::table::{Table, Value};

use super::{DATE_COLUMN, PERIOD_COLUMN, YEAR_COLUMN};

static PERIOD_RE: OnceLock<Regex> = OnceLock::new();

fn period_re() -> &'static Regex {
    PERIOD_RE.get_or_init(|| Regex::new(r"^([MQ])(\d{2})$").expect("period pattern is valid"))
}

/// Map a period code and year to a canonical calendar date.
///
/// Anchoring convention (declared, not inferred from data): monthly periods
/// anchor to the first day of the month; the annual-average period `M13`
/// anchors to December 31 so it sorts after every month of its year;
/// quarterly periods anchor to the first day of the quarter's last month
/// (`Q01`→03-01, `Q02`→06-01, `Q03`→09-01, `Q04`→12-01).
///
/// Unrecognized codes yield `None` so one malformed row never aborts a batch;
/// callers count the failures.
pub fn period_to_date(period: &str, year: i32, frequency: Frequency) -> Option<NaiveDate> {
    let caps = period_re().captures(period.trim())?;
    let marker = &caps[1];
    let number: u32 = caps[2].parse().ok()?;
    match frequency {
        Frequency::Monthly if marker == "M" => match number {
            13 => NaiveDate::from_ymd_opt(year, 12, 31),
            1..=12 => NaiveDate::from_ymd_opt(year, number, 1),
            _ => None,
        },
        Frequency::Quarterly if marker == "Q" => match number {
            1..=4 => NaiveDate::from_ymd_opt(year, number * 3, 1),
            _ => None,
        },
        _ => None,
    }
}

/// Append a `date` column derived row-wise from the `year` and `period`
/// columns. Rows that cannot be dated keep a null date and are counted, never
/// dropped. Returns the failure count.
pub fn derive_dates(table: &mut Table, frequency: Frequency) -> usize {
    let year_idx = table.column_index(YEAR_COLUMN);
    let period_idx = table.column_index(PERIOD_COLUMN);
    table.headers.push(DATE_COLUMN.to_string());

    let mut failures = 0usize;
    for row in &mut table.rows {
        let date = match (year_idx, period_idx) {
            (Some(y), Some(p)) => {
                let year = row
                    .get(y)
                    .and_then(Value::as_str)
                    .and_then(|s| s.trim().parse::<i32>().ok());
                let period = row.get(p).and_then(Value::as_str);
                match (year, period) {
                    (Some(year), Some(period)) => period_to_date(period, year, frequency),
                    _ => None,
                }
            }
            _ => None,
        };
        match date {
            Some(d) => row.push(Value::Date(d)),
            None => {
                failures += 1;
                row.push(Value::Null);
            }
        }
    }
    failures
}
