//! Template helper functions
//!
//! Registered on both template engines, as functions and (where the first
//! argument reads as the subject) as filters:
//! `{{ format_int(total) }}` or `{{ total|format_int }}`.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use minijinja::value::Value;
use minijinja::{Environment, Error, ErrorKind};

use crate::http::query::rewrite_query;

const MINUTE: f64 = 60.0;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;
const YEAR: f64 = 365.0 * DAY;

/// Register every helper on `env`
pub fn register(env: &mut Environment<'static>) {
    env.add_function("approx_duration", approx_duration);
    env.add_function("incr", incr);
    env.add_function("decr", decr);
    env.add_function("format_float", format_float);
    env.add_function("format_int", format_int);
    env.add_function("format_time", format_time);
    env.add_function("pluralize", pluralize);
    env.add_function("slugify", slugify);
    env.add_function("yesno", yesno);
    env.add_function("url_set_param", url_set_param);
    env.add_function("url_del_param", url_del_param);

    env.add_filter("approx_duration", approx_duration);
    env.add_filter("format_float", format_float);
    env.add_filter("format_int", format_int);
    env.add_filter("format_time", format_time);
    env.add_filter("pluralize", pluralize);
    env.add_filter("slugify", slugify);
    env.add_filter("yesno", yesno);
}

/// Integer from an integer value or a numeric string
fn to_i64(value: &Value) -> Result<i64, Error> {
    if let Some(s) = value.as_str() {
        return s.trim().parse().map_err(|e| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("cannot convert {s:?} to an integer: {e}"),
            )
        });
    }
    i64::try_from(value.clone()).map_err(|_| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("cannot convert {value} to an integer"),
        )
    })
}

/// Rough human duration for a number of seconds, e.g. `2 hours`
pub fn approx_duration(seconds: f64) -> String {
    fn unit(n: f64, name: &str) -> String {
        // Whole units only
        #[allow(clippy::cast_possible_truncation)]
        let n = n.floor() as i64;
        if n == 1 {
            format!("1 {name}")
        } else {
            format!("{n} {name}s")
        }
    }

    let seconds = seconds.abs();
    if seconds < 1.0 {
        "less than 1 second".to_string()
    } else if seconds < MINUTE {
        unit(seconds, "second")
    } else if seconds < HOUR {
        unit(seconds / MINUTE, "minute")
    } else if seconds < DAY {
        unit(seconds / HOUR, "hour")
    } else if seconds < YEAR {
        unit(seconds / DAY, "day")
    } else {
        unit(seconds / YEAR, "year")
    }
}

pub fn incr(value: Value) -> Result<i64, Error> {
    to_i64(&value)?
        .checked_add(1)
        .ok_or_else(|| overflow("incr", &value))
}

pub fn decr(value: Value) -> Result<i64, Error> {
    to_i64(&value)?
        .checked_sub(1)
        .ok_or_else(|| overflow("decr", &value))
}

fn overflow(name: &str, value: &Value) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("{name}({value}) overflows a 64-bit integer"),
    )
}

/// Float with `dp` decimal places
pub fn format_float(value: f64, dp: Option<usize>) -> String {
    format!("{value:.prec$}", prec = dp.unwrap_or(2))
}

/// Integer with `,` thousands separators
pub fn format_int(value: Value) -> Result<String, Error> {
    let n = to_i64(&value)?;
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    Ok(out)
}

/// Format an RFC 3339 string or Unix timestamp (seconds) with a strftime pattern
pub fn format_time(value: Value, format: String) -> Result<String, Error> {
    let time: DateTime<Utc> = if let Some(s) = value.as_str() {
        DateTime::parse_from_rfc3339(s)
            .map_err(|e| {
                Error::new(
                    ErrorKind::InvalidOperation,
                    format!("invalid timestamp {s:?}: {e}"),
                )
            })?
            .with_timezone(&Utc)
    } else {
        let secs = to_i64(&value)?;
        DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("timestamp {secs} out of range"),
            )
        })?
    };

    let mut out = String::new();
    write!(out, "{}", time.format(&format)).map_err(|_| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("invalid time format {format:?}"),
        )
    })?;
    Ok(out)
}

pub fn pluralize(count: Value, singular: String, plural: String) -> Result<String, Error> {
    Ok(if to_i64(&count)? == 1 { singular } else { plural })
}

/// Lowercase ASCII slug: runs of other characters collapse into one `-`
pub fn slugify(value: String) -> String {
    let mut slug = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

pub fn yesno(value: bool) -> String {
    let word = if value { "Yes" } else { "No" };
    word.to_string()
}

/// `url` with `key` set to `value`, replacing existing values
pub fn url_set_param(url: String, key: String, value: Value) -> String {
    rewrite_query(&url, |query| {
        query.insert(key, vec![value.to_string()]);
    })
}

/// `url` without `key`
pub fn url_del_param(url: String, key: String) -> String {
    rewrite_query(&url, |query| {
        query.remove(&key);
    })
}
