//! Trade flow CSV loader
//!
//! Rows are validated individually: a row without a source, target, and
//! parseable date is dropped and counted, everything else is kept with
//! lenient numeric coercion. Flow weights and price differentials default
//! to zero when unparseable, prices stay absent. Region names on both
//! endpoints go through the normalizer.

use anyhow::Context;
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::regions::RegionNormalizer;
use crate::types::FlowRecord;

/// Column indexes resolved from the header row. Missing columns simply
/// yield missing fields, they do not fail the load.
struct Columns {
    source: Option<usize>,
    target: Option<usize>,
    date: Option<usize>,
    flow_weight: Option<usize>,
    price_differential: Option<usize>,
    source_price: Option<usize>,
    target_price: Option<usize>,
    commodity: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h == name);
        Self {
            source: find("source"),
            target: find("target"),
            date: find("date"),
            flow_weight: find("flow_weight"),
            price_differential: find("price_differential"),
            source_price: find("source_price"),
            target_price: find("target_price"),
            commodity: find("commodity"),
        }
    }
}

fn field<'r>(record: &'r StringRecord, index: Option<usize>) -> Option<&'r str> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Full-string float parse; non-finite values count as unparseable.
fn parse_f64(record: &StringRecord, index: Option<usize>) -> Option<f64> {
    field(record, index)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

pub(super) fn parse(
    raw: &str,
    normalizer: &RegionNormalizer,
) -> anyhow::Result<(Vec<FlowRecord>, usize, usize)> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(raw.as_bytes());

    let columns = Columns::from_headers(reader.headers().context("reading flow csv header")?);

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for (index, row) in reader.records().enumerate() {
        // Header occupies line one.
        let line = index + 2;
        let row = row.with_context(|| format!("reading flow csv line {}", line))?;

        let source = field(&row, columns.source);
        let target = field(&row, columns.target);
        let date = field(&row, columns.date).and_then(super::parse_date);
        let (Some(source), Some(target), Some(date)) = (source, target, date) else {
            debug!("flow row at line {} missing source/target/date, dropped", line);
            dropped += 1;
            continue;
        };

        records.push(FlowRecord {
            source: normalizer.normalize(source),
            target: normalizer.normalize(target),
            date,
            flow_weight: parse_f64(&row, columns.flow_weight)
                .unwrap_or(0.0)
                .max(0.0),
            price_differential: parse_f64(&row, columns.price_differential).unwrap_or(0.0),
            source_price: parse_f64(&row, columns.source_price),
            target_price: parse_f64(&row, columns.target_price),
            commodity: field(&row, columns.commodity).unwrap_or_default().to_string(),
        });
    }

    let kept = records.len();
    Ok((records, kept, dropped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "source,target,date,flow_weight,price_differential,source_lat,source_lng,target_lat,target_lng,source_price,target_price,commodity";

    fn parse_csv(raw: &str) -> (Vec<FlowRecord>, usize, usize) {
        parse(raw, &RegionNormalizer::new()).unwrap()
    }

    #[test]
    fn test_full_rows_parse_with_normalized_endpoints() {
        let raw = format!(
            "{HEADER}\n\
             Sana'a,Aden,2023-02-10,12.5,0.08,15.35,44.2,12.8,45.0,210.0,228.0,wheat\n\
             Taizz,Lahij,2023-02-11,3.0,-0.02,13.6,44.0,13.0,44.9,,,beans"
        );

        let (records, kept, dropped) = parse_csv(&raw);

        assert_eq!((kept, dropped), (2, 0));
        let first = &records[0];
        assert_eq!(first.source.as_str(), "sanaa");
        assert_eq!(first.target.as_str(), "aden");
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2023, 2, 10).unwrap());
        assert!((first.flow_weight - 12.5).abs() < 1e-9);
        assert_eq!(first.source_price, Some(210.0));
        assert_eq!(first.commodity, "wheat");

        let second = &records[1];
        assert_eq!(second.source.as_str(), "taiz");
        assert_eq!(second.target.as_str(), "lahj");
        assert_eq!(second.source_price, None);
        assert_eq!(second.target_price, None);
    }

    #[test]
    fn test_rows_missing_mandatory_fields_are_dropped() {
        let raw = format!(
            "{HEADER}\n\
             aden,,2023-02-10,1.0,0,,,,,,,wheat\n\
             ,taiz,2023-02-10,1.0,0,,,,,,,wheat\n\
             aden,taiz,not-a-date,1.0,0,,,,,,,wheat\n\
             aden,taiz,2023-02-12,1.0,0,,,,,,,wheat"
        );

        let (records, kept, dropped) = parse_csv(&raw);

        assert_eq!((kept, dropped), (1, 3));
        assert_eq!(records[0].source.as_str(), "aden");
    }

    #[test]
    fn test_lenient_numeric_coercion() {
        let raw = format!(
            "{HEADER}\n\
             aden,taiz,2023-02-10,garbage,n/a,,,,,abc,NaN,wheat\n\
             aden,taiz,2023-02-11,-4.0,-0.3,,,,,190.5,200.25,wheat"
        );

        let (records, ..) = parse_csv(&raw);

        // Unparseable weight and differential default to zero, prices to none.
        assert_eq!(records[0].flow_weight, 0.0);
        assert_eq!(records[0].price_differential, 0.0);
        assert_eq!(records[0].source_price, None);
        assert_eq!(records[0].target_price, None);

        // Negative weights clamp to zero, differentials keep their sign.
        assert_eq!(records[1].flow_weight, 0.0);
        assert!((records[1].price_differential + 0.3).abs() < 1e-9);
        assert_eq!(records[1].source_price, Some(190.5));
    }

    #[test]
    fn test_short_rows_and_missing_columns_degrade_to_drops() {
        // No price columns at all, plus a truncated row.
        let raw = "source,target,date,flow_weight\n\
                   aden,taiz,2023-02-10,5.0\n\
                   aden";

        let (records, kept, dropped) = parse_csv(raw);

        assert_eq!((kept, dropped), (1, 1));
        assert_eq!(records[0].source_price, None);
        assert!((records[0].flow_weight - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_header_only_input_is_empty_not_an_error() {
        let (records, kept, dropped) = parse_csv(HEADER);
        assert!(records.is_empty());
        assert_eq!((kept, dropped), (0, 0));
    }

    #[test]
    fn test_free_text_degrades_to_dropped_rows() {
        let (records, _, dropped) = parse_csv("this is\nnot a flow,file\nat all");
        assert!(records.is_empty());
        assert_eq!(dropped, 2);
    }
}
