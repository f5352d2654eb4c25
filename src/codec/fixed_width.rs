//! Generic fixed-width decoding and encoding driven by a [`Layout`]

use bigdecimal::num_bigint::BigInt;
use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use super::{
    CodecError, CodecResult, DecodedLine, FieldDescriptor, FieldType, FieldValue, Layout,
    LineError, LineErrorReason, ParsedLine, Record, RecordLayout,
};

/// Line terminator written by [`encode`]
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

type LineSplit<'a> = std::slice::Split<'a, u8, fn(&u8) -> bool>;

fn is_newline(byte: &u8) -> bool {
    *byte == b'\n'
}

/// Lazy sequence of decoded lines
///
/// Cloning the iterator restarts decoding from the clone's position; a bad
/// line yields an `Err` item and decoding continues with the next line.
#[derive(Clone)]
pub struct DecodedLines<'a> {
    layout: &'a Layout,
    lines: std::iter::Enumerate<LineSplit<'a>>,
}

impl Iterator for DecodedLines<'_> {
    type Item = DecodedLine;

    fn next(&mut self) -> Option<Self::Item> {
        for (index, raw_line) in self.lines.by_ref() {
            let line = raw_line.strip_suffix(b"\r").unwrap_or(raw_line);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Some(decode_line(index + 1, line, self.layout));
        }
        None
    }
}

/// Decode raw file bytes against a layout
///
/// Lines are split on `\n` (a trailing `\r` is dropped); blank lines are
/// skipped but still count towards line numbering.
pub fn decode<'a>(raw: &'a [u8], layout: &'a Layout) -> DecodedLines<'a> {
    let split: LineSplit<'a> = raw.split(is_newline as fn(&u8) -> bool);
    DecodedLines {
        layout,
        lines: split.enumerate(),
    }
}

/// Decode a single line
pub fn decode_line(line_index: usize, line: &[u8], layout: &Layout) -> DecodedLine {
    let mut expected_length = None;

    for record in &layout.records {
        if !record.matches_discriminant(line) {
            continue;
        }
        if line.len() != record.line_length {
            expected_length.get_or_insert(record.line_length);
            continue;
        }
        return decode_fields(line_index, line, record);
    }

    let reason = match expected_length {
        Some(expected) => LineErrorReason::LineLengthMismatch {
            expected,
            actual: line.len(),
        },
        None => LineErrorReason::UnknownRecordType,
    };
    Err(LineError::new(line_index, reason))
}

fn decode_fields(line_index: usize, line: &[u8], record: &RecordLayout) -> DecodedLine {
    let mut fields = BTreeMap::new();

    for descriptor in &record.fields {
        let raw = line.get(descriptor.start..descriptor.end()).ok_or_else(|| {
            LineError::new(
                line_index,
                LineErrorReason::InvalidField {
                    field: descriptor.name.clone(),
                    message: "field lies outside the line".to_string(),
                },
            )
        })?;
        let value = decode_field(descriptor, raw).map_err(|message| {
            LineError::new(
                line_index,
                LineErrorReason::InvalidField {
                    field: descriptor.name.clone(),
                    message,
                },
            )
        })?;
        fields.insert(descriptor.name.clone(), value);
    }

    Ok(ParsedLine {
        line_index,
        raw_length: line.len(),
        record: Record {
            record_type: record.name.clone(),
            fields,
        },
    })
}

/// Bank files are Latin-1; every byte maps to one char
fn latin1(raw: &[u8]) -> String {
    raw.iter().map(|&b| b as char).collect()
}

fn digits(raw: &[u8]) -> Result<&[u8], String> {
    if raw.iter().all(u8::is_ascii_digit) {
        Ok(raw)
    } else {
        Err(format!("expected digits, found '{}'", latin1(raw)))
    }
}

fn decode_field(descriptor: &FieldDescriptor, raw: &[u8]) -> Result<FieldValue, String> {
    match descriptor.field_type {
        FieldType::Text => Ok(FieldValue::Text(latin1(raw).trim().to_string())),
        FieldType::Integer => {
            let text = latin1(digits(raw)?);
            text.parse::<u64>()
                .map(FieldValue::Integer)
                .map_err(|e| e.to_string())
        }
        FieldType::Decimal { scale } => {
            let units = BigInt::parse_bytes(digits(raw)?, 10)
                .ok_or_else(|| "unparseable amount".to_string())?;
            Ok(FieldValue::Decimal(BigDecimal::new(units, i64::from(scale))))
        }
        FieldType::Date => {
            if raw.iter().all(|&b| b == b'0' || b == b' ') {
                return Ok(FieldValue::Date(None));
            }
            let text = latin1(digits(raw)?);
            let day = text[0..2].parse::<u32>().map_err(|e| e.to_string())?;
            let month = text[2..4].parse::<u32>().map_err(|e| e.to_string())?;
            let year = text[4..8].parse::<i32>().map_err(|e| e.to_string())?;
            NaiveDate::from_ymd_opt(year, month, day)
                .map(|date| FieldValue::Date(Some(date)))
                .ok_or_else(|| format!("'{}' is not a calendar date", text))
        }
    }
}

/// Encode records into raw file bytes
///
/// Numeric fields are left-padded with zeros, text is right-padded with
/// spaces and undeclared gaps are filled with spaces. A value that does not
/// fit its declared width fails the whole batch with
/// [`CodecError::FieldOverflow`]. The layout is validated first.
pub fn encode(records: &[Record], layout: &Layout) -> CodecResult<Vec<u8>> {
    layout.validate()?;
    let mut output = Vec::new();

    for record in records {
        let record_layout = layout
            .record(&record.record_type)
            .ok_or_else(|| CodecError::UnknownRecordType(record.record_type.clone()))?;
        output.extend_from_slice(&write_record(record, record_layout)?);
        output.extend_from_slice(LINE_TERMINATOR);
    }

    Ok(output)
}

/// Encode one record into a single line without terminator
pub fn encode_record(record: &Record, layout: &RecordLayout) -> CodecResult<Vec<u8>> {
    layout.validate()?;
    write_record(record, layout)
}

fn write_record(record: &Record, layout: &RecordLayout) -> CodecResult<Vec<u8>> {
    if let Some(name) = record.fields.keys().find(|name| layout.field(name).is_none()) {
        return Err(CodecError::UnknownField {
            record_type: record.record_type.clone(),
            field: name.clone(),
        });
    }

    let mut line = vec![b' '; layout.line_length];

    for descriptor in &layout.fields {
        let bytes = encode_field(descriptor, record.get(&descriptor.name))?;
        if bytes.len() != descriptor.length {
            return Err(overflow(descriptor, latin1(&bytes)));
        }
        line[descriptor.start..descriptor.end()].copy_from_slice(&bytes);
    }

    if let Some(d) = &layout.discriminant {
        line[d.offset..d.end()].copy_from_slice(d.code.as_bytes());
    }

    Ok(line)
}

fn overflow(descriptor: &FieldDescriptor, value: String) -> CodecError {
    CodecError::FieldOverflow {
        field: descriptor.name.clone(),
        width: descriptor.length,
        value,
    }
}

fn invalid(descriptor: &FieldDescriptor, message: String) -> CodecError {
    CodecError::InvalidValue {
        field: descriptor.name.clone(),
        message,
    }
}

fn zero_padded(descriptor: &FieldDescriptor, digits: String) -> CodecResult<Vec<u8>> {
    if digits.len() > descriptor.length {
        return Err(overflow(descriptor, digits));
    }
    Ok(format!("{:0>width$}", digits, width = descriptor.length).into_bytes())
}

fn encode_field(descriptor: &FieldDescriptor, value: Option<&FieldValue>) -> CodecResult<Vec<u8>> {
    match (descriptor.field_type, value) {
        (FieldType::Text, None) => Ok(vec![b' '; descriptor.length]),
        (FieldType::Integer | FieldType::Decimal { .. } | FieldType::Date, None) => {
            Ok(vec![b'0'; descriptor.length])
        }
        (FieldType::Text, Some(FieldValue::Text(text))) => {
            let mut bytes = Vec::with_capacity(descriptor.length);
            for c in text.chars() {
                if c.is_control() {
                    return Err(invalid(
                        descriptor,
                        format!("control character {:?} cannot be written", c),
                    ));
                }
                let byte = u8::try_from(u32::from(c)).map_err(|_| {
                    invalid(descriptor, format!("'{}' cannot be written as Latin-1", c))
                })?;
                bytes.push(byte);
            }
            if bytes.len() > descriptor.length {
                return Err(overflow(descriptor, text.clone()));
            }
            bytes.resize(descriptor.length, b' ');
            Ok(bytes)
        }
        (FieldType::Integer, Some(FieldValue::Integer(number))) => {
            zero_padded(descriptor, number.to_string())
        }
        (FieldType::Decimal { scale }, Some(FieldValue::Decimal(amount))) => {
            if *amount < BigDecimal::from(0) {
                return Err(invalid(descriptor, format!("negative amount {}", amount)));
            }
            let scaled = amount.with_scale(i64::from(scale));
            if scaled != *amount {
                return Err(invalid(
                    descriptor,
                    format!("{} has more than {} decimal places", amount, scale),
                ));
            }
            let (units, _) = scaled.as_bigint_and_exponent();
            zero_padded(descriptor, units.to_string())
        }
        (FieldType::Date, Some(FieldValue::Date(None))) => Ok(vec![b'0'; descriptor.length]),
        (FieldType::Date, Some(FieldValue::Date(Some(date)))) => {
            if !(0..=9999).contains(&date.year()) {
                return Err(overflow(descriptor, date.to_string()));
            }
            Ok(format!("{:02}{:02}{:04}", date.day(), date.month(), date.year()).into_bytes())
        }
        (field_type, Some(other)) => Err(invalid(
            descriptor,
            format!("{:?} does not fit a {:?} field", other, field_type),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{cnab240_reference, detail_line, DETAIL_RECORD};
    use std::str::FromStr;

    #[test]
    fn test_decode_reference_detail() {
        let layout = cnab240_reference();
        let line = detail_line(1, "000000010050");

        let parsed: Vec<_> = decode(line.as_bytes(), &layout).collect();
        assert_eq!(parsed.len(), 1);

        let parsed = parsed[0].as_ref().unwrap();
        assert_eq!(parsed.record_type(), DETAIL_RECORD);
        assert_eq!(parsed.raw_length, 240);
        assert_eq!(
            parsed.field("value").and_then(FieldValue::as_decimal),
            Some(&BigDecimal::from_str("100.50").unwrap())
        );
    }

    #[test]
    fn test_blank_lines_skipped_but_numbered() {
        let layout = cnab240_reference();
        let content = format!(
            "{}\r\n   \r\n\n{}\r\n",
            detail_line(1, "000000000100"),
            detail_line(2, "000000000200")
        );

        let parsed: Vec<_> = decode(content.as_bytes(), &layout)
            .map(|line| line.unwrap().line_index)
            .collect();
        assert_eq!(parsed, vec![1, 4]);
    }

    #[test]
    fn test_short_line_reports_length_mismatch() {
        let layout = cnab240_reference();
        let line = detail_line(1, "000000010050");
        let short = &line[..230];

        let result = decode_line(7, short.as_bytes(), &layout);
        assert_eq!(
            result.unwrap_err(),
            LineError::new(
                7,
                LineErrorReason::LineLengthMismatch {
                    expected: 240,
                    actual: 230
                }
            )
        );
    }

    #[test]
    fn test_unknown_discriminant() {
        let layout = cnab240_reference();
        let line = format!("777{}", " ".repeat(237));

        let err = decode_line(1, line.as_bytes(), &layout).unwrap_err();
        assert_eq!(err.reason, LineErrorReason::UnknownRecordType);
    }

    #[test]
    fn test_non_numeric_value_is_line_error() {
        let layout = cnab240_reference();
        let line = detail_line(1, "00000001005X");

        let err = decode_line(1, line.as_bytes(), &layout).unwrap_err();
        assert!(matches!(
            err.reason,
            LineErrorReason::InvalidField { ref field, .. } if field == "value"
        ));
    }

    #[test]
    fn test_bad_line_does_not_stop_the_batch() {
        let layout = cnab240_reference();
        let content = format!(
            "{}\nshort\n{}\n",
            detail_line(1, "000000000100"),
            detail_line(3, "000000000300")
        );

        let results: Vec<_> = decode(content.as_bytes(), &layout).collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_encode_overflow_is_hard_error() {
        let layout = cnab240_reference();
        let record = Record::new(DETAIL_RECORD).with(
            "value",
            FieldValue::Decimal(BigDecimal::from_str("99999999999.99").unwrap()),
        );

        let err = encode(&[record], &layout).unwrap_err();
        assert!(matches!(err, CodecError::FieldOverflow { ref field, width: 12, .. } if field == "value"));
    }

    #[test]
    fn test_encode_date_beyond_four_digit_year_overflows() {
        let layout = cnab240_reference();
        for year in [10_000, -1] {
            let record = Record::new(DETAIL_RECORD).with(
                "due_date",
                FieldValue::Date(NaiveDate::from_ymd_opt(year, 1, 1)),
            );

            let err = encode(&[record], &layout).unwrap_err();
            assert!(matches!(err, CodecError::FieldOverflow { ref field, width: 8, .. } if field == "due_date"));
        }
    }

    #[test]
    fn test_encode_rejects_control_characters_in_text() {
        let layout = cnab240_reference();
        for name in ["ACME\nLTDA", "ACME\rLTDA", "ACME\tLTDA", "ACME\u{85}"] {
            let record =
                Record::new(DETAIL_RECORD).with("payer_name", FieldValue::Text(name.to_string()));

            let err = encode(&[record], &layout).unwrap_err();
            assert!(matches!(err, CodecError::InvalidValue { ref field, .. } if field == "payer_name"));
        }
    }

    #[test]
    fn test_encode_rejects_unvalidated_layout() {
        let mut layout = cnab240_reference();
        layout.records[1] = RecordLayout::new(DETAIL_RECORD, 10)
            .with_field(FieldDescriptor::decimal("value", 5, 12, 2));
        let record = Record::new(DETAIL_RECORD).with("value", FieldValue::Decimal(BigDecimal::from(1)));

        assert!(matches!(
            encode(&[record.clone()], &layout),
            Err(CodecError::InvalidLayout(_))
        ));
        assert!(matches!(
            encode_record(&record, &layout.records[1]),
            Err(CodecError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_encode_rejects_excess_precision() {
        let layout = cnab240_reference();
        let record = Record::new(DETAIL_RECORD).with(
            "value",
            FieldValue::Decimal(BigDecimal::from_str("1.005").unwrap()),
        );

        assert!(matches!(
            encode(&[record], &layout),
            Err(CodecError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_encode_unknown_field() {
        let layout = cnab240_reference();
        let record = Record::new(DETAIL_RECORD).with("nonexistent", FieldValue::Integer(1));

        assert!(matches!(
            encode(&[record], &layout),
            Err(CodecError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_encode_pads_fields() {
        let layout = cnab240_reference();
        let record = Record::new(DETAIL_RECORD)
            .with("sequence", FieldValue::Integer(42))
            .with("payer_name", FieldValue::Text("ACME".to_string()))
            .with(
                "value",
                FieldValue::Decimal(BigDecimal::from_str("100.5").unwrap()),
            );

        let bytes = encode(&[record], &layout).unwrap();
        let line = std::str::from_utf8(&bytes).unwrap();

        assert_eq!(line.len(), 242);
        assert!(line.ends_with("\r\n"));
        assert_eq!(&line[0..3], "300");
        assert_eq!(&line[10..15], "00042");
        assert_eq!(&line[60..72], "000000010050");
        assert_eq!(&line[92..100], "ACME    ");
    }
}
