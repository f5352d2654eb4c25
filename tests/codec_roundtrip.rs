//! Property tests for the fixed-width codec

use banking_remittance::{
    cnab240_reference, decode, encode, CodecError, FieldValue, Record, DETAIL_RECORD,
    TRAILER_RECORD,
};
use bigdecimal::{num_bigint::BigInt, BigDecimal};
use chrono::NaiveDate;
use proptest::prelude::*;

fn amount(max_cents: u64) -> impl Strategy<Value = FieldValue> {
    (0..=max_cents).prop_map(|cents| FieldValue::Decimal(BigDecimal::new(BigInt::from(cents), 2)))
}

fn date() -> impl Strategy<Value = FieldValue> {
    prop::option::of((1990i32..=2099, 1u32..=12, 1u32..=28))
        .prop_map(|d| FieldValue::Date(d.and_then(|(y, m, day)| NaiveDate::from_ymd_opt(y, m, day))))
}

fn text(pattern: &'static str) -> impl Strategy<Value = FieldValue> {
    pattern.prop_map(FieldValue::Text)
}

fn detail() -> impl Strategy<Value = Record> {
    (
        (0u64..10_000, 0u64..100_000, text("[0-9]{2}"), text("[A-Z0-9]{1,20}")),
        (text("[A-Z0-9]{0,15}"), date(), amount(999_999_999_999), date()),
        (
            amount(999_999_999_999),
            text("[A-Z]{1,15}( [A-Z]{1,15})?"),
            text("[0-9]{11,14}"),
            text("[A-Z0-9]{0,10}"),
        ),
    )
        .prop_map(
            |(
                (batch, sequence, movement, our_number),
                (document, due_date, value, payment_date),
                (fee, payer, payer_document, rejections),
            )| {
                Record::new(DETAIL_RECORD)
                    .with("bank_code", FieldValue::Text("033".to_string()))
                    .with("batch", FieldValue::Integer(batch))
                    .with("sequence", FieldValue::Integer(sequence))
                    .with("movement_code", movement)
                    .with("our_number", our_number)
                    .with("document_number", document)
                    .with("due_date", due_date)
                    .with("value", value)
                    .with("payment_date", payment_date)
                    .with("fee", fee)
                    .with("payer_name", payer)
                    .with("payer_document", payer_document)
                    .with("rejection_codes", rejections)
            },
        )
}

fn trailer() -> impl Strategy<Value = Record> {
    (0u64..1_000_000, amount(999_999_999_999_999_999)).prop_map(|(count, total)| {
        Record::new(TRAILER_RECORD)
            .with("bank_code", FieldValue::Text("033".to_string()))
            .with("record_count", FieldValue::Integer(count))
            .with("total_value", total)
    })
}

proptest! {
    #[test]
    fn decode_reverses_encode(details in prop::collection::vec(detail(), 1..20), end in trailer()) {
        let layout = cnab240_reference();
        let mut records = details;
        records.push(end);

        let bytes = encode(&records, &layout).unwrap();
        let decoded: Vec<Record> = decode(&bytes, &layout)
            .map(|line| line.map(|parsed| parsed.into_record()))
            .collect::<Result<_, _>>()
            .unwrap();

        prop_assert_eq!(decoded, records);
    }

    #[test]
    fn every_encoded_line_has_record_length(details in prop::collection::vec(detail(), 1..10)) {
        let layout = cnab240_reference();
        let bytes = encode(&details, &layout).unwrap();

        for line in bytes.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
            prop_assert_eq!(line.strip_suffix(b"\r").unwrap_or(line).len(), 240);
        }
    }

    #[test]
    fn control_characters_never_reach_the_file(
        prefix in "[A-Z]{0,10}",
        control in prop::sample::select(vec!['\n', '\r', '\t', '\u{0}', '\u{1b}', '\u{85}']),
        suffix in "[A-Z]{0,10}",
    ) {
        let layout = cnab240_reference();
        let name = format!("{}{}{}", prefix, control, suffix);
        let record = Record::new(DETAIL_RECORD).with("payer_name", FieldValue::Text(name));

        let is_invalid_value = matches!(encode(&[record], &layout), Err(CodecError::InvalidValue { .. }));
        prop_assert!(is_invalid_value);
    }
}
