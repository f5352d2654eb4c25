//! Reference CNAB 240 style layout
//!
//! Every record is 240 bytes and is identified by a 3-character code at
//! offset 0: `000` file header, `300` detail, `900` trailer. Monetary fields
//! are zero-padded with two implied decimal places.

use super::{FieldDescriptor, Layout, RecordLayout, TrailerControl};

pub const CNAB240_LAYOUT_ID: &str = "cnab240";
pub const CNAB240_LINE_LENGTH: usize = 240;

pub const HEADER_RECORD: &str = "header";
pub const DETAIL_RECORD: &str = "detail";
pub const TRAILER_RECORD: &str = "trailer";

pub const HEADER_CODE: &str = "000";
pub const DETAIL_CODE: &str = "300";
pub const TRAILER_CODE: &str = "900";

/// Build the reference layout
pub fn cnab240_reference() -> Layout {
    let header = RecordLayout::new(HEADER_RECORD, CNAB240_LINE_LENGTH)
        .with_discriminant(0, HEADER_CODE)
        .with_field(FieldDescriptor::text("bank_code", 3, 3).required())
        .with_field(FieldDescriptor::text("company_document", 6, 14))
        .with_field(FieldDescriptor::text("agreement", 20, 20))
        .with_field(FieldDescriptor::text("company_name", 40, 30))
        .with_field(FieldDescriptor::text("bank_name", 70, 30))
        .with_field(FieldDescriptor::date("generation_date", 100))
        .with_field(FieldDescriptor::integer("file_sequence", 108, 6));

    let detail = RecordLayout::new(DETAIL_RECORD, CNAB240_LINE_LENGTH)
        .with_discriminant(0, DETAIL_CODE)
        .with_field(FieldDescriptor::text("bank_code", 3, 3).required())
        .with_field(FieldDescriptor::integer("batch", 6, 4))
        .with_field(FieldDescriptor::integer("sequence", 10, 5))
        .with_field(FieldDescriptor::text("movement_code", 15, 2).required())
        .with_field(FieldDescriptor::text("our_number", 17, 20).required())
        .with_field(FieldDescriptor::text("document_number", 37, 15))
        .with_field(FieldDescriptor::date("due_date", 52).required())
        .with_field(FieldDescriptor::decimal("value", 60, 12, 2))
        .with_field(FieldDescriptor::date("payment_date", 72))
        .with_field(FieldDescriptor::decimal("fee", 80, 12, 2))
        .with_field(FieldDescriptor::text("payer_name", 92, 40))
        .with_field(FieldDescriptor::text("payer_document", 132, 14))
        .with_field(FieldDescriptor::text("rejection_codes", 146, 10));

    let trailer = RecordLayout::new(TRAILER_RECORD, CNAB240_LINE_LENGTH)
        .with_discriminant(0, TRAILER_CODE)
        .with_field(FieldDescriptor::text("bank_code", 3, 3))
        .with_field(FieldDescriptor::integer("record_count", 6, 6))
        .with_field(FieldDescriptor::decimal("total_value", 12, 18, 2));

    Layout {
        id: CNAB240_LAYOUT_ID.to_string(),
        records: vec![header, detail, trailer],
        detail_record: DETAIL_RECORD.to_string(),
        value_field: "value".to_string(),
        trailer: Some(TrailerControl {
            record: TRAILER_RECORD.to_string(),
            count_field: "record_count".to_string(),
            total_field: "total_value".to_string(),
        }),
    }
}

/// Sample header line for bank "033"
pub fn header_line(agreement: &str) -> String {
    format!(
        "{}033{:<14}{:<20}{:<30}{:<30}{}{:06}{}",
        HEADER_CODE,
        "12345678000190",
        agreement,
        "EMPRESA EXEMPLO LTDA",
        "BANCO SANTANDER",
        "15012024",
        1,
        " ".repeat(126)
    )
}

/// Sample detail line for bank "033"
///
/// `value` is written verbatim at the value offset and should be 12 digits
/// for a well-formed line.
pub fn detail_line(sequence: u64, value: &str) -> String {
    format!(
        "{}033{:04}{:05}06{:<20}{:<15}15012024{}16012024{}{:<40}{:<14}{:<10}{}",
        DETAIL_CODE,
        1,
        sequence,
        format!("NN{:018}", sequence),
        format!("DOC{:012}", sequence),
        value,
        "000000000000",
        format!("PAGADOR {}", sequence),
        "12345678000190",
        "",
        " ".repeat(84)
    )
}

/// Sample trailer line for bank "033"
pub fn trailer_line(record_count: u64, total_cents: u64) -> String {
    format!(
        "{}033{:06}{:018}{}",
        TRAILER_CODE,
        record_count,
        total_cents,
        " ".repeat(210)
    )
}
