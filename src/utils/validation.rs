//! Validation utilities

use bigdecimal::BigDecimal;

use crate::types::*;

/// Validate that a file name carries one of the accepted extensions
///
/// The comparison ignores case; a failure is an invalid file.
pub fn validate_file_name(file_name: &str, extensions: &[String]) -> RemittanceResult<()> {
    if file_name.trim().is_empty() {
        return Err(RemittanceError::InvalidFile(
            "File name cannot be empty".to_string(),
        ));
    }

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if !extensions
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(&extension))
    {
        return Err(RemittanceError::InvalidFile(format!(
            "{} must have one of the extensions: {}",
            file_name,
            extensions.join(", ")
        )));
    }

    Ok(())
}

/// Validate that a bank code has three digits
pub fn validate_bank_code(code: &str) -> RemittanceResult<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(RemittanceError::Validation(format!(
            "Bank code must have three digits: '{}'",
            code
        )));
    }
    Ok(())
}

/// Validate a generated remittance or return code
pub fn validate_remittance_code(code: &str) -> RemittanceResult<()> {
    let digits = code
        .strip_prefix(RemittanceKind::Outbound.code_prefix())
        .or_else(|| code.strip_prefix(RemittanceKind::Inbound.code_prefix()));

    match digits {
        Some(d) if !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()) => Ok(()),
        _ => Err(RemittanceError::Validation(format!(
            "Invalid remittance code: '{}'",
            code
        ))),
    }
}

/// Validate that an amount is not negative
pub fn validate_non_negative(amount: &BigDecimal) -> RemittanceResult<()> {
    if *amount < BigDecimal::from(0) {
        Err(RemittanceError::Validation(
            "Amount cannot be negative".to_string(),
        ))
    } else {
        Ok(())
    }
}
