//! Record code generation

use std::sync::atomic::{AtomicI64, Ordering};

use crate::types::RemittanceKind;

/// Generates `REM<millis>` / `RET<millis>` codes
///
/// Codes are strictly increasing within one generator, so two requests in
/// the same millisecond still get distinct codes.
#[derive(Debug, Default)]
pub struct CodeGenerator {
    last: AtomicI64,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, kind: RemittanceKind) -> String {
        let now = chrono::Utc::now().timestamp_millis();
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(previous + 1);
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format!("{}{}", kind.code_prefix(), candidate),
                Err(actual) => previous = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_carry_kind_prefix() {
        let generator = CodeGenerator::new();
        assert!(generator.next(RemittanceKind::Outbound).starts_with("REM"));
        assert!(generator.next(RemittanceKind::Inbound).starts_with("RET"));
    }

    #[test]
    fn test_codes_are_unique_in_a_burst() {
        let generator = CodeGenerator::new();
        let codes: HashSet<_> = (0..1_000)
            .map(|_| generator.next(RemittanceKind::Outbound))
            .collect();
        assert_eq!(codes.len(), 1_000);
    }
}
