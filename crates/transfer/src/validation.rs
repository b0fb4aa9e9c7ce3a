use crate::TransferError;
use crate::types::TransferUnit;

/// Rejects units that must never reach the store.
pub fn validate_unit(unit: &TransferUnit) -> Result<(), TransferError> {
    if unit.size == 0 {
        return Err(TransferError::EmptyFile(unit.name.clone()));
    }
    Ok(())
}

/// Result of filtering a submission before any network call.
#[derive(Debug, Default)]
pub struct Admission {
    /// Units to transfer, in submission order.
    pub admitted: Vec<TransferUnit>,
    /// Units rejected client-side, with the reason.
    pub rejected: Vec<(TransferUnit, TransferError)>,
}

/// Splits a submission into admitted units and validation rejects.
///
/// Submission order is preserved within each list.
pub fn admit_units(units: Vec<TransferUnit>) -> Admission {
    let mut admission = Admission::default();
    for unit in units {
        match validate_unit(&unit) {
            Ok(()) => admission.admitted.push(unit),
            Err(e) => admission.rejected.push((unit, e)),
        }
    }
    admission
}
