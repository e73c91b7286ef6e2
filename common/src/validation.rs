use crate::error::{ProductError, ProductResult};
use crate::product::ProductId;

/// Values the presence check understands. Empty strings, zero and `NaN`
/// count as absent; `null` never reaches here because the codec has already
/// turned it into the empty value.
pub trait Presence {
    fn is_present(&self) -> bool;
}

impl Presence for str {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl Presence for String {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl Presence for ProductId {
    fn is_present(&self) -> bool {
        !self.0.is_empty()
    }
}

impl Presence for f64 {
    fn is_present(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

/// Fail with [`ProductError::MissingField`] when `value` is absent.
pub fn require_field<T: Presence + ?Sized>(value: &T, field: &'static str) -> ProductResult<()> {
    if value.is_present() {
        Ok(())
    } else {
        Err(ProductError::MissingField(field))
    }
}
