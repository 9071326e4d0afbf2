//! Unique test data.
//!
//! Names embed a millisecond timestamp so repeated runs against a shared
//! environment never collide; phone-like numbers take their digits from
//! random v4 UUID bytes.

use crate::pages::{CustomerDetails, PartDetails, StockAdjustment};
use chrono::Utc;
use uuid::Uuid;

/// Uniform integer in `low..=high`
fn random_in(low: u64, high: u64) -> u64 {
    let bytes = Uuid::new_v4().into_bytes();
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    low + u64::from_le_bytes(raw) % (high - low + 1)
}

/// Generator of unique part, customer and stock data
#[derive(Debug, Clone, Copy, Default)]
pub struct TestData {
    fixed_millis: Option<i64>,
}

impl TestData {
    /// Generator stamped with the current time
    #[must_use]
    pub const fn new() -> Self {
        Self { fixed_millis: None }
    }

    /// Generator stamped with a fixed time
    #[must_use]
    pub const fn at(millis: i64) -> Self {
        Self {
            fixed_millis: Some(millis),
        }
    }

    /// Millisecond timestamp used in generated names
    #[must_use]
    pub fn millis(&self) -> i64 {
        self.fixed_millis
            .unwrap_or_else(|| Utc::now().timestamp_millis())
    }

    /// `<PREFIX>_<millis>`
    #[must_use]
    pub fn part_code(&self, prefix: &str) -> String {
        format!("{prefix}_{}", self.millis())
    }

    /// `Description_<millis>`
    #[must_use]
    pub fn description(&self) -> String {
        format!("Description_{}", self.millis())
    }

    /// `021` and seven random digits
    #[must_use]
    pub fn barcode(&self) -> String {
        format!("021{}", random_in(1_000_000, 9_999_999))
    }

    /// `021` and seven random digits
    #[must_use]
    pub fn mobile_number(&self) -> String {
        format!("021{}", random_in(1_000_000, 9_999_999))
    }

    /// `09` and eight random digits
    #[must_use]
    pub fn phone_number(&self) -> String {
        format!("09{}", random_in(10_000_000, 99_999_999))
    }

    /// `test<millis>@<domain>`
    #[must_use]
    pub fn email(&self, domain: &str) -> String {
        format!("test{}@{domain}", self.millis())
    }

    /// Part form values
    #[must_use]
    pub fn part(&self, prefix: &str) -> PartDetails {
        PartDetails {
            code: self.part_code(prefix),
            description: self.description(),
            barcode: self.barcode(),
        }
    }

    /// The three required customer fields; landline and email untouched
    #[must_use]
    pub fn customer(&self) -> CustomerDetails {
        let millis = self.millis();
        CustomerDetails {
            first_name: format!("Test{millis}"),
            last_name: format!("User{millis}"),
            mobile_number: self.mobile_number(),
            phone_number: None,
            email: None,
        }
    }

    /// Stock adjustment of `delta` units with timestamped notes
    #[must_use]
    pub fn stock_adjustment(&self, delta: i64, notes: &str) -> StockAdjustment {
        StockAdjustment {
            delta: delta.to_string(),
            notes: format!("{notes}_{}", self.millis()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_names() {
        let data = TestData::at(1_700_000_000_123);
        assert_eq!(data.part_code("PartCodeA"), "PartCodeA_1700000000123");
        assert_eq!(data.email("test.com"), "test1700000000123@test.com");
        let customer = data.customer();
        assert_eq!(customer.first_name, "Test1700000000123");
        assert!(customer.phone_number.is_none() && customer.email.is_none());
        assert_eq!(data.stock_adjustment(10, "Initial stock").delta, "10");
    }

    #[test]
    fn test_number_shapes() {
        let data = TestData::new();
        for _ in 0..32 {
            let barcode = data.barcode();
            assert!(barcode.starts_with("021") && barcode.len() == 10);
            let phone = data.phone_number();
            assert!(phone.starts_with("09") && phone.len() == 10);
            assert!(phone.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
