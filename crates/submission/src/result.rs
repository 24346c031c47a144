use std::fmt;

use crate::error::UnknownTestResultCode;

/// Diagnostic state reported by the verification backend.
///
/// The code mapping is closed: any other code is rejected rather than
/// coerced, so protocol drift on the server shows up as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestResult {
    Pending,
    Negative,
    Positive,
    Invalid,
}

impl TestResult {
    pub const ALL: [TestResult; 4] = [
        TestResult::Pending,
        TestResult::Negative,
        TestResult::Positive,
        TestResult::Invalid,
    ];

    /// Wire code of this result
    pub fn code(self) -> u32 {
        match self {
            TestResult::Pending => 0,
            TestResult::Negative => 1,
            TestResult::Positive => 2,
            TestResult::Invalid => 3,
        }
    }
}

impl TryFrom<u32> for TestResult {
    type Error = UnknownTestResultCode;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TestResult::Pending),
            1 => Ok(TestResult::Negative),
            2 => Ok(TestResult::Positive),
            3 => Ok(TestResult::Invalid),
            other => Err(UnknownTestResultCode(other)),
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestResult::Pending => "pending",
            TestResult::Negative => "negative",
            TestResult::Positive => "positive",
            TestResult::Invalid => "invalid",
        };
        write!(f, "{}", name)
    }
}
