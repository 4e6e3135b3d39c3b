//! Test helpers shared by unit and integration tests.

use crate::{EscrowError, Result};

/// Asserts that `res` was rejected with exactly `expected`.
pub fn assert_err<T>(res: Result<T>, expected: EscrowError) {
    match res {
        Err(got) => assert_eq!(
            got,
            expected,
            "rejected with [{}], expected [{}]",
            got.tag(),
            expected.tag()
        ),
        Ok(_) => panic!("expected rejection [{}], got Ok", expected.tag()),
    }
}
