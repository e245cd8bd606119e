//! Human-readable booking references

use chrono::Utc;
use rand::Rng;

const PREFIX: &str = "BUS";
const SUFFIX_LEN: usize = 5;
const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `BUS` + unix millis + 5 random uppercase base36 characters.
///
/// Uniqueness is enforced by the database; callers regenerate on conflict.
pub fn generate_booking_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();

    format!("{}{}{}", PREFIX, Utc::now().timestamp_millis(), suffix)
}
