use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Tunables for coupon issuance, loaded from the environment at startup.
#[derive(Debug, Clone)]
pub struct CouponPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub min_discount: i32,
    pub max_discount: i32,
    pub expiry_days: i64,
}

impl Default for CouponPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 12,
            min_discount: 5,
            max_discount: 10,
            expiry_days: 30,
        }
    }
}

/// Generates a coupon code and discount percentage.
///
/// The code embeds the uppercase-hex rendering of the user id, padded to a
/// randomly chosen target length with random uppercase alphanumerics and
/// shuffled so the fragment's position is not recoverable. When the fragment
/// alone reaches the target length the code is the fragment truncated to that
/// length and no randomness is injected. Codes are not guaranteed unique; the
/// store enforces uniqueness and callers retry on collision.
pub fn generate_code<R: Rng + ?Sized>(
    rng: &mut R,
    user_id: i32,
    policy: &CouponPolicy,
) -> (String, i32) {
    let length = rng.gen_range(policy.min_length..=policy.max_length);
    let user_part = format!("{user_id:X}");

    let code = if user_part.len() >= length {
        user_part[..length].to_string()
    } else {
        let mut chars: Vec<u8> = user_part.into_bytes();
        while chars.len() < length {
            chars.push(CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())]);
        }
        chars.shuffle(rng);
        String::from_utf8_lossy(&chars).into_owned()
    };

    let discount = rng.gen_range(policy.min_discount..=policy.max_discount);
    (code, discount)
}

pub fn expiry_from(now: DateTime<Utc>, policy: &CouponPolicy) -> DateTime<Utc> {
    now + Duration::days(policy.expiry_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn counted(s: &str) -> std::collections::HashMap<char, usize> {
        let mut map = std::collections::HashMap::new();
        for c in s.chars() {
            *map.entry(c).or_insert(0) += 1;
        }
        map
    }

    #[test]
    fn code_length_stays_within_policy_bounds() {
        let policy = CouponPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);
        for user_id in [1, 7, 42, 255, 4096, i32::MAX] {
            for _ in 0..50 {
                let (code, _) = generate_code(&mut rng, user_id, &policy);
                assert!(
                    (policy.min_length..=policy.max_length).contains(&code.len()),
                    "code {code:?} out of bounds for user {user_id}",
                );
            }
        }
    }

    #[test]
    fn discount_stays_within_policy_bounds() {
        let policy = CouponPolicy::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let (_, discount) = generate_code(&mut rng, 7, &policy);
            assert!((policy.min_discount..=policy.max_discount).contains(&discount));
        }
    }

    #[test]
    fn user_id_fragment_is_embedded_in_the_code() {
        let policy = CouponPolicy::default();
        let mut rng = StdRng::seed_from_u64(3);
        for user_id in [7, 42, 255, 0xBEEF] {
            let user_part = format!("{user_id:X}");
            let (code, _) = generate_code(&mut rng, user_id, &policy);
            let have = counted(&code);
            for (c, needed) in counted(&user_part) {
                assert!(
                    have.get(&c).copied().unwrap_or(0) >= needed,
                    "code {code:?} is missing {needed} of {c:?} for user {user_id}",
                );
            }
        }
    }

    #[test]
    fn code_uses_only_uppercase_alphanumerics() {
        let policy = CouponPolicy::default();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let (code, _) = generate_code(&mut rng, 42, &policy);
            assert!(code.bytes().all(|b| CODE_CHARS.contains(&b)), "{code:?}");
        }
    }

    #[test]
    fn oversized_fragment_is_truncated_to_target_length() {
        // i32::MAX renders as "7FFFFFFF" (8 hex chars); force a shorter target.
        let policy = CouponPolicy {
            min_length: 6,
            max_length: 6,
            ..CouponPolicy::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let (code, _) = generate_code(&mut rng, i32::MAX, &policy);
        assert_eq!(code, "7FFFFF");
    }

    #[test]
    fn fragment_exactly_at_target_length_is_used_verbatim() {
        let policy = CouponPolicy {
            min_length: 8,
            max_length: 8,
            ..CouponPolicy::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let (code, _) = generate_code(&mut rng, i32::MAX, &policy);
        assert_eq!(code, "7FFFFFFF");
    }

    #[test]
    fn expiry_is_policy_days_after_issuance() {
        let policy = CouponPolicy::default();
        let now = Utc::now();
        assert_eq!(expiry_from(now, &policy), now + Duration::days(30));
    }
}
