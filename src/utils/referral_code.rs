use rand::Rng;

const CODE_PREFIX: &str = "VC";

/// Generates a short referral code such as `VC7K2M9QX` using Crockford Base32,
/// which leaves out I, L, O and U so codes survive being read aloud.
pub fn generate_referral_code() -> String {
    let value: u32 = rand::thread_rng().gen_range(1 << 25..u32::MAX);
    let encoded = base32::encode(base32::Alphabet::Crockford, &value.to_be_bytes());
    format!("{}{}", CODE_PREFIX, &encoded[..encoded.len().min(7)])
}

/// Normalizes user input to valid Crockford Base32
/// Handles common user input errors
pub fn normalize_referral_code(input: &str) -> String {
    input
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .enumerate()
        .map(|(i, c)| {
            // the VC prefix is literal text, not base32
            if i < CODE_PREFIX.len() {
                return c;
            }
            match c {
                'O' => '0',  // Letter O to number 0
                'I' => '1',  // Letter I to number 1
                'L' => '1',  // Letter L to number 1
                _ => c,
            }
        })
        .collect()
}

pub fn looks_like_referral_code(input: &str) -> bool {
    normalize_referral_code(input).starts_with(CODE_PREFIX)
}
