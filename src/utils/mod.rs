pub mod firestore_codec;
pub mod commission;
pub mod withdrawal_schedule;
pub mod phone;
pub mod referral_code;

pub use phone::normalize_phone;
pub use referral_code::{generate_referral_code, normalize_referral_code};
