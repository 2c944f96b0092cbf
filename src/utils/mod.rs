pub mod referral_code;
