pub mod recommendations;
pub mod referrals;
