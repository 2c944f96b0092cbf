pub mod referralmodel;
pub mod trackingmodel;
pub mod usermodel;
