pub mod db;
pub mod referraldb;
pub mod trackingdb;
pub mod userdb;
