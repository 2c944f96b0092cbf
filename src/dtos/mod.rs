pub mod recommendationdtos;
pub mod referraldtos;
