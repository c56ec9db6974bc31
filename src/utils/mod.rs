pub mod currency;
pub mod geo;
pub mod http_retry;
pub mod otp_generator;
pub mod password;
pub mod token;
