pub mod ai_service;
pub mod background_jobs;
pub mod chat_filter;
pub mod error;
pub mod escrow_service;
pub mod kyc_service;
pub mod matching_service;
pub mod otp_service;
pub mod transcription_service;
pub mod trust_service;
