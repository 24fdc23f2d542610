pub mod fake_platform;
pub mod fix;
