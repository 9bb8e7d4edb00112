//! Reusable test utilities:
//! - In-memory snapshot backend with failure injection
//! - Recording notifier and a mock Telegram Bot API
//! - Config directory builder
//! - Common test data

// Each test binary uses a different subset of the fixtures
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fake_backend;
pub mod fake_notifier;
pub mod mock_telegram;
pub mod test_config;
pub mod test_data;

pub use fake_backend::{BackendCall, FakeBackend};
pub use fake_notifier::RecordingNotifier;
pub use mock_telegram::MockTelegramServer;
pub use test_config::TestConfigBuilder;
pub use test_data::*;
