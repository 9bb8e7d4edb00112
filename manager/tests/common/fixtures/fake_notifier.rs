//! Notifier that records every attempt and rejects on demand

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use snapshot_manager::errors::NotifyError;
use snapshot_manager::notify::{NotificationMessage, Notifier};

#[derive(Default)]
struct RecorderState {
    /// server name -> rejections left before deliveries succeed
    rejections: HashMap<String, u32>,
    attempts: Vec<String>,
    delivered: Vec<NotificationMessage>,
}

#[derive(Default)]
pub struct RecordingNotifier {
    state: Mutex<RecorderState>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the first `times` attempts for `server_name`
    pub fn reject(self, server_name: &str, times: u32) -> Self {
        self.state
            .lock()
            .unwrap()
            .rejections
            .insert(server_name.to_string(), times);
        self
    }

    pub fn reject_always(self, server_name: &str) -> Self {
        self.reject(server_name, u32::MAX)
    }

    /// Server names in attempt order, retries included
    pub fn attempts(&self) -> Vec<String> {
        self.state.lock().unwrap().attempts.clone()
    }

    pub fn attempts_for(&self, server_name: &str) -> usize {
        self.attempts().iter().filter(|s| *s == server_name).count()
    }

    pub fn delivered(&self) -> Vec<NotificationMessage> {
        self.state.lock().unwrap().delivered.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        let mut state = self.state.lock().unwrap();
        let server = message.outcome.server_name.clone();
        state.attempts.push(server.clone());

        if let Some(left) = state.rejections.get_mut(&server) {
            if *left > 0 {
                *left -= 1;
                return Err(NotifyError::Rejected {
                    target: self.target(),
                    status: 502,
                    body: "Bad Gateway".to_string(),
                });
            }
        }

        state.delivered.push(message.clone());
        Ok(())
    }

    fn target(&self) -> String {
        "recording notifier".to_string()
    }
}
