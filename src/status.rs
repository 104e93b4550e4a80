use std::time::{Duration, Instant};

/// How long a failed initial load stays on screen
pub const LOAD_ERROR_DISMISS: Duration = Duration::from_secs(2);
/// How long refresh results stay on screen
pub const REFRESH_DISMISS: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Progress,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub text: String,
    pub detail: String,
    pub kind: StatusKind,
    /// `None` keeps the message until it is replaced
    pub expires_at: Option<Instant>,
}

/// Single transient message shown in the status bar
#[derive(Debug, Default)]
pub struct StatusLine {
    current: Option<StatusMessage>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&StatusMessage> {
        self.current.as_ref()
    }

    /// Message that stays until replaced (work in progress)
    pub fn progress(&mut self, text: impl Into<String>, detail: impl Into<String>) {
        self.current = Some(StatusMessage {
            text: text.into(),
            detail: detail.into(),
            kind: StatusKind::Progress,
            expires_at: None,
        });
    }

    pub fn success(&mut self, text: impl Into<String>, now: Instant, ttl: Duration) {
        self.current = Some(StatusMessage {
            text: text.into(),
            detail: String::new(),
            kind: StatusKind::Success,
            expires_at: Some(now + ttl),
        });
    }

    pub fn error(
        &mut self,
        text: impl Into<String>,
        detail: impl Into<String>,
        now: Instant,
        ttl: Duration,
    ) {
        self.current = Some(StatusMessage {
            text: text.into(),
            detail: detail.into(),
            kind: StatusKind::Error,
            expires_at: Some(now + ttl),
        });
    }

    /// Drop the message once its delay has passed
    pub fn tick(&mut self, now: Instant) {
        if let Some(expires_at) = self.current.as_ref().and_then(|m| m.expires_at) {
            if now >= expires_at {
                self.current = None;
            }
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_auto_dismisses() {
        let mut status = StatusLine::new();
        let t0 = Instant::now();
        status.error("Load failed", "timeout", t0, LOAD_ERROR_DISMISS);

        status.tick(t0 + Duration::from_millis(1999));
        assert_eq!(status.current().unwrap().kind, StatusKind::Error);

        status.tick(t0 + LOAD_ERROR_DISMISS);
        assert!(status.current().is_none());
    }

    #[test]
    fn test_progress_persists() {
        let mut status = StatusLine::new();
        let t0 = Instant::now();
        status.progress("Refreshing data", "in progress");
        status.tick(t0 + Duration::from_secs(3600));
        assert_eq!(status.current().unwrap().text, "Refreshing data");
    }

    #[test]
    fn test_new_message_replaces_old() {
        let mut status = StatusLine::new();
        let t0 = Instant::now();
        status.progress("Refreshing data", "");
        status.success("Data updated", t0, REFRESH_DISMISS);
        let msg = status.current().unwrap();
        assert_eq!(msg.kind, StatusKind::Success);
        assert_eq!(msg.expires_at, Some(t0 + REFRESH_DISMISS));
    }
}
