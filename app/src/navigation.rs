//! In-app routing as seen by the notifier.

use std::sync::RwLock;

/// Route segment that introduces a conversation id (`/chat/<id>`).
const CHAT_SEGMENT: &str = "chat";

/// Host navigation facility.
pub trait Navigator: Send + Sync {
    fn current_route(&self) -> String;

    fn navigate(&self, route: &str);
}

/// Headless navigator: remembers the route and logs every navigation.
pub struct LoggingNavigator {
    route: RwLock<String>,
}

impl LoggingNavigator {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            route: RwLock::new(initial.into()),
        }
    }
}

impl Default for LoggingNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for LoggingNavigator {
    fn current_route(&self) -> String {
        self.route
            .read()
            .map(|r| r.clone())
            .unwrap_or_else(|_| "/".to_string())
    }

    fn navigate(&self, route: &str) {
        tracing::info!(route, "Navigate");
        if let Ok(mut current) = self.route.write() {
            *current = route.to_string();
        }
    }
}

/// Conversation id from a `/chat/<id>` route, ignoring query and fragment.
pub fn conversation_from_route(route: &str) -> Option<String> {
    let path = route.split(['?', '#']).next().unwrap_or_default();
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    segments.find(|s| *s == CHAT_SEGMENT)?;
    segments.next().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_conversation_from_chat_route() {
        assert_eq!(conversation_from_route("/chat/c1").as_deref(), Some("c1"));
        assert_eq!(
            conversation_from_route("/student/chat/c2?tab=files#end").as_deref(),
            Some("c2")
        );
        assert_eq!(conversation_from_route("/chat"), None);
        assert_eq!(conversation_from_route("/chat/"), None);
        assert_eq!(conversation_from_route("/agreements/a1"), None);
        assert_eq!(conversation_from_route(""), None);
    }

    #[test]
    fn logging_navigator_tracks_route() {
        let nav = LoggingNavigator::default();
        assert_eq!(nav.current_route(), "/");
        nav.navigate("/chat/c9");
        assert_eq!(nav.current_route(), "/chat/c9");
    }
}
