use std::sync::atomic::AtomicUsize;

use super::*;

struct RecordingHandle {
    tag: String,
    closed: Arc<Mutex<Vec<String>>>,
}

impl DesktopHandle for RecordingHandle {
    fn close(&self) {
        self.closed.lock().unwrap().push(self.tag.clone());
    }
}

struct RecordingDesktop {
    permission: Mutex<PermissionStatus>,
    grant_on_request: bool,
    prompts: AtomicUsize,
    shown: Mutex<Vec<DesktopContent>>,
    hooks: Mutex<Vec<ActivateHook>>,
    closed: Arc<Mutex<Vec<String>>>,
    focused: AtomicUsize,
    events: Arc<Mutex<Vec<String>>>,
    fail_show: bool,
}

impl RecordingDesktop {
    fn with_permission(permission: PermissionStatus) -> Self {
        Self {
            permission: Mutex::new(permission),
            grant_on_request: true,
            prompts: AtomicUsize::new(0),
            shown: Mutex::new(Vec::new()),
            hooks: Mutex::new(Vec::new()),
            closed: Arc::new(Mutex::new(Vec::new())),
            focused: AtomicUsize::new(0),
            events: Arc::new(Mutex::new(Vec::new())),
            fail_show: false,
        }
    }

    fn granted() -> Self {
        Self::with_permission(PermissionStatus::Granted)
    }

    fn click(&self, index: usize) {
        let hooks = self.hooks.lock().unwrap();
        (hooks[index])();
    }

    fn shown_titles(&self) -> Vec<String> {
        self.shown
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.title.clone())
            .collect()
    }

    fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }
}

impl DesktopBackend for RecordingDesktop {
    fn is_supported(&self) -> bool {
        *self.permission.lock().unwrap() != PermissionStatus::Unsupported
    }

    fn permission(&self) -> PermissionStatus {
        *self.permission.lock().unwrap()
    }

    fn request_permission(&self) -> PermissionStatus {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let outcome = if self.grant_on_request {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        *self.permission.lock().unwrap() = outcome;
        outcome
    }

    fn show(
        &self,
        content: &DesktopContent,
        activate: ActivateHook,
    ) -> Result<Box<dyn DesktopHandle>, DesktopError> {
        if self.fail_show {
            return Err(DesktopError::Show("server gone".into()));
        }
        self.shown.lock().unwrap().push(content.clone());
        self.hooks.lock().unwrap().push(activate);
        Ok(Box::new(RecordingHandle {
            tag: content.tag.clone(),
            closed: self.closed.clone(),
        }))
    }

    fn focus_app(&self) {
        self.focused.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push("focus".into());
    }
}

fn hidden_notifier(backend: Arc<RecordingDesktop>) -> Arc<DesktopNotifier> {
    DesktopNotifier::new(backend, VisibilityTracker::new(false))
}

#[test]
fn visible_page_shows_nothing() {
    let backend = Arc::new(RecordingDesktop::granted());
    let visibility = VisibilityTracker::new(true);
    let notifier = DesktopNotifier::new(backend.clone(), visibility.clone());

    assert!(
        notifier
            .show_notification(DesktopRequest::new("t", "b", "x"))
            .is_none()
    );
    assert!(backend.shown_titles().is_empty());

    visibility.set_visible(false);
    assert!(
        notifier
            .show_notification(DesktopRequest::new("t", "b", "x"))
            .is_some()
    );
    assert_eq!(backend.shown_titles(), vec!["t".to_string()]);
}

#[test]
fn ungranted_permission_shows_nothing() {
    for permission in [PermissionStatus::Default, PermissionStatus::Denied] {
        let backend = Arc::new(RecordingDesktop::with_permission(permission));
        let notifier = hidden_notifier(backend.clone());
        assert!(
            notifier
                .show_notification(DesktopRequest::new("t", "b", "x"))
                .is_none()
        );
        assert!(backend.shown_titles().is_empty());
    }
}

#[test]
fn same_tag_replaces_previous_notification() {
    let backend = Arc::new(RecordingDesktop::granted());
    let notifier = hidden_notifier(backend.clone());

    let first = notifier
        .show_notification(DesktopRequest::new("one", "b", "message-c1"))
        .unwrap();
    let second = notifier
        .show_notification(DesktopRequest::new("two", "b", "message-c1"))
        .unwrap();

    assert_ne!(first.serial(), second.serial());
    assert_eq!(backend.closed(), vec!["message-c1".to_string()]);
    assert_eq!(notifier.active_tags(), vec!["message-c1".to_string()]);
}

#[test]
fn click_focuses_runs_action_then_closes() {
    let backend = Arc::new(RecordingDesktop::granted());
    let notifier = hidden_notifier(backend.clone());
    let events = backend.events.clone();

    let request = DesktopRequest::new("t", "b", "agreement-1").with_on_click(move || {
        events.lock().unwrap().push("navigate".into());
    });
    notifier.show_notification(request).unwrap();

    backend.click(0);

    assert_eq!(
        *backend.events.lock().unwrap(),
        vec!["focus".to_string(), "navigate".to_string()]
    );
    assert_eq!(backend.closed(), vec!["agreement-1".to_string()]);
    assert!(notifier.active_tags().is_empty());

    // A second click on the same notification does nothing.
    backend.click(0);
    assert_eq!(backend.focused.load(Ordering::SeqCst), 1);
}

#[test]
fn click_on_replaced_notification_is_ignored() {
    let backend = Arc::new(RecordingDesktop::granted());
    let notifier = hidden_notifier(backend.clone());
    let clicks = Arc::new(AtomicUsize::new(0));

    let c = clicks.clone();
    notifier
        .show_notification(DesktopRequest::new("old", "b", "tag").with_on_click(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();
    let c = clicks.clone();
    notifier
        .show_notification(DesktopRequest::new("new", "b", "tag").with_on_click(move || {
            c.fetch_add(10, Ordering::SeqCst);
        }))
        .unwrap();

    backend.click(0);
    assert_eq!(clicks.load(Ordering::SeqCst), 0);
    assert_eq!(notifier.active_tags(), vec!["tag".to_string()]);

    backend.click(1);
    assert_eq!(clicks.load(Ordering::SeqCst), 10);
}

#[test]
fn handle_click_by_tag() {
    let backend = Arc::new(RecordingDesktop::granted());
    let notifier = hidden_notifier(backend.clone());
    notifier
        .show_notification(DesktopRequest::new("t", "b", "payment-9"))
        .unwrap();

    assert!(notifier.handle_click("payment-9"));
    assert!(!notifier.handle_click("payment-9"));
    assert_eq!(backend.focused.load(Ordering::SeqCst), 1);
}

#[test]
fn request_permission_prompts_only_from_default() {
    let granted = Arc::new(RecordingDesktop::granted());
    assert!(hidden_notifier(granted.clone()).request_permission());
    assert_eq!(granted.prompts.load(Ordering::SeqCst), 0);

    let denied = Arc::new(RecordingDesktop::with_permission(PermissionStatus::Denied));
    assert!(!hidden_notifier(denied.clone()).request_permission());
    assert_eq!(denied.prompts.load(Ordering::SeqCst), 0);

    let undecided = Arc::new(RecordingDesktop::with_permission(PermissionStatus::Default));
    let notifier = hidden_notifier(undecided.clone());
    assert!(notifier.request_permission());
    assert_eq!(undecided.prompts.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.permission_status(), PermissionStatus::Granted);

    let refusing = Arc::new(RecordingDesktop {
        grant_on_request: false,
        ..RecordingDesktop::with_permission(PermissionStatus::Default)
    });
    assert!(!hidden_notifier(refusing.clone()).request_permission());
    assert_eq!(refusing.prompts.load(Ordering::SeqCst), 1);
}

#[test]
fn close_and_close_all() {
    let backend = Arc::new(RecordingDesktop::granted());
    let notifier = hidden_notifier(backend.clone());
    for tag in ["a", "b", "c"] {
        notifier
            .show_notification(DesktopRequest::new("t", "b", tag))
            .unwrap();
    }

    assert!(notifier.close("b"));
    assert!(!notifier.close("b"));
    assert_eq!(notifier.active_tags(), vec!["a".to_string(), "c".to_string()]);

    assert_eq!(notifier.close_all(), 2);
    assert!(notifier.active_tags().is_empty());
    assert_eq!(backend.closed().len(), 3);
}

#[test]
fn backend_failure_is_swallowed() {
    let backend = Arc::new(RecordingDesktop {
        fail_show: true,
        ..RecordingDesktop::granted()
    });
    let notifier = hidden_notifier(backend);
    assert!(
        notifier
            .show_notification(DesktopRequest::new("t", "b", "x"))
            .is_none()
    );
    assert!(notifier.active_tags().is_empty());
}

#[test]
fn unsupported_backend_reports_unsupported() {
    let notifier = DesktopNotifier::new(Arc::new(UnsupportedDesktop), VisibilityTracker::new(false));
    assert!(!notifier.is_supported());
    assert_eq!(notifier.permission_status(), PermissionStatus::Unsupported);
    assert!(!notifier.request_permission());
    assert!(
        notifier
            .show_notification(DesktopRequest::new("t", "b", "x"))
            .is_none()
    );
}

/// Mimics a freedesktop server: `replaces_id` keeps the id, otherwise a
/// fresh one is allocated.
#[derive(Default)]
struct IdAssigningDesktop {
    ids: server_ids::ServerIds,
    next_id: AtomicUsize,
    used: Mutex<Vec<u32>>,
}

struct IdHandle {
    tag: String,
    claim: server_ids::Claim,
    ids: server_ids::ServerIds,
}

impl DesktopHandle for IdHandle {
    fn close(&self) {
        self.ids.release(&self.tag, self.claim);
    }
}

impl DesktopBackend for IdAssigningDesktop {
    fn is_supported(&self) -> bool {
        true
    }

    fn permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    fn show(
        &self,
        content: &DesktopContent,
        _activate: ActivateHook,
    ) -> Result<Box<dyn DesktopHandle>, DesktopError> {
        let id = self
            .ids
            .replacement_for(&content.tag)
            .unwrap_or_else(|| self.next_id.fetch_add(1, Ordering::SeqCst) as u32 + 1);
        let claim = self.ids.claim(&content.tag, id).unwrap();
        self.used.lock().unwrap().push(id);
        Ok(Box::new(IdHandle {
            tag: content.tag.clone(),
            claim,
            ids: self.ids.clone(),
        }))
    }

    fn focus_app(&self) {}
}

#[test]
fn repeated_tag_keeps_replacing_the_same_server_notification() {
    let backend = Arc::new(IdAssigningDesktop::default());
    let notifier = DesktopNotifier::new(backend.clone(), VisibilityTracker::new(false));

    for body in ["one", "two", "three", "four"] {
        assert!(
            notifier
                .show_notification(DesktopRequest::new("Ann", body, "message-c1"))
                .is_some()
        );
    }

    assert_eq!(*backend.used.lock().unwrap(), vec![1, 1, 1, 1]);
    assert_eq!(notifier.active_tags(), vec!["message-c1".to_string()]);
}

#[test]
fn closing_forgets_the_server_id() {
    let backend = Arc::new(IdAssigningDesktop::default());
    let notifier = DesktopNotifier::new(backend.clone(), VisibilityTracker::new(false));

    notifier.show_notification(DesktopRequest::new("t", "b", "payment-p1"));
    assert!(notifier.close("payment-p1"));
    assert_eq!(backend.ids.replacement_for("payment-p1"), None);

    notifier.show_notification(DesktopRequest::new("t", "b", "payment-p1"));
    assert_eq!(*backend.used.lock().unwrap(), vec![1, 2]);
}

#[test]
fn stale_release_keeps_newer_claim_on_the_same_id() {
    let ids = server_ids::ServerIds::default();
    let first = ids.claim("agreement-a1", 4).unwrap();
    let second = ids.claim("agreement-a1", 4).unwrap();
    ids.release("agreement-a1", first);
    assert_eq!(ids.replacement_for("agreement-a1"), Some(4));
    ids.release("agreement-a1", second);
    assert_eq!(ids.replacement_for("agreement-a1"), None);
}
