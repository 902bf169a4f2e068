//! Delivery channels for real-time notifications.
//!
//! Page visibility tracking, audio cues and OS-level notifications.
//! Each service is constructed once by the application and shared by
//! reference; none of them keeps global state.

pub mod desktop;
pub mod sound;
pub mod visibility;

pub use desktop::{DesktopNotifier, DesktopRequest, PermissionStatus};
pub use sound::{SoundCategory, SoundKey, SoundManager, SoundPreferences};
pub use visibility::{Subscription, VisibilityTracker};
