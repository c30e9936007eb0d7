use async_trait::async_trait;
use windup_core::launch::{Notice, NoticeLevel, Notifier};

/// Prints notices to stderr, where a GUI would open a message box.
pub struct StderrNotifier;

#[async_trait]
impl Notifier for StderrNotifier {
    async fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(title = %notice.title, "{}", notice.message),
            NoticeLevel::Error => tracing::error!(title = %notice.title, "{}", notice.message),
        }
        eprintln!("{}: {}", notice.title, notice.message);
    }
}
