use rfd::{MessageButtons, MessageDialog, MessageLevel};

/// Out-of-band message to the operator.
pub trait Notifier {
    /// Show `message` and block until the operator acknowledges it.
    fn notify(&mut self, title: &str, message: &str);
}

/// Native warning dialog.
#[derive(Default)]
pub struct DialogNotifier;

impl Notifier for DialogNotifier {
    fn notify(&mut self, title: &str, message: &str) {
        let _ = MessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }
}
