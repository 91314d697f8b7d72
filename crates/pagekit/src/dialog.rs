//! Alert dialogs raised by the page under test.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::PageResult;
use crate::session::Session;

/// Action taken on a dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogAction {
    /// Dialog was accepted (OK/Yes/Leave)
    Accept,
    /// Dialog was dismissed (Cancel/No/Stay)
    Dismiss,
    /// Not yet handled
    Pending,
}

impl fmt::Display for DialogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Dismiss => write!(f, "dismiss"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

/// An open alert, obtained from [`Session::alert`] or
/// [`Page::alert`](crate::Page::alert)
pub struct Alert {
    session: Session,
    text: String,
    action: DialogAction,
}

impl fmt::Debug for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alert")
            .field("text", &self.text)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

impl Alert {
    pub(crate) fn new(session: Session, text: String) -> Self {
        Self {
            session,
            text,
            action: DialogAction::Pending,
        }
    }

    /// Message displayed in the dialog
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn action(&self) -> DialogAction {
        self.action
    }

    #[must_use]
    pub fn is_handled(&self) -> bool {
        self.action != DialogAction::Pending
    }

    /// Accept the dialog
    pub fn accept(&mut self) -> PageResult<()> {
        self.session.driver().accept_alert()?;
        self.action = DialogAction::Accept;
        Ok(())
    }

    /// Dismiss the dialog
    pub fn dismiss(&mut self) -> PageResult<()> {
        self.session.driver().dismiss_alert()?;
        self.action = DialogAction::Dismiss;
        Ok(())
    }
}
