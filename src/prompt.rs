//! Interactive questions asked before scanning.

use std::fmt;
use std::path::PathBuf;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

use crate::database::DatabaseStatus;
use crate::targets::{TargetGroup, TargetSelection};

/// What: Operator's answer to the update question.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateChoice {
    /// Run the updater now.
    UpdateNow,
    /// The database was refreshed by hand; continue without updating.
    AlreadyUpdated,
    /// Skip the update and scan with the current database.
    Skip,
}

impl UpdateChoice {
    /// Choices in menu order.
    pub const ALL: [Self; 3] = [Self::UpdateNow, Self::AlreadyUpdated, Self::Skip];

    /// Menu label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::UpdateNow => "Yes",
            Self::AlreadyUpdated => "No, I have manually updated it",
            Self::Skip => "Skip update and continue with scan",
        }
    }
}

/// What: Failure to obtain an answer.
#[derive(Debug)]
pub enum PromptError {
    /// Terminal I/O failed.
    Terminal(dialoguer::Error),
    /// The operator dismissed the prompt (Esc or `q`).
    Dismissed,
}

impl PromptError {
    /// What: Whether the operator backed out (Esc, `q` or Ctrl+C in raw mode).
    ///
    /// Details:
    /// - Ctrl+C while a menu holds the terminal in raw mode arrives as an
    ///   `Interrupted` I/O error instead of a signal.
    #[must_use]
    pub fn is_interrupt(&self) -> bool {
        match self {
            Self::Dismissed => true,
            Self::Terminal(e) => std::error::Error::source(e)
                .and_then(|s| s.downcast_ref::<std::io::Error>())
                .is_some_and(|io| io.kind() == std::io::ErrorKind::Interrupted),
        }
    }
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal(e) => write!(f, "prompt failed: {e}"),
            Self::Dismissed => f.write_str("prompt dismissed"),
        }
    }
}

impl std::error::Error for PromptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Terminal(e) => Some(e),
            Self::Dismissed => None,
        }
    }
}

impl From<dialoguer::Error> for PromptError {
    fn from(value: dialoguer::Error) -> Self {
        Self::Terminal(value)
    }
}

/// What: Source of operator decisions.
///
/// Details:
/// - [`TerminalPrompter`] asks on the terminal; tests script the answers.
pub trait Prompter {
    /// Ask whether to refresh the signature database.
    ///
    /// # Errors
    /// - `PromptError` when no answer could be read.
    fn update_choice(&mut self, status: Option<&DatabaseStatus>) -> Result<UpdateChoice, PromptError>;

    /// Ask which targets to scan; `default_path` seeds the custom path input.
    ///
    /// # Errors
    /// - `PromptError` when no answer could be read.
    fn target_selection(&mut self, default_path: &str) -> Result<TargetSelection, PromptError>;

    /// Ask a yes/no question, defaulting to "no".
    ///
    /// # Errors
    /// - `PromptError` when no answer could be read.
    fn confirm(&mut self, question: &str) -> Result<bool, PromptError>;
}

/// Prompter backed by `dialoguer`.
#[derive(Default)]
pub struct TerminalPrompter {
    /// Shared menu styling.
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    /// Create a prompter with the colourful theme.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for TerminalPrompter {
    fn update_choice(&mut self, status: Option<&DatabaseStatus>) -> Result<UpdateChoice, PromptError> {
        let question = status.map_or_else(
            || "Do you want to update the ClamAV database?".to_string(),
            |s| {
                format!(
                    "Do you want to update the ClamAV database? (last updated {}, {:.1} days ago)",
                    s.modified_display(),
                    s.age_days
                )
            },
        );
        let labels: Vec<&str> = UpdateChoice::ALL.iter().map(|c| c.label()).collect();
        let idx = Select::with_theme(&self.theme)
            .with_prompt(question)
            .items(&labels)
            .default(0)
            .interact_opt()?
            .ok_or(PromptError::Dismissed)?;
        UpdateChoice::ALL
            .get(idx)
            .copied()
            .ok_or(PromptError::Dismissed)
    }

    fn target_selection(&mut self, default_path: &str) -> Result<TargetSelection, PromptError> {
        let mut labels: Vec<&str> = TargetGroup::ALL.iter().map(|g| g.label()).collect();
        labels.push("Custom path");
        let idx = Select::with_theme(&self.theme)
            .with_prompt("Choose a scan option")
            .items(&labels)
            .default(0)
            .interact_opt()?
            .ok_or(PromptError::Dismissed)?;
        if let Some(group) = TargetGroup::ALL.get(idx) {
            return Ok(TargetSelection::Group(*group));
        }
        let path: String = Input::with_theme(&self.theme)
            .with_prompt("Enter the custom path you want to scan")
            .default(default_path.to_string())
            .interact_text()?;
        Ok(TargetSelection::Custom(PathBuf::from(path.trim())))
    }

    fn confirm(&mut self, question: &str) -> Result<bool, PromptError> {
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(question)
            .default(false)
            .interact()?)
    }
}
