use std::io::IsTerminal;
use colored::*;
use serde::{Serialize, Deserialize};

/// Semantic role of a piece of highlighted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Start,
    Ok,
    Pending,
    Warning,
}

/// When to emit color markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

/// Applies or strips terminal markup for a [`Role`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        if enabled {
            // The `colored` crate otherwise consults the environment on every call.
            colored::control::set_override(true);
        }
        Self { enabled }
    }

    /// A palette that never adds markup.
    pub fn plain() -> Self {
        Self { enabled: false }
    }

    /// Resolves a [`ColorChoice`]; `Auto` only colors a terminal stdout.
    pub fn for_choice(choice: ColorChoice, writes_to_stdout: bool) -> Self {
        match choice {
            ColorChoice::Always => Self::new(true),
            ColorChoice::Never => Self::plain(),
            ColorChoice::Auto => Self::new(writes_to_stdout && std::io::stdout().is_terminal()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn paint(&self, role: Role, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }

        let colored = match role {
            Role::Start => text.cyan(),
            Role::Ok => text.green().bold(),
            Role::Pending => text.yellow().bold(),
            Role::Warning => text.red().bold(),
        };
        colored.to_string()
    }
}
