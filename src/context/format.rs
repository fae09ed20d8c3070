//! Prompt text for an [`ErrorContext`].

use super::ErrorContext;

impl ErrorContext {
    /// Render the context as the plain-text block sent to the model.
    ///
    /// Section order is fixed: `Command:`, `Shell:`, `OS:`, an optional
    /// numbered `Recent command history:` list, then `Error output:`.
    pub fn format_for_prompt(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("Command: {}\n", self.command));
        out.push_str(&format!("Shell: {}\n", self.shell));
        out.push_str(&format!("OS: {}\n", self.os));

        if !self.recent_commands.is_empty() {
            out.push_str("\nRecent command history:\n");
            for (i, cmd) in self.recent_commands.iter().enumerate() {
                out.push_str(&format!("  {}. {}\n", i + 1, cmd));
            }
        }

        out.push_str("\nError output:\n");
        out.push_str(&self.error);
        out
    }
}
