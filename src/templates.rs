//! Prompt templates.
//!
//! Templates are embedded at compile time from the `templates/` directory.
//! This ensures they're always available and versioned with the codebase.

/// Default sales assistant instructions (templated mode)
pub const SALES_AGENT: &str = include_str!("../templates/sales_agent.md");

/// Cabin reservations assistant instructions
pub const RESERVATIONS_AGENT: &str = include_str!("../templates/reservations_agent.md");

/// All template file names and their content
pub const TEMPLATES: &[(&str, &str)] = &[
    ("sales_agent.md", SALES_AGENT),
    ("reservations_agent.md", RESERVATIONS_AGENT),
];

/// Write the templates into `<workspace>/templates` so admins can copy
/// them into an advanced-mode `system_prompt`.
/// Only creates files that don't already exist.
pub fn bootstrap_workspace(workspace: &std::path::Path) -> std::io::Result<()> {
    let dir = workspace.join("templates");
    std::fs::create_dir_all(&dir)?;
    for (filename, content) in TEMPLATES {
        let path = dir.join(filename);
        if !path.exists() {
            std::fs::write(&path, content)?;
        }
    }
    Ok(())
}
