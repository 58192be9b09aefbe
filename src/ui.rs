use colored::*;
use terminal_size::{terminal_size, Height, Width};

use crate::agent::ResponseEnvelope;
use crate::tools::ToolDefinition;

pub fn print_header(title: &str, detail: &str) {
    let (width, _) = terminal_size().unwrap_or((Width(80), Height(24)));
    let width = width.0 as usize;

    let line = "─".repeat(width);
    println!("{}", line.black().bold());

    // Logo + Name
    let logo = "🚜";
    let name = "Fieldhand".yellow().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();

    println!("  {} {} {}", logo, name, version);

    // Model + provider, or what the screen is for
    let info = format!("  {}  •  {}", title, detail).cyan();
    println!("{}", info);

    println!("{}", line.black().bold());
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠️ ".yellow().bold(), msg.yellow());
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "❌".red().bold(), msg.red());
}

pub fn print_thinking(msg: &str) {
    println!("  {} {}...", "∴".magenta(), msg);
}

/// Print a reply the way the messaging layer would deliver it
pub fn print_envelope(envelope: &ResponseEnvelope) {
    println!("\n{}: {}", "Bot".green().bold(), envelope.text);

    for url in &envelope.images {
        println!("  {} {}", "🖼".cyan(), url.cyan());
    }
    for document in &envelope.documents {
        println!("  {} {} ({})", "📄".cyan(), document.filename.bold(), document.url);
    }
    println!();
}

/// List tool declarations with their required arguments
pub fn print_tools(definitions: &[ToolDefinition]) {
    for definition in definitions {
        println!("  {} {}", "•".green(), definition.name.yellow().bold());
        println!("    {}", definition.description);

        let required: Vec<&str> = definition.parameters["required"]
            .as_array()
            .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        if !required.is_empty() {
            println!("    {} {}", "requires:".black().bold(), required.join(", "));
        }
    }
}
