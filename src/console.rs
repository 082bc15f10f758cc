//! Startup banner with colors.

use colored::Colorize;

pub fn print_banner() {
    println!();
    println!("{}", "╔═══════════════════════════════════════════════════════════╗".cyan());
    println!("{}", "║                                                           ║".cyan());
    println!("║     {}                                  ║", "✉ Verigate v0.1.0".bold().white());
    println!("║     {}             ║", "Single-use email verification tokens".dimmed());
    println!("{}", "║                                                           ║".cyan());
    println!("{}", "╚═══════════════════════════════════════════════════════════╝".cyan());
    println!();
}

pub fn print_startup(addr: &str, backend: &str, mail_enabled: bool) {
    println!("{} {}", "✓".green().bold(), "Server ready".white().bold());
    println!("  {} {}", "→".dimmed(), format!("http://{}", addr).cyan().underline());
    println!("  {} token store: {}", "→".dimmed(), backend.white());
    if mail_enabled {
        println!("  {} mail delivery: {}", "→".dimmed(), "enabled".green());
    } else {
        println!("  {} mail delivery: {}", "→".dimmed(), "disabled (links logged)".yellow());
    }
    println!();
    println!("{}", "Endpoints:".white().bold());
    println!("  {} {}  {}", "POST".yellow(), "/register".white(), "Create pending account, mail link".dimmed());
    println!("  {} {}  {}", "POST".yellow(), "/resend-verification".white(), "Re-issue confirmation link".dimmed());
    println!("  {} {}  {}", "GET ".green(), "/verify-email".white(), "Consume token from link".dimmed());
    println!("  {} {}  {}", "POST".yellow(), "/verify-email".white(), "Consume token (JSON)".dimmed());
    println!("  {} {}  {}", "POST".yellow(), "/login".white(), "Password login".dimmed());
    println!("  {} {} {}", "GET ".green(), "/metrics".white(), "Telemetry".dimmed());
    println!("  {} {} {}", "GET ".green(), "/health".white(), "Health check".dimmed());
    println!();
}
