//! CLI output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use crate::auth::{CurrentUser, Role, SessionClaims};

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

fn role_color(role: Role) -> Color {
    match role {
        Role::Admin => Color::Red,
        Role::Instructor => Color::Yellow,
        Role::Student => Color::Green,
        Role::Unknown => Color::Grey,
    }
}

/// Print the signed-in user as a table
pub fn print_user_table(user: &CurrentUser) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(Color::Cyan),
            Cell::new("Email").fg(Color::Cyan),
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("Role").fg(Color::Cyan),
        ]);

    let id = if user.user_id == 0 {
        "-".to_string()
    } else {
        user.user_id.to_string()
    };

    table.add_row(vec![
        Cell::new(id),
        Cell::new(&user.email),
        Cell::new(user.name.as_deref().unwrap_or("-")),
        Cell::new(user.role).fg(role_color(user.role)),
    ]);

    println!("{table}");
}

/// Print decoded token claims
pub fn print_claims(claims: &SessionClaims, now: i64) {
    println!("{}", "Token Claims".bold().underline());
    println!();
    println!(
        "  {} {}",
        "Subject:".bold(),
        claims.sub.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
    );
    println!("  {} {}", "Email:".bold(), claims.email.as_deref().unwrap_or("-"));
    println!("  {} {}", "Name:".bold(), claims.name.as_deref().unwrap_or("-"));
    println!(
        "  {} {}",
        "Role:".bold(),
        claims.role.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
    );

    match claims.exp {
        Some(exp) => {
            let when = chrono::DateTime::from_timestamp(exp, 0)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| exp.to_string());
            let status = if claims.is_expired_at(now) {
                "expired".red()
            } else {
                "valid".green()
            };
            println!("  {} {} ({})", "Expires:".bold(), when, status);
        }
        None => println!("  {} never", "Expires:".bold()),
    }
}
