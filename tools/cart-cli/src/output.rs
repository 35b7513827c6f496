//! Output formatting for the CLI.

use cart_core::{Cart, CartItem};
use console::style;

/// Output handler for CLI messages.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    /// Create a new output handler.
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    /// Print an info message.
    pub fn info(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("ℹ").blue(), msg);
    }

    /// Print a success message.
    pub fn success(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("{} {}", style("✓").green(), msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: &str) {
        if self.json {
            return;
        }
        eprintln!("{} {}", style("⚠").yellow(), msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
            return;
        }
        eprintln!("{} {}", style("✗").red(), style(msg).red());
    }

    /// Print a debug message (only in verbose mode).
    pub fn debug(&self, msg: &str) {
        if !self.verbose || self.json {
            return;
        }
        eprintln!("{} {}", style("→").dim(), style(msg).dim());
    }

    /// Print a header/title.
    pub fn header(&self, msg: &str) {
        if self.json {
            return;
        }
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print JSON output.
    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    /// Print a key-value pair.
    pub fn kv(&self, key: &str, value: &str) {
        if self.json {
            return;
        }
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(&self, item: &str) {
        if self.json {
            return;
        }
        println!("  {} {}", style("•").dim(), item);
    }

    /// Print a table row.
    pub fn table_row(&self, cols: &[&str], widths: &[usize]) {
        if self.json {
            return;
        }
        let formatted: Vec<String> = cols
            .iter()
            .zip(widths.iter())
            .map(|(col, width)| format!("{:width$}", col, width = width))
            .collect();
        println!("  {}", formatted.join("  ").trim_end());
    }

    /// Print items as a table, or as a JSON array in JSON mode.
    pub fn items(&self, items: &[CartItem]) {
        if self.json {
            self.json(&items);
            return;
        }
        if items.is_empty() {
            self.info("No items");
            return;
        }

        const WIDTHS: [usize; 5] = [20, 24, 10, 5, 10];
        self.table_row(&["SKU", "NAME", "PRICE", "QTY", "TOTAL"], &WIDTHS);
        for item in items {
            self.table_row(
                &[
                    item.sku.as_str(),
                    truncate(&item.name, WIDTHS[1]).as_str(),
                    format_money(item.price).as_str(),
                    item.quantity.to_string().as_str(),
                    format_money(item.line_total()).as_str(),
                ],
                &WIDTHS,
            );
        }
    }

    /// Print a cart with its aggregates.
    pub fn cart(&self, cart: &Cart) {
        if self.json {
            self.json(&cart_core::PersistedEnvelope::from_cart(cart));
            return;
        }
        self.items(&cart.items);
        println!();
        self.kv("items", &cart.total_items().to_string());
        self.kv("total", &format_money(cart.total_amount()));
        self.kv("source", &cart.source);
        self.kv("updated", &cart.timestamp.to_rfc3339());
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// Format an amount with two decimals.
pub fn format_money(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Shorten text to `max` characters, marking the cut with `…`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(19.9), "19.90");
        assert_eq!(format_money(0.0), "0.00");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long product name", 8), "a very …");
    }
}
