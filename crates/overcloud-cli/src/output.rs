use overcloud_core::store::OutcomeSummary;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);

    /// Per-backend result of a mutating command
    fn outcome(&self, action: &str, summary: &OutcomeSummary);

    /// Yes/no answer of a query command
    fn answer(&self, query: &str, path: &str, value: bool);

    /// Entry names of a directory
    fn listing(&self, path: &str, names: &[String]);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}

    fn outcome(&self, action: &str, summary: &OutcomeSummary) {
        match &summary.path {
            Some(path) => self.success(&format!("{action} {path}")),
            None => self.success(action),
        }
        self.info(&format!("local:   {}", summary.local));
        self.info(&format!("dropbox: {}", summary.remote));
    }

    fn answer(&self, _query: &str, _path: &str, value: bool) {
        println!("{value}");
    }

    fn listing(&self, _path: &str, names: &[String]) {
        for name in names {
            println!("{name}");
        }
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }

    fn outcome(&self, action: &str, summary: &OutcomeSummary) {
        self.print_json(&serde_json::json!({
            "action": action,
            "path": summary.path,
            "local": summary.local,
            "remote": summary.remote,
        }));
    }

    fn answer(&self, query: &str, path: &str, value: bool) {
        self.print_json(&serde_json::json!({
            "query": query,
            "path": path,
            "result": value,
        }));
    }

    fn listing(&self, path: &str, names: &[String]) {
        self.print_json(&serde_json::json!({
            "path": path,
            "entries": names,
        }));
    }
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}
