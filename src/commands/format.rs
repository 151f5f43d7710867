//! Shared output helpers for commands

use kinship_core::error::Result;
use kinship_core::ScoreBreakdown;
use serde::Serialize;

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `text 0.80, image -, tag 0.50`
pub fn format_breakdown(breakdown: &ScoreBreakdown) -> String {
    let signal = |value: Option<f64>| match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    };
    format!(
        "text {:.2}, image {}, tag {}",
        breakdown.text,
        signal(breakdown.image),
        signal(breakdown.tag)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_breakdown_marks_missing_signals() {
        let breakdown = ScoreBreakdown {
            text: 0.8,
            image: None,
            tag: Some(0.5),
        };
        assert_eq!(format_breakdown(&breakdown), "text 0.80, image -, tag 0.50");
    }
}
