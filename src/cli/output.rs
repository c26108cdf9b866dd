// Output formatting for the snapshot command

use crate::telemetry::{CheckStatus, Emission};
use colored::*;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Print captured emissions as a table
pub fn print_emissions(emissions: &[Emission], global_tags: &[String]) {
    if emissions.is_empty() {
        println!("{}", "Nothing would be sent".yellow());
        return;
    }

    #[derive(Tabled)]
    struct EmissionRow {
        #[tabled(rename = "Type")]
        kind: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Tags")]
        tags: String,
    }

    let rows: Vec<EmissionRow> = emissions
        .iter()
        .map(|emission| EmissionRow {
            kind: emission.kind().to_string(),
            name: emission.name().to_string(),
            value: format_value(emission),
            tags: emission.tags().join(","),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}\n", table);

    if !global_tags.is_empty() {
        println!("  {}: {}", "Global tags".bold(), global_tags.join(","));
    }
    println!(
        "{}",
        format!("Total: {} emission(s)", emissions.len())
            .dimmed()
            .italic()
    );
}

fn format_value(emission: &Emission) -> String {
    match emission {
        Emission::Gauge { value, .. } => format_gauge(*value),
        Emission::Timing { millis, .. } => format!("{}ms", millis),
        Emission::Check { status, .. } => format_status_colored(*status),
        Emission::Event { options, .. } => options
            .alert_type
            .map(|alert_type| alert_type.as_str().to_string())
            .unwrap_or_else(|| "-".to_string()),
    }
}

/// Integral gauges print without a fraction
fn format_gauge(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.3}", value)
    }
}

fn format_status_colored(status: CheckStatus) -> String {
    match status {
        CheckStatus::Ok => status.to_string().green().to_string(),
        CheckStatus::Warning => status.to_string().yellow().to_string(),
        CheckStatus::Critical => status.to_string().red().bold().to_string(),
        CheckStatus::Unknown => status.to_string().bright_black().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_gauge() {
        assert_eq!(format_gauge(3.0), "3");
        assert_eq!(format_gauge(0.5), "0.500");
        assert_eq!(format_gauge(2.0 / 3.0), "0.667");
    }

    #[test]
    fn test_format_timing() {
        let emission = Emission::Timing {
            name: "pm2.processes.uptime".to_string(),
            millis: 4000,
            tags: Vec::new(),
        };
        assert_eq!(format_value(&emission), "4000ms");
    }
}
