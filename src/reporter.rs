use crate::config::RunConfiguration;
use crate::dispatch::AuditOutcome;
use colored::*;
use std::time::Instant;

pub fn print_human_report(config: &RunConfiguration, outcome: &AuditOutcome, start_time: Instant) {
    print_banner();

    match outcome {
        AuditOutcome::Skipped => {
            println!(
                "{} {}",
                "•".dimmed(),
                "Not a pull-request build, run skipped".dimmed()
            );
        }
        AuditOutcome::Scored { score } => {
            // Pass/fail against the threshold is decided by the CI service
            println!(
                "{} Lighthouse score: {}",
                "›".bold(),
                format_score(*score).bold()
            );
            if let Some(min) = config.min_pass_score {
                println!(
                    "  {} {}",
                    "Minimum score:".dimmed(),
                    format_score(min).dimmed()
                );
            }
        }
        AuditOutcome::Scheduled { target_url } => {
            println!("{} WebPageTest run started: {}", "›".bold(), target_url.bold());
            println!(
                "  {}",
                "Results will be reported on the pull request".dimmed()
            );
        }
    }

    println!();
    println!(
        "Done: {} {} {:.2}s",
        config.test_url,
        "·".dimmed(),
        start_time.elapsed().as_secs_f64()
    );
}

pub fn print_human_error(msg: &str) {
    eprintln!("{} {}", "×".bright_red(), msg.bright_red());
}

pub fn print_json_report(outcome: &AuditOutcome) {
    match serde_json::to_string_pretty(outcome) {
        Ok(json_output) => println!("{}", json_output),
        Err(e) => print_json_error(&format!("Failed to serialize result to JSON: {}", e)),
    }
}

pub fn print_json_error(msg: &str) {
    let error_json = serde_json::json!({
        "error": msg
    });
    println!("{}", error_json);
}

fn print_banner() {
    println!(
        "{} {} v{}",
        "⛯".bold(),
        "lighthouse-ci".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
}

/// Whole scores print without a fractional part.
fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{}", score as i64)
    } else {
        format!("{:.1}", score)
    }
}
