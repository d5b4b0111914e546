//! Report writers
//!
//! Each generator renders a [`RunReport`] to a writer so the output can go
//! to stdout or a file unchanged.

use anyhow::Result;
use colored::Colorize;
use std::io::Write;

use crate::analysis::RunReport;

pub fn generate_console_report<W: Write>(out: &mut W, report: &RunReport) -> Result<()> {
    let summary = &report.summary;

    writeln!(out)?;
    writeln!(out, "{}", "📊 Progression Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "======================".cyan())?;
    writeln!(out, "Run id: {}", summary.run_id)?;
    writeln!(
        out,
        "Duration: {} ({} days)",
        summary.duration_human, summary.days
    )?;
    writeln!(out, "Outcome: {}", summary.stop_reason.bold())?;
    writeln!(
        out,
        "Final balance: gold {:.2} / xp {} / keys {} / level {}",
        summary.final_gold, summary.final_xp, summary.final_keys, summary.final_user_level
    )?;
    writeln!(
        out,
        "Upgrades: {}  Level-ups: {}",
        summary.total_upgrades.to_string().green(),
        summary.total_level_ups.to_string().green()
    )?;
    writeln!(
        out,
        "Income: passive {:.0}, tapping {:.0}",
        summary.total_passive_income, summary.total_tapping_income
    )?;
    if summary.fault_count > 0 {
        writeln!(
            out,
            "Faults: {}",
            summary.fault_count.to_string().red().bold()
        )?;
    }
    writeln!(out)?;

    if report.stagnation.is_empty() {
        writeln!(out, "{}", "No stagnation periods detected.".green())?;
    } else {
        writeln!(out, "{}", "⏸️  Stagnation Periods".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        for period in &report.stagnation {
            writeln!(
                out,
                "  days {}..={} ({} days without an upgrade)",
                period.start_day,
                period.end_day,
                period.days().to_string().yellow()
            )?;
        }
    }
    writeln!(out)?;

    // The daily table gets noisy on long runs; show the busiest days.
    let mut busiest: Vec<_> = report.daily.iter().collect();
    busiest.sort_by(|a, b| b.upgrades.cmp(&a.upgrades).then(a.day.cmp(&b.day)));
    let shown = busiest.len().min(10);
    if shown > 0 {
        writeln!(out, "{}", "🔥 Busiest Days".bright_yellow().bold())?;
        writeln!(out, "{}", "===============".yellow())?;
        for day in busiest.iter().take(shown) {
            writeln!(
                out,
                "  day {:>4}: {:>3} upgrades, {:>2} level-ups, gold {:.0} -> {:.0}",
                day.day, day.upgrades, day.level_ups, day.gold_start, day.gold_end
            )?;
        }
    }

    Ok(())
}

pub fn generate_json_report<W: Write>(out: &mut W, report: &RunReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report<W: Write>(out: &mut W, report: &RunReport) -> Result<()> {
    let summary = &report.summary;

    writeln!(out, "# Progression Run Report\n")?;
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Run id**: {}", summary.run_id)?;
    writeln!(
        out,
        "- **Duration**: {} ({} days)",
        summary.duration_human, summary.days
    )?;
    writeln!(out, "- **Outcome**: {}", summary.stop_reason)?;
    writeln!(
        out,
        "- **Final balance**: gold {:.2}, xp {}, keys {}, level {}",
        summary.final_gold, summary.final_xp, summary.final_keys, summary.final_user_level
    )?;
    writeln!(out, "- **Upgrades**: {}", summary.total_upgrades)?;
    writeln!(out, "- **Level-ups**: {}", summary.total_level_ups)?;
    writeln!(out, "- **Faults**: {}\n", summary.fault_count)?;

    if !report.stagnation.is_empty() {
        writeln!(out, "## Stagnation Periods\n")?;
        writeln!(out, "| Start day | End day | Days |")?;
        writeln!(out, "|-----------|---------|------|")?;
        for period in &report.stagnation {
            writeln!(
                out,
                "| {} | {} | {} |",
                period.start_day,
                period.end_day,
                period.days()
            )?;
        }
        writeln!(out)?;
    }

    writeln!(out, "## Daily Breakdown\n")?;
    writeln!(
        out,
        "| Day | Gold start | Gold end | Passive | Tapping | Spent | Upgrades | Level-ups | Level |"
    )?;
    writeln!(
        out,
        "|-----|------------|----------|---------|---------|-------|----------|-----------|-------|"
    )?;
    for day in &report.daily {
        writeln!(
            out,
            "| {} | {:.0} | {:.0} | {:.0} | {:.0} | {} | {} | {} | {} |",
            day.day,
            day.gold_start,
            day.gold_end,
            day.passive_income,
            day.tapping_income,
            day.gold_spent,
            day.upgrades,
            day.level_ups,
            day.user_level_end
        )?;
    }

    Ok(())
}

pub fn generate_csv_report<W: Write>(out: &mut W, report: &RunReport) -> Result<()> {
    writeln!(
        out,
        "day,gold_start,gold_end,passive_income,tapping_income,gold_spent,upgrades,level_ups,xp_end,keys_end,user_level_end"
    )?;
    for day in &report.daily {
        writeln!(
            out,
            "{},{:.2},{:.2},{:.2},{:.2},{},{},{},{},{},{}",
            day.day,
            day.gold_start,
            day.gold_end,
            day.passive_income,
            day.tapping_income,
            day.gold_spent,
            day.upgrades,
            day.level_ups,
            day.xp_end,
            day.keys_end,
            day.user_level_end
        )?;
    }
    Ok(())
}
