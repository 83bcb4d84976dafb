//! Plain-text output for the CLI.

use ingrdnt_core::{AlternativeSuggestion, DietaryStatus, IngredientRecord, ScanRecord, ScanResult};

pub fn print_scan(result: &ScanResult) {
    let product = &result.product;
    println!("{}", product.name());
    if let Some(code) = product.code_or_id() {
        println!("  barcode:    {code}");
    }
    if let Some(grade) = &product.nutriscore_grade {
        println!("  nutriscore: {}", grade.to_uppercase());
    }
    if !product.category().is_empty() {
        println!("  category:   {}", product.category());
    }

    let harmful = result.harmful().count();
    println!();
    println!(
        "Ingredients ({} total, {} flagged harmful)",
        result.flagged.len(),
        harmful
    );
    print_records(&result.flagged);

    println!();
    print_alternatives(&result.alternatives);
}

pub fn print_records(records: &[IngredientRecord]) {
    if records.is_empty() {
        println!("  (no ingredients listed)");
        return;
    }

    for record in records {
        let marker = match (record.harmful, record.beneficial) {
            (true, _) => "!",
            (false, true) => "+",
            (false, false) => " ",
        };
        let mut line = format!("  {marker} {}", record.name);
        if let Some(nova) = record.nova {
            line.push_str(&format!("  [nova {nova}]"));
        }
        if record.vegan == DietaryStatus::No {
            line.push_str("  [not vegan]");
        }
        if let Some(reason) = &record.reason {
            line.push_str(&format!("  ({reason})"));
        }
        println!("{line}");

        if !record.allergens.is_empty() {
            let allergens: Vec<&str> = record.allergens.iter().map(String::as_str).collect();
            println!("      allergens: {}", allergens.join(", "));
        }
    }
}

pub fn print_alternatives(suggestions: &[AlternativeSuggestion]) {
    if suggestions.is_empty() {
        println!("No alternatives found");
        return;
    }
    println!("Alternatives:");
    for suggestion in suggestions {
        println!("  - {suggestion}");
    }
}

pub fn print_history(records: &[ScanRecord]) {
    if records.is_empty() {
        println!("No scans recorded");
        return;
    }
    for record in records {
        println!(
            "{}  {:<14} {}",
            record.scanned_at.format("%Y-%m-%d %H:%M"),
            record.code,
            record.name
        );
    }
}
