use anyhow::Result;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::Path;

use crate::analysis::{
    month_name, month_number, BillQuery, BillsAnalysis, SummaryFilter, DEFAULT_CITY_LIMIT,
};
use crate::db::{BillFilter, Database};
use crate::error::AnalysisError;
use crate::models::{Bill, BillKey, Company};
use crate::transfer::parse_decimal;
use crate::ui::util::{format_amount, format_stat};

pub(crate) fn as_cli(args: &[String], db: &mut Database) -> Result<()> {
    let rest = &args[2..];
    let result = match args[1].as_str() {
        "companies" => cli_companies(rest, db),
        "company" => cli_company(rest, db),
        "bills" => cli_bills(rest, db),
        "bill" => cli_bill(rest, db),
        "average" | "avg" | "median" | "mode" => cli_stat(&args[1], rest, db),
        "summary" | "s" => cli_summary(rest, db),
        "cities" => cli_cities(rest, db),
        "import" => cli_import(rest, db),
        "export" => cli_export(rest, db),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("bills-analyzer {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    };

    // Domain errors surface as-is, without the context chain.
    result.map_err(|e| match AnalysisError::from_anyhow(&e) {
        Some(domain) => {
            tracing::warn!(command = %args[1], error = %domain, "cli command rejected");
            anyhow::Error::new(domain.clone())
        }
        None => e,
    })
}

fn print_usage() {
    println!("Bills Analyzer - track monthly bills and analyze them");
    println!();
    println!("Usage: bills-analyzer [command]");
    println!();
    println!("Commands:");
    println!("  (none)                                  Launch interactive TUI");
    println!("  companies [filter]                      List companies (name contains filter)");
    println!("  company show <company>                  Show one company");
    println!("  company add <name>                      Add a company");
    println!("  company rename <company> <name>         Rename a company");
    println!("  company delete <company>                Delete a company and its bills");
    println!("  bills                                   List bills");
    println!("    --company <company>                   Only this company");
    println!("    --month <month> [--range <0-5>]       Only this month (± range months)");
    println!("    --year <YYYY>                         Only this year");
    println!("    --city <city>                         Only this city");
    println!("  bill show <company> <month> <year>      Show one bill");
    println!("  bill add <company> <month> <year> <amount> [city]");
    println!("  bill update <company> <month> <year> <amount> [city]");
    println!("  bill delete <company> <month> <year>");
    println!("  average|median|mode --month <month>     Statistics over bill amounts");
    println!("    --range <0-5>                         Include neighbouring months");
    println!("    --company <company>                   Only this company");
    println!("  summary [--month <month>] [--year <YYYY>]  Totals per company");
    println!("  cities <company> [--limit <n>]          Top cities by spending");
    println!("  import <file.csv>                       Import month,year,company,amount[,city]");
    println!("  export [path]                           Export bills to CSV (accepts bills filters)");
    println!("  --help, -h                              Show this help");
    println!("  --version, -V                           Show version");
    println!();
    println!("<company> is a company id or name. <month> is 1-12 or a month name.");
}

// ── Argument helpers ──────────────────────────────────────────

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

/// Arguments that are neither `--flags` nor their values.
fn positionals(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
        } else if arg.starts_with("--") {
            skip_next = true;
        } else {
            out.push(arg.as_str());
        }
    }
    out
}

fn parse_u32(value: &str, what: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| AnalysisError::invalid(format!("{what} must be a whole number")).into())
}

fn parse_year(value: &str) -> Result<i32> {
    value
        .trim()
        .parse()
        .map_err(|_| AnalysisError::invalid("Year must be 4 digits").into())
}

fn resolve_company(db: &Database, arg: &str) -> Result<Company> {
    let found = match arg.trim().parse::<i64>() {
        Ok(id) => db.get_company(id)?,
        Err(_) => db.get_company_by_name(arg)?,
    };
    found.ok_or_else(|| AnalysisError::not_found(format!("Company '{arg}' not found")).into())
}

fn bill_key(db: &Database, args: &[&str]) -> Result<(Company, u32, i32)> {
    let [company, month, year, ..] = args else {
        anyhow::bail!(AnalysisError::invalid("Expected <company> <month> <year>"));
    };
    let company = resolve_company(db, company)?;
    Ok((company, month_number(month)?, parse_year(year)?))
}

fn filter_from_flags(args: &[String], db: &Database) -> Result<BillFilter> {
    let mut filter = BillFilter::default();
    if let Some(c) = flag(args, "--company") {
        if let Some(id) = resolve_company(db, c)?.id {
            filter = filter.company(id);
        }
    }
    if let Some(m) = flag(args, "--month") {
        let mut query = BillQuery::month(month_number(m)?);
        if let Some(r) = flag(args, "--range") {
            query = query.with_range(parse_u32(r, "Range")?);
        }
        if let Some(months) = query.to_filter()?.months {
            filter = filter.months(months);
        }
    }
    if let Some(y) = flag(args, "--year") {
        filter = filter.year(parse_year(y)?);
    }
    if let Some(city) = flag(args, "--city") {
        filter = filter.city(city);
    }
    Ok(filter)
}

fn print_bills(bills: &[Bill]) {
    println!(
        "{:<10} {:<6} {:<24} {:<16} {:>12}",
        "Month", "Year", "Company", "City", "Amount"
    );
    println!("{}", "─".repeat(72));
    for bill in bills {
        println!(
            "{:<10} {:<6} {:<24} {:<16} {:>12}",
            month_name(bill.month),
            bill.year,
            bill.company.name,
            bill.city.as_deref().unwrap_or("-"),
            format_amount(bill.amount),
        );
    }
}

// ── Companies ─────────────────────────────────────────────────

fn cli_companies(args: &[String], db: &Database) -> Result<()> {
    let filter = args.first().map(String::as_str).unwrap_or("");
    let companies = db.find_companies(filter)?;
    if companies.is_empty() {
        println!("No companies");
        return Ok(());
    }
    let counts = db.get_bill_counts()?;

    println!("{:<6} {:<30} Bills", "ID", "Name");
    println!("{}", "─".repeat(44));
    for company in &companies {
        let id = company.id.unwrap_or(0);
        println!(
            "{:<6} {:<30} {}",
            id,
            company.name,
            counts.get(&id).copied().unwrap_or(0)
        );
    }
    Ok(())
}

fn cli_company(args: &[String], db: &Database) -> Result<()> {
    let usage = "Usage: bills-analyzer company show|add|rename|delete ...";
    let Some(action) = args.first() else {
        anyhow::bail!(usage);
    };
    let rest: Vec<&str> = args[1..].iter().map(String::as_str).collect();

    match (action.as_str(), rest.as_slice()) {
        ("show", [company]) => {
            let company = resolve_company(db, company)?;
            let id = company.id.unwrap_or(0);
            let count = db.get_bill_counts()?.get(&id).copied().unwrap_or(0);
            println!("{id}: {company} ({count} bills)");
        }
        ("add", name) if !name.is_empty() => {
            let name = name.join(" ");
            let id = db.insert_company(&Company::new(name.as_str()))?;
            println!("Added company {id}: {}", name.trim());
        }
        ("rename", [company, name @ ..]) if !name.is_empty() => {
            let company = resolve_company(db, company)?;
            let id = company.id.unwrap_or(0);
            let name = name.join(" ");
            if !db.update_company(id, &name)? {
                anyhow::bail!(AnalysisError::not_found(format!("Company {id} not found")));
            }
            println!("Renamed '{company}' to '{}'", name.trim());
        }
        ("delete", [company]) => {
            let company = resolve_company(db, company)?;
            let id = company.id.unwrap_or(0);
            db.delete_company(id)?;
            println!("Deleted company '{company}' and its bills");
        }
        _ => anyhow::bail!(usage),
    }
    Ok(())
}

// ── Bills ─────────────────────────────────────────────────────

fn cli_bills(args: &[String], db: &Database) -> Result<()> {
    let filter = filter_from_flags(args, db)?;
    let bills = db.get_bills(&filter)?;
    if bills.is_empty() {
        println!("No bills");
        return Ok(());
    }
    print_bills(&bills);
    let total = crate::analysis::total(bills.iter().map(|b| b.amount))?;
    println!("{}", "─".repeat(72));
    println!("{} bills, total {}", bills.len(), format_amount(total));
    Ok(())
}

fn cli_bill(args: &[String], db: &Database) -> Result<()> {
    let usage = "Usage: bills-analyzer bill show|add|update|delete <company> <month> <year> [amount] [city]";
    let Some(action) = args.first() else {
        anyhow::bail!(usage);
    };
    let rest: Vec<&str> = args[1..].iter().map(String::as_str).collect();

    match action.as_str() {
        "show" => {
            let (company, month, year) = bill_key(db, &rest)?;
            let key = BillKey::new(company.id.unwrap_or(0), month, year);
            let bill = db
                .get_bill(&key)?
                .ok_or_else(|| AnalysisError::not_found("Bill not found"))?;
            print_bills(&[bill]);
        }
        "add" | "update" => {
            let (company, month, year) = bill_key(db, &rest)?;
            let Some(amount) = rest.get(3) else {
                anyhow::bail!(AnalysisError::invalid("Amount is required"));
            };
            let amount = parse_decimal(amount)
                .map_err(|_| AnalysisError::invalid(format!("Invalid amount: {amount}")))?;
            let city = rest[4..].join(" ");
            let bill = Bill::new(month, year, company, amount).with_city(city);

            if action == "add" {
                if !db.insert_bill(&bill)? {
                    anyhow::bail!(AnalysisError::invalid(format!(
                        "A {} bill for {} {year} already exists",
                        bill.company,
                        month_name(month)
                    )));
                }
                println!("Added bill");
            } else {
                if !db.update_bill(&bill)? {
                    anyhow::bail!(AnalysisError::not_found("Bill not found"));
                }
                println!("Updated bill");
            }
            print_bills(&[bill]);
        }
        "delete" => {
            let (company, month, year) = bill_key(db, &rest)?;
            let key = BillKey::new(company.id.unwrap_or(0), month, year);
            if !db.delete_bill(&key)? {
                anyhow::bail!(AnalysisError::not_found("Bill not found"));
            }
            println!("Deleted {company} bill for {} {year}", month_name(month));
        }
        _ => anyhow::bail!(usage),
    }
    Ok(())
}

// ── Analysis ──────────────────────────────────────────────────

fn cli_stat(stat: &str, args: &[String], db: &Database) -> Result<()> {
    let Some(month) = flag(args, "--month") else {
        anyhow::bail!(AnalysisError::invalid("--month is required"));
    };
    let mut query = BillQuery::month(month_number(month)?);
    if let Some(r) = flag(args, "--range") {
        query = query.with_range(parse_u32(r, "Range")?);
    }
    let mut scope = query.describe();
    if let Some(c) = flag(args, "--company") {
        let company = resolve_company(db, c)?;
        query = query.for_company(company.id.unwrap_or(0));
        scope = format!("{company}, {scope}");
    }

    let analysis = BillsAnalysis::new(db);
    match stat {
        "median" => println!("Median ({scope}): {}", format_stat(analysis.median(&query)?)),
        "mode" => {
            let values: Vec<String> = analysis
                .mode(&query)?
                .into_iter()
                .map(format_stat)
                .collect();
            println!("Mode ({scope}): {}", values.join(", "));
        }
        _ => println!("Average ({scope}): {}", format_stat(analysis.average(&query)?)),
    }
    Ok(())
}

fn cli_summary(args: &[String], db: &Database) -> Result<()> {
    let filter = SummaryFilter {
        month: flag(args, "--month").map(month_number).transpose()?,
        year: flag(args, "--year").map(parse_year).transpose()?,
    };
    let lines = BillsAnalysis::new(db).summary(filter)?;
    if let Some((title, groups)) = lines.split_first() {
        println!("{title}");
        println!("{}", "─".repeat(title.chars().count()));
        for line in groups {
            println!("  {line}");
        }
    }
    Ok(())
}

fn cli_cities(args: &[String], db: &Database) -> Result<()> {
    let Some(company) = positionals(args).first().copied() else {
        anyhow::bail!("Usage: bills-analyzer cities <company> [--limit <n>]");
    };
    let company = resolve_company(db, company)?;
    let limit = match flag(args, "--limit") {
        Some(n) => parse_u32(n, "Limit")? as usize,
        None => DEFAULT_CITY_LIMIT,
    };

    let ranked = BillsAnalysis::new(db).city_spending(company.id.unwrap_or(0), limit)?;
    let max = ranked.first().map(|(_, v)| *v).unwrap_or(Decimal::ZERO);
    println!("Top cities for {company}");
    println!("{}", "─".repeat(60));
    for (city, total) in &ranked {
        let width = if max.is_zero() {
            0
        } else {
            (total / max * Decimal::from(30))
                .round()
                .to_usize()
                .unwrap_or(0)
        };
        println!(
            "  {:<20} {:>12}  {}",
            city,
            format_amount(*total),
            "█".repeat(width)
        );
    }
    Ok(())
}

// ── Transfer ──────────────────────────────────────────────────

fn cli_import(args: &[String], db: &mut Database) -> Result<()> {
    let Some(file_path) = positionals(args).first().copied() else {
        anyhow::bail!("Usage: bills-analyzer import <file.csv>");
    };
    let expanded = super::shellexpand(file_path);
    let path = Path::new(&expanded);
    if !path.exists() {
        anyhow::bail!("File not found: {file_path}");
    }

    let report = crate::transfer::import_bills(path, db)?;
    println!("Parsed {} bills", report.rows);
    if report.companies_created > 0 {
        println!("Created {} new companies", report.companies_created);
    }
    println!(
        "Imported {} new bills ({} duplicates skipped)",
        report.inserted, report.duplicates
    );
    Ok(())
}

fn cli_export(args: &[String], db: &Database) -> Result<()> {
    let filter = filter_from_flags(args, db)?;
    let output_path = positionals(args)
        .first()
        .map(|a| super::shellexpand(a))
        .unwrap_or_else(super::default_export_path);

    let count = crate::transfer::export_bills(Path::new(&output_path), db, &filter)?;
    if count == 0 {
        println!("No bills to export");
    } else {
        println!("Exported {count} bills to {output_path}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_flag_lookup() {
        let a = args(&["--month", "March", "--range", "2"]);
        assert_eq!(flag(&a, "--month"), Some("March"));
        assert_eq!(flag(&a, "--range"), Some("2"));
        assert_eq!(flag(&a, "--company"), None);
    }

    #[test]
    fn test_positionals_skip_flag_values() {
        let a = args(&["out.csv", "--year", "2024", "extra"]);
        assert_eq!(positionals(&a), vec!["out.csv", "extra"]);
    }

    #[test]
    fn test_resolve_company_by_id_or_name() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_company(&Company::new("AEP")).unwrap();
        assert_eq!(resolve_company(&db, &id.to_string()).unwrap().name, "AEP");
        assert_eq!(resolve_company(&db, "aep").unwrap().id, Some(id));
        let err = resolve_company(&db, "Nope").unwrap_err();
        assert!(matches!(
            AnalysisError::from_anyhow(&err),
            Some(AnalysisError::NotFound(_))
        ));
    }

    #[test]
    fn test_filter_from_flags() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_company(&Company::new("AEP")).unwrap();
        let a = args(&["--company", "AEP", "--month", "jan", "--range", "1", "--year", "2024"]);
        let filter = filter_from_flags(&a, &db).unwrap();
        assert_eq!(filter.company_id, Some(id));
        assert_eq!(filter.months, Some([12, 1, 2].into_iter().collect()));
        assert_eq!(filter.year, Some(2024));
    }

    #[test]
    fn test_bill_add_then_duplicate_is_rejected() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_company(&Company::new("AEP")).unwrap();
        let cmd = args(&["bills-analyzer", "bill", "add", "AEP", "march", "2024", "$90.50", "Columbus"]);
        as_cli(&cmd, &mut db).unwrap();
        assert_eq!(db.count_bills().unwrap(), 1);

        let err = as_cli(&cmd, &mut db).unwrap_err();
        assert!(err.to_string().starts_with("Invalid input: A AEP bill for March 2024"));
    }

    #[test]
    fn test_stat_without_bills_is_not_found() {
        let mut db = Database::open_in_memory().unwrap();
        let cmd = args(&["bills-analyzer", "median", "--month", "7"]);
        let err = as_cli(&cmd, &mut db).unwrap_err();
        assert_eq!(err.to_string(), "Not found: No bills found for July");
    }

    #[test]
    fn test_unknown_command_errors() {
        let mut db = Database::open_in_memory().unwrap();
        assert!(as_cli(&args(&["bills-analyzer", "frobnicate"]), &mut db).is_err());
    }
}
