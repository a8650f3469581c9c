use std::collections::HashMap;
use std::sync::LazyLock;

use rust_decimal::Decimal;

use super::app::{App, InputMode, PendingAction, Screen, StatsView};
use crate::analysis::{
    average, median, mode, month_number, BillQuery, BillsAnalysis, SummaryFilter,
    DEFAULT_CITY_LIMIT,
};
use crate::db::{BillFilter, Database};
use crate::error::AnalysisError;
use crate::models::{validate_year, Bill, Company};
use crate::transfer::parse_decimal;

pub(crate) struct Command {
    pub(crate) description: &'static str,
    pub(crate) run: fn(&str, &mut App, &mut Database) -> anyhow::Result<()>,
}

macro_rules! register_command {
    ($name:expr, $desc:expr, $func:expr, $registry:expr) => {{
        $registry.insert(
            $name,
            Command {
                description: $desc,
                run: $func,
            },
        );
    }};
}

pub(crate) static COMMANDS: LazyLock<HashMap<&str, Command>> = LazyLock::new(|| {
    let mut r: HashMap<&str, Command> = HashMap::new();

    register_command!("q", "Quit Bills Analyzer", cmd_quit, r);
    register_command!("quit", "Quit Bills Analyzer", cmd_quit, r);
    register_command!("help", "Show available commands", cmd_help, r);
    register_command!("h", "Show available commands", cmd_help, r);
    register_command!("bills", "Go to Bills", cmd_bills, r);
    register_command!("b", "Go to Bills", cmd_bills, r);
    register_command!("companies", "Go to Companies", cmd_companies, r);
    register_command!("c", "Go to Companies", cmd_companies, r);
    register_command!("analysis", "Go to Analysis", cmd_analysis, r);
    register_command!("a", "Go to Analysis", cmd_analysis, r);
    register_command!(
        "add",
        "Add bill (e.g. :add AEP March 2024 90.50 Columbus)",
        cmd_add,
        r
    );
    register_command!(
        "update",
        "Update selected bill (e.g. :update 95.10 Columbus)",
        cmd_update,
        r
    );
    register_command!("delete", "Delete selected bill", cmd_delete, r);
    register_command!(
        "filter-company",
        "Show bills of one company (e.g. :filter-company AEP)",
        cmd_filter_company,
        r
    );
    register_command!("fc", "Show bills of one company", cmd_filter_company, r);
    register_command!("year", "Show bills of one year (e.g. :year 2024)", cmd_year, r);
    register_command!("y", "Show bills of one year", cmd_year, r);
    register_command!(
        "company",
        "Add company (e.g. :company Columbia Gas)",
        cmd_company,
        r
    );
    register_command!("rename", "Rename selected company", cmd_rename, r);
    register_command!(
        "delete-company",
        "Delete selected company and its bills",
        cmd_delete_company,
        r
    );
    register_command!(
        "stats",
        "Average/median/mode (e.g. :stats March 1)",
        cmd_stats,
        r
    );
    register_command!(
        "all",
        "Toggle stats over all companies",
        cmd_all,
        r
    );
    register_command!(
        "summary",
        "Totals per company (e.g. :summary Jan 2024)",
        cmd_summary,
        r
    );
    register_command!(
        "cities",
        "Top cities for the selected company",
        cmd_cities,
        r
    );
    register_command!(
        "import",
        "Import bills CSV (e.g. :import ~/bills.csv)",
        cmd_import,
        r
    );
    register_command!(
        "export",
        "Export shown bills to CSV (e.g. :export ~/bills.csv)",
        cmd_export,
        r
    );

    r
});

pub(crate) fn handle_command(input: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let trimmed = input.trim();
    let mut parts = trimmed.splitn(2, ' ');
    let cmd_name = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim();

    if let Some(cmd) = COMMANDS.get(cmd_name) {
        if let Err(e) = (cmd.run)(args, app, db) {
            report_error(app, cmd_name, &e);
        }
    } else {
        // Try fuzzy match
        let suggestion = find_closest(cmd_name);
        app.set_status(format!(
            "Unknown command: :{cmd_name}. Did you mean :{suggestion}?"
        ));
    }

    Ok(())
}

/// Show a failed action in the status bar: domain errors as-is, the rest as `Error: ...`.
pub(crate) fn report_error(app: &mut App, action: &str, err: &anyhow::Error) {
    match AnalysisError::from_anyhow(err) {
        Some(domain) => {
            tracing::debug!(action, error = %domain, "action rejected");
            app.set_status(domain.to_string());
        }
        None => {
            tracing::error!(action, error = %format!("{err:#}"), "action failed");
            app.set_status(format!("Error: {err:#}"));
        }
    }
}

fn find_closest(input: &str) -> String {
    COMMANDS
        .keys()
        .filter(|k| k.len() > 1) // skip single-letter aliases for suggestions
        .min_by_key(|k| levenshtein(input, k))
        .unwrap_or(&"help")
        .to_string()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

// ── Argument parsing ─────────────────────────────────────────

/// `<company words...> <month> <year> <amount> [city words...]`
struct BillArgs {
    company: String,
    month: u32,
    year: i32,
    amount: Decimal,
    city: String,
}

fn parse_bill_args(args: &str) -> Option<BillArgs> {
    let tokens: Vec<&str> = args.split_whitespace().collect();
    (1..tokens.len().saturating_sub(2)).find_map(|i| {
        let month = month_number(tokens[i]).ok()?;
        let year = tokens[i + 1].parse::<i32>().ok()?;
        let amount = parse_decimal(tokens[i + 2]).ok()?;
        Some(BillArgs {
            company: tokens[..i].join(" "),
            month,
            year,
            amount,
            city: tokens[i + 3..].join(" "),
        })
    })
}

/// Resolve a company by id or name, checking the loaded list before the database.
fn find_company(app: &App, db: &Database, name: &str) -> anyhow::Result<Company> {
    let id = name.parse::<i64>().ok();
    let cached = match id {
        Some(id) => Company::find_by_id(&app.companies, id),
        None => Company::find_by_name(&app.companies, name),
    };
    if let Some(company) = cached {
        return Ok(company.clone());
    }

    let found = match id {
        Some(id) => db.get_company(id)?,
        None => db.get_company_by_name(name)?,
    };
    found.ok_or_else(|| {
        AnalysisError::not_found(format!(
            "Company '{name}' not found. Add it with :company {name}"
        ))
        .into()
    })
}

// ── Navigation ───────────────────────────────────────────────

fn cmd_quit(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.running = false;
    Ok(())
}

fn cmd_help(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.show_help = true;
    Ok(())
}

fn cmd_bills(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.screen = Screen::Bills;
    app.refresh_bills(db)?;
    Ok(())
}

fn cmd_companies(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.screen = Screen::Companies;
    app.refresh_companies(db)?;
    Ok(())
}

fn cmd_analysis(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.screen = Screen::Analysis;
    Ok(())
}

// ── Bills ────────────────────────────────────────────────────

fn cmd_add(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let Some(parsed) = parse_bill_args(args) else {
        app.set_status("Usage: :add <company> <month> <year> <amount> [city]");
        return Ok(());
    };

    let company = find_company(app, db, &parsed.company)?;
    let bill =
        Bill::new(parsed.month, parsed.year, company, parsed.amount).with_city(parsed.city);
    if db.insert_bill(&bill)? {
        app.refresh_all(db)?;
        if let Some(pos) = app.bills.iter().position(|b| b.key().ok() == bill.key().ok()) {
            app.bill_index = pos;
        }
        app.set_status(format!("Added bill: {}", App::bill_label(&bill)));
    } else {
        app.set_status(format!(
            "A bill for {} already exists. Use :update",
            App::bill_label(&bill)
        ));
    }
    Ok(())
}

fn cmd_update(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let Some(selected) = app.selected_bill().cloned() else {
        app.set_status("Select a bill on the Bills screen first");
        return Ok(());
    };

    let mut parts = args.splitn(2, ' ');
    let amount_str = parts.next().unwrap_or("").trim();
    if amount_str.is_empty() {
        app.set_status("Usage: :update <amount> [city]");
        return Ok(());
    }
    let amount = match parse_decimal(amount_str) {
        Ok(a) => a,
        Err(_) => {
            app.set_status(format!("Invalid amount: {amount_str}"));
            return Ok(());
        }
    };
    let city = parts
        .next()
        .map(str::to_string)
        .or_else(|| selected.city.clone())
        .unwrap_or_default();

    let bill = Bill::new(selected.month, selected.year, selected.company.clone(), amount)
        .with_city(city);
    if db.update_bill(&bill)? {
        app.refresh_bills(db)?;
        app.set_status(format!("Updated bill: {}", App::bill_label(&bill)));
    } else {
        app.set_status("Bill no longer exists");
        app.refresh_bills(db)?;
    }
    Ok(())
}

fn cmd_delete(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    if app.screen != Screen::Bills {
        app.set_status("Navigate to Bills and select one first");
        return Ok(());
    }
    let Some(bill) = app.selected_bill() else {
        app.set_status("No bill selected");
        return Ok(());
    };
    let key = bill.key()?;
    let label = App::bill_label(bill);
    app.confirm_message = format!("Delete bill {label}?");
    app.pending_action = Some(PendingAction::DeleteBill { key, label });
    app.input_mode = InputMode::Confirm;
    Ok(())
}

fn cmd_filter_company(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.screen = Screen::Bills;
    if args.is_empty() {
        app.bill_filter_company = None;
        app.refresh_bills(db)?;
        app.set_status("Company filter cleared - showing all bills");
        return Ok(());
    }

    let company = find_company(app, db, args)?;
    app.set_status(format!("Filtering by company: {company}"));
    app.bill_filter_company = Some(company);
    app.bill_index = 0;
    app.bill_scroll = 0;
    app.refresh_bills(db)?;
    Ok(())
}

fn cmd_year(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.screen = Screen::Bills;
    if args.is_empty() {
        app.bill_filter_year = None;
        app.refresh_bills(db)?;
        app.set_status("Year filter cleared");
        return Ok(());
    }

    match args.parse::<i32>() {
        Ok(year) => {
            validate_year(year)?;
            app.bill_filter_year = Some(year);
            app.bill_index = 0;
            app.bill_scroll = 0;
            app.refresh_bills(db)?;
            app.set_status(format!("Showing bills for {year}"));
        }
        Err(_) => app.set_status("Usage: :year <YYYY>"),
    }
    Ok(())
}

// ── Companies ────────────────────────────────────────────────

fn cmd_company(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if args.is_empty() {
        app.set_status("Usage: :company <name>");
        return Ok(());
    }

    let company = Company::new(args);
    let id = db.insert_company(&company)?;
    app.screen = Screen::Companies;
    app.refresh_companies(db)?;
    if let Some(pos) = app.companies.iter().position(|c| c.id == Some(id)) {
        app.company_index = pos;
    }
    app.set_status(format!("Added company: {}", company.name));
    Ok(())
}

fn cmd_rename(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if app.screen != Screen::Companies {
        app.set_status("Navigate to Companies and select one first");
        return Ok(());
    }
    let Some(company) = app.selected_company().cloned() else {
        app.set_status("No company selected");
        return Ok(());
    };

    if args.is_empty() {
        // Enter editing mode for inline rename
        app.command_input = company.name.clone();
        app.input_mode = InputMode::Editing;
        app.set_status("Type new name, press Enter to confirm");
        return Ok(());
    }

    rename_company(app, db, &company, args)
}

fn rename_company(
    app: &mut App,
    db: &mut Database,
    company: &Company,
    new_name: &str,
) -> anyhow::Result<()> {
    let id = company.id.ok_or_else(|| AnalysisError::invalid("Company is required"))?;
    if db.update_company(id, new_name)? {
        app.refresh_all(db)?;
        app.set_status(format!("Renamed '{company}' to '{}'", new_name.trim()));
    } else {
        app.refresh_companies(db)?;
        app.set_status("Company no longer exists");
    }
    Ok(())
}

fn cmd_delete_company(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    if app.screen != Screen::Companies {
        app.set_status("Navigate to Companies and select one first");
        return Ok(());
    }
    let Some((id, name)) = app
        .selected_company()
        .and_then(|c| c.id.map(|id| (id, c.name.clone())))
    else {
        app.set_status("No company selected");
        return Ok(());
    };

    let count = app.bill_counts.get(&id).copied().unwrap_or(0);
    app.confirm_message = if count > 0 {
        format!(
            "Delete '{name}' and its {count} bill{}?",
            if count == 1 { "" } else { "s" }
        )
    } else {
        format!("Delete '{name}'?")
    };
    app.pending_action = Some(PendingAction::DeleteCompany { id, name });
    app.input_mode = InputMode::Confirm;
    Ok(())
}

// ── Analysis ─────────────────────────────────────────────────

fn cmd_stats(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let mut parts = args.split_whitespace();
    let Some(month) = parts.next() else {
        app.set_status("Usage: :stats <month> [range]");
        return Ok(());
    };
    let mut query = BillQuery::month(month_number(month)?);
    if let Some(range) = parts.next() {
        let range = range
            .parse::<u32>()
            .map_err(|_| AnalysisError::invalid("Range must be between 0 and 5"))?;
        query = query.with_range(range);
    }

    let mut scope = query.describe();
    if !app.analysis_all {
        let Some(company) = app.selected_company().cloned() else {
            app.set_status("Select a company on the Companies screen or toggle :all");
            return Ok(());
        };
        query = query.for_company(company.id.unwrap_or_default());
        scope = format!("{company}, {scope}");
    } else {
        scope = format!("All companies, {scope}");
    }

    let amounts: Vec<Decimal> = BillsAnalysis::new(db)
        .bills_for(&query)?
        .into_iter()
        .map(|b| b.amount)
        .collect();
    let stats = StatsView {
        scope,
        bill_count: amounts.len(),
        average: average(&amounts)?,
        median: median(&amounts)?,
        mode: mode(&amounts)?,
    };
    app.set_status(format!("Stats for {}", stats.scope));
    app.stats = Some(stats);
    app.screen = Screen::Analysis;
    Ok(())
}

fn cmd_all(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.analysis_all = !app.analysis_all;
    app.set_status(if app.analysis_all {
        "Stats over all companies"
    } else {
        "Stats over the selected company"
    });
    Ok(())
}

fn cmd_summary(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let mut filter = SummaryFilter::all();
    for token in args.split_whitespace() {
        match token.parse::<i32>() {
            // Numbers past December can only be years.
            Ok(year) if year > 12 => {
                validate_year(year)?;
                filter.year = Some(year);
            }
            _ => filter.month = Some(month_number(token)?),
        }
    }

    app.summary_lines = BillsAnalysis::new(db).summary(filter)?;
    app.screen = Screen::Analysis;
    app.set_status(filter.title());
    Ok(())
}

fn cmd_cities(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let Some(company) = app.selected_company().cloned() else {
        app.set_status("Select a company on the Companies screen first");
        return Ok(());
    };

    app.city_spending =
        BillsAnalysis::new(db).city_spending(company.id.unwrap_or_default(), DEFAULT_CITY_LIMIT)?;
    app.set_status(format!(
        "Top {} cities for {company}",
        app.city_spending.len()
    ));
    app.city_company = Some(company.name);
    app.screen = Screen::Analysis;
    Ok(())
}

// ── Transfer ─────────────────────────────────────────────────

fn cmd_import(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if args.is_empty() {
        app.set_status("Usage: :import <file.csv>");
        return Ok(());
    }
    let path = crate::run::shellexpand(args);
    let report = crate::transfer::import_bills(std::path::Path::new(&path), db)?;
    app.refresh_all(db)?;
    app.set_status(format!(
        "Imported {} bills ({} duplicates skipped, {} new companies)",
        report.inserted, report.duplicates, report.companies_created
    ));
    Ok(())
}

fn cmd_export(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let path = if args.is_empty() {
        crate::run::default_export_path()
    } else {
        crate::run::shellexpand(args)
    };

    let filter = BillFilter {
        company_id: app.bill_filter_company.as_ref().and_then(|c| c.id),
        year: app.bill_filter_year,
        ..BillFilter::default()
    };
    let count = crate::transfer::export_bills(std::path::Path::new(&path), db, &filter)?;
    if count == 0 {
        app.set_status("No bills to export");
    } else {
        app.set_status(format!("Exported {count} bills to {path}"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
