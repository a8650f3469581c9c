use anyhow::Result;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::analysis::month_name;
use crate::db::{BillFilter, Database};
use crate::models::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    Bills,
    Companies,
    Analysis,
}

impl Screen {
    pub(crate) fn all() -> &'static [Screen] {
        &[Self::Bills, Self::Companies, Self::Analysis]
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bills => write!(f, "Bills"),
            Self::Companies => write!(f, "Companies"),
            Self::Analysis => write!(f, "Analysis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputMode {
    Normal,
    Command,
    Search,
    Editing,
    Confirm,
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "NORMAL"),
            Self::Command => write!(f, "COMMAND"),
            Self::Search => write!(f, "SEARCH"),
            Self::Editing => write!(f, "EDIT"),
            Self::Confirm => write!(f, "CONFIRM"),
        }
    }
}

/// Pending action that requires user confirmation.
#[derive(Debug, Clone)]
pub(crate) enum PendingAction {
    DeleteBill { key: BillKey, label: String },
    DeleteCompany { id: i64, name: String },
}

/// Average, median and mode for one `:stats` run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StatsView {
    pub(crate) scope: String,
    pub(crate) bill_count: usize,
    pub(crate) average: Decimal,
    pub(crate) median: Decimal,
    pub(crate) mode: Vec<Decimal>,
}

pub(crate) struct App {
    pub(crate) running: bool,
    pub(crate) screen: Screen,
    pub(crate) input_mode: InputMode,
    pub(crate) command_input: String,
    pub(crate) search_input: String,
    pub(crate) status_message: String,
    pub(crate) show_help: bool,

    // Bills
    pub(crate) bills: Vec<Bill>,
    pub(crate) bill_index: usize,
    pub(crate) bill_scroll: usize,
    pub(crate) bill_filter_company: Option<Company>,
    pub(crate) bill_filter_year: Option<i32>,
    pub(crate) bill_count: i64,

    // Companies
    pub(crate) companies: Vec<Company>,
    pub(crate) bill_counts: HashMap<i64, i64>,
    pub(crate) company_index: usize,
    pub(crate) company_scroll: usize,

    // Analysis
    pub(crate) analysis_all: bool,
    pub(crate) stats: Option<StatsView>,
    pub(crate) summary_lines: Vec<String>,
    pub(crate) city_spending: Vec<(String, Decimal)>,
    pub(crate) city_company: Option<String>,

    // Confirmation
    pub(crate) pending_action: Option<PendingAction>,
    pub(crate) confirm_message: String,

    // Layout (updated each render frame)
    pub(crate) visible_rows: usize,
}

impl App {
    pub(crate) fn new() -> Self {
        Self {
            running: true,
            screen: Screen::Bills,
            input_mode: InputMode::Normal,
            command_input: String::new(),
            search_input: String::new(),
            status_message: String::new(),
            show_help: false,

            bills: Vec::new(),
            bill_index: 0,
            bill_scroll: 0,
            bill_filter_company: None,
            bill_filter_year: None,
            bill_count: 0,

            companies: Vec::new(),
            bill_counts: HashMap::new(),
            company_index: 0,
            company_scroll: 0,

            analysis_all: false,
            stats: None,
            summary_lines: Vec::new(),
            city_spending: Vec::new(),
            city_company: None,

            pending_action: None,
            confirm_message: String::new(),

            visible_rows: 20,
        }
    }

    /// Reload bills for the active company/year filters; `/` narrows by company name.
    pub(crate) fn refresh_bills(&mut self, db: &Database) -> Result<()> {
        let filter = BillFilter {
            company_id: self.bill_filter_company.as_ref().and_then(|c| c.id),
            year: self.bill_filter_year,
            ..BillFilter::default()
        };
        let mut bills = db.get_bills(&filter)?;
        if self.screen == Screen::Bills && !self.search_input.is_empty() {
            let needle = self.search_input.to_lowercase();
            bills.retain(|b| b.company.name.to_lowercase().contains(&needle));
        }
        self.bills = bills;
        self.bill_count = db.count_bills()?;
        clamp_index(&mut self.bill_index, &mut self.bill_scroll, self.bills.len());
        Ok(())
    }

    pub(crate) fn refresh_companies(&mut self, db: &Database) -> Result<()> {
        let filter = if self.screen == Screen::Companies {
            self.search_input.as_str()
        } else {
            ""
        };
        self.companies = db.find_companies(filter)?;
        self.bill_counts = db.get_bill_counts()?;
        clamp_index(
            &mut self.company_index,
            &mut self.company_scroll,
            self.companies.len(),
        );
        Ok(())
    }

    pub(crate) fn refresh_all(&mut self, db: &Database) -> Result<()> {
        self.refresh_bills(db)?;
        self.refresh_companies(db)?;
        Ok(())
    }

    pub(crate) fn selected_bill(&self) -> Option<&Bill> {
        self.bills.get(self.bill_index)
    }

    pub(crate) fn selected_company(&self) -> Option<&Company> {
        self.companies.get(self.company_index)
    }

    pub(crate) fn bill_label(bill: &Bill) -> String {
        format!("{} {} {}", bill.company, month_name(bill.month), bill.year)
    }

    pub(crate) fn bill_page(&self) -> usize {
        self.visible_rows.saturating_sub(3).max(1)
    }

    pub(crate) fn company_page(&self) -> usize {
        self.visible_rows.saturating_sub(3).max(1)
    }

    pub(crate) fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }
}

fn clamp_index(index: &mut usize, scroll: &mut usize, len: usize) {
    if *index >= len {
        *index = len.saturating_sub(1);
    }
    if *scroll > *index {
        *scroll = *index;
    }
}
