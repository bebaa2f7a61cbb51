//! Terminal output: term tables, settlement views and notices.

use std::io::Write;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use dealroom_db::{Term, TermSnapshot};
use dealroom_protocol::{ApprovalStatus, Role};
use dealroom_session::{format_grouped, Notice, Renderer, SettlementView, TermsView};

/// Build the terms table. Rows are numbered for menu selection.
pub fn terms_table(snapshot: &TermSnapshot) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let headers = ["#", "Term", "Value", "Unit", "Status"];
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );

    for (i, term) in snapshot.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&term.name),
            Cell::new(format_value(term)),
            Cell::new(&term.unit),
            status_cell(term.status),
        ]);
    }
    table
}

fn status_cell(status: ApprovalStatus) -> Cell {
    match status {
        ApprovalStatus::Approved => Cell::new("APPROVED").fg(Color::Green),
        ApprovalStatus::Pending => Cell::new("PENDING").fg(Color::Red),
    }
}

/// `-` until a value is set.
pub fn format_value(term: &Term) -> String {
    match term.value {
        Some(v) => format_grouped(v),
        None => "-".to_string(),
    }
}

fn footer(view: &TermsView) -> &'static str {
    if !view.notifications_live {
        return "Live updates offline: choose 'r' to refresh and see the other team's changes";
    }
    match view.role {
        Role::Proposer => "Waiting for Team 2 approvals...",
        Role::Counterparty => "Select term to approve/reject or 'Exit' to pause",
    }
}

/// Prints to stdout. Calls arrive under the session's render lock.
pub struct TableRenderer;

impl Renderer for TableRenderer {
    fn render_terms(&self, view: &TermsView) {
        println!();
        println!(
            "{} ({}): {}/{} approved",
            view.role.team_label(),
            view.role.as_str(),
            view.snapshot.approved_count(),
            view.snapshot.len()
        );
        println!("{}", terms_table(&view.snapshot));
        println!("{}", footer(view));
    }

    fn render_settlement(&self, view: &SettlementView) {
        println!();
        println!("ALL TERMS APPROVED");
        println!("==================");
        println!("{}", terms_table(&view.snapshot));
        println!("Final {}: {}", view.game, view.display_value());
    }

    fn notice(&self, notice: &Notice) {
        match notice {
            Notice::RemoteUpdate { from, term } => {
                println!();
                println!("Update received from {}: {}", from.team_label(), term);
                println!("Refreshing view on your next action...");
            }
            Notice::ActionRejected(reason) => println!("Not applied: {}", reason),
            Notice::BusDegraded => {
                println!("Live updates unavailable; use 'r' to refresh manually.")
            }
            Notice::InvalidInput(message) => println!("{}", message),
        }
    }

    fn prompt(&self, text: &str) {
        print!("{} ", text);
        let _ = std::io::stdout().flush();
    }
}
