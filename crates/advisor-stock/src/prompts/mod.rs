//! Agent personas and task prompts
//!
//! Four personas frame the LLM calls:
//! - `data_researcher` and `news_researcher` for the research stages
//! - `analyst` for the analysis pass
//! - `financial_expert` for the recommendation pass
//!
//! Each persona pairs with one task prompt rendered through MiniJinja.

mod personas;
mod tasks;

pub use personas::Persona;
pub use tasks::{TaskPrompt, TaskVars, render_template};

use chrono::NaiveDate;

/// Date format used in every persona backstory, e.g. `19-Oct-2026`
pub const DATE_FORMAT: &str = "%d-%b-%Y";

/// Render a date the way the personas expect it
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(format_date(date), "19-Oct-2026");
    }
}
