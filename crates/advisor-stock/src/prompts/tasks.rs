//! Task prompts, rendered with MiniJinja

use crate::error::Result;
use crate::ticker::Ticker;
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

/// Variables available to every task and query template
#[derive(Debug, Clone, Serialize)]
pub struct TaskVars {
    /// What the user typed, e.g. `Tata Motors`
    pub stock: String,
    /// Normalized symbol, e.g. `TATAMOTORS.NS`
    pub ticker: String,
    /// Whether figures should use lakh/crore
    pub indian: bool,
    /// Today's date in persona format
    pub today: String,
}

impl TaskVars {
    pub fn new(ticker: &Ticker, today: impl Into<String>) -> Self {
        Self {
            stock: ticker.input().to_string(),
            ticker: ticker.symbol().to_string(),
            indian: ticker.is_indian(),
            today: today.into(),
        }
    }
}

/// A task description and the output expected from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPrompt {
    pub name: &'static str,
    pub description: &'static str,
    pub expected_output: &'static str,
}

impl TaskPrompt {
    /// Gather income statement and profile figures
    pub const FINANCIALS: Self = Self {
        name: "company_financials",
        description: "Summarize the financial data (income statements and company profile) \
                      provided for stock: {{ ticker }}",
        expected_output: "Detailed information from the income statement and key ratios for \
                          {{ ticker }}. Also describe the current financial status and the trend \
                          over the period.",
    };

    /// Gather recent news
    pub const NEWS: Self = Self {
        name: "company_news",
        description: "Summarize the latest news and business information provided about \
                      company: {{ stock }}",
        expected_output: "Latest news and business information about the company, followed by \
                          a short summary.",
    };

    /// Merge financials and news into a health report
    pub const ANALYSE: Self = Self {
        name: "analyse",
        description: "Make a thorough analysis of {{ ticker }} based on the given financial data \
                      and latest news.",
        expected_output: "Comprehensive analysis of the stock outlining financial health, stock \
                          valuation, risks, and news. Mention currency information\
                          {%- if indian %} and express numbers in Indian units (lakh/crore)\
                          {%- endif %}.",
    };

    /// Turn the analysis into Buy/Hold/Sell
    pub const ADVISE: Self = Self {
        name: "advise",
        description: "Make a recommendation about investing in {{ ticker }}, based on the \
                      analysis provided and the current stock price. Explain the reasons.",
        expected_output: "Recommendation (Buy / Hold / Sell) of the stock backed with reasons \
                          elaborated. Respond in Markdown format.",
    };

    /// Render the task as the user message body
    pub fn render(&self, vars: &TaskVars) -> Result<String> {
        let description = render_template(self.description, vars)?;
        let expected = render_template(self.expected_output, vars)?;
        Ok(format!(
            "Task: {description}\n\nThis is the expected criteria for your final answer: {expected}"
        ))
    }
}

/// Render a MiniJinja template string; unknown variables are an error
pub fn render_template(template: &str, vars: &TaskVars) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    Ok(env.render_str(template, vars)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticker::SymbolNormalizer;

    fn vars(input: &str) -> TaskVars {
        let ticker = SymbolNormalizer::default().normalize(input).unwrap();
        TaskVars::new(&ticker, "19-Oct-2026")
    }

    #[test]
    fn test_render_substitutes_ticker() {
        let text = TaskPrompt::ADVISE.render(&vars("aapl")).unwrap();
        assert!(text.starts_with("Task: Make a recommendation about investing in AAPL"));
        assert!(text.contains("Buy / Hold / Sell"));
    }

    #[test]
    fn test_analyse_mentions_indian_units_only_for_indian_tickers() {
        let indian = TaskPrompt::ANALYSE.render(&vars("TATA MOTORS")).unwrap();
        assert!(indian.contains("TATAMOTORS.NS"));
        assert!(indian.contains("lakh/crore"));

        let us = TaskPrompt::ANALYSE.render(&vars("AAPL")).unwrap();
        assert!(!us.contains("lakh"));
        assert!(us.contains("Mention currency information."));
    }

    #[test]
    fn test_news_uses_user_input() {
        let text = TaskPrompt::NEWS.render(&vars("  Tata Motors ")).unwrap();
        assert!(text.contains("company: Tata Motors"));
    }

    #[test]
    fn test_unknown_variable_is_rejected() {
        let err = render_template("{{ company }} news", &vars("AAPL")).unwrap_err();
        assert!(matches!(err, crate::error::AdvisorError::TemplateError(_)));
    }

    #[test]
    fn test_all_tasks_render() {
        for task in [
            TaskPrompt::FINANCIALS,
            TaskPrompt::NEWS,
            TaskPrompt::ANALYSE,
            TaskPrompt::ADVISE,
        ] {
            assert!(task.render(&vars("RELIANCE")).is_ok(), "{}", task.name);
        }
    }
}
