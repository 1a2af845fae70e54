//! System prompts for the four agents

use serde::Serialize;

/// Role, goal and backstory of an agent; rendered into the system prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Persona {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl Persona {
    /// Create a persona; `today` is appended to the backstory
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        today: &str,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: format!("{} Consider you are on: {today}", backstory.into()),
        }
    }

    /// Researcher that gathers profile and income statement data
    pub fn data_researcher(today: &str) -> Self {
        Self::new(
            "Data Researcher",
            "Gather and provide financial data and company information about a stock",
            "You are an expert researcher who can gather detailed information about a company \
             or stock from Yahoo Finance data. Indian stocks trade on the NSE with the \".NS\" \
             suffix and no spaces (e.g. \"TATA MOTORS\" is \"TATAMOTORS.NS\").",
            today,
        )
    }

    /// Researcher that gathers recent news
    pub fn news_researcher(today: &str) -> Self {
        Self::new(
            "News and Info Researcher",
            "Gather and provide the latest news and information about a company from the internet",
            "You are an expert researcher who can gather detailed information about a company.",
            today,
        )
    }

    /// Analyst that consolidates financials and news
    pub fn analyst(today: &str) -> Self {
        Self::new(
            "Data Analyst",
            "Consolidate financial data, stock information, and provide a summary",
            "You are an expert in analyzing financial data and current company news and in \
             producing a comprehensive analysis. Use Indian units for numbers (lakh, crore) if \
             the stock is Indian, otherwise standard units.",
            today,
        )
    }

    /// Advisor that turns the analysis into Buy/Hold/Sell
    pub fn financial_expert(today: &str) -> Self {
        Self::new(
            "Financial Expert",
            "Considering financial analysis of a stock, make investment recommendations",
            "You are an expert financial advisor who provides investment recommendations. \
             Weigh the financial analysis, current information about the company and the \
             current stock price, and recommend whether to buy, hold or sell the stock along \
             with your reasons.",
            today,
        )
    }

    /// System prompt sent to the LLM
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {role}. {backstory}\n\nYour personal goal is: {goal}",
            role = self.role,
            backstory = self.backstory,
            goal = self.goal,
        )
    }
}
