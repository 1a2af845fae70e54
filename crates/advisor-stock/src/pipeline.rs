//! The fixed research → analysis → recommendation pipeline
//!
//! Stages run in order and pass text forward:
//!
//! 1. data research (`FinancialData::fetch_financials`)
//! 2. news research (`NewsSearch::search_news`, once per query template)
//! 3. analysis (`TextCompleter::complete` as the analyst), written to `Analysis.md`
//! 4. recommendation (live price + `TextCompleter::complete` as the financial
//!    expert), written to `Recommendation.md`
//!
//! Any stage failure aborts the run. The price lookup is the one soft step:
//! its failure is handed to the model as text.

use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::api::{AlphaVantageClient, DuckDuckGoClient, YahooFinanceClient};
use crate::completer::LlmCompleter;
use crate::config::{AdvisorConfig, DataProvider};
use crate::error::Result;
use crate::prompts::{Persona, TaskPrompt, TaskVars, format_date, render_template};
use crate::report::ReportWriter;
use crate::sources::{FinancialData, NewsSearch, TextCompleter};
use crate::ticker::{SymbolNormalizer, Ticker};

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub ticker: Ticker,
    pub analysis: String,
    pub recommendation: String,
    pub analysis_path: PathBuf,
    pub recommendation_path: PathBuf,
}

/// Builder for [`Pipeline`]
///
/// Services left unset are created from the configuration.
pub struct PipelineBuilder {
    config: AdvisorConfig,
    financial_data: Option<Arc<dyn FinancialData>>,
    news_search: Option<Arc<dyn NewsSearch>>,
    completer: Option<Arc<dyn TextCompleter>>,
    today: Option<NaiveDate>,
}

impl PipelineBuilder {
    pub fn new(config: AdvisorConfig) -> Self {
        Self {
            config,
            financial_data: None,
            news_search: None,
            completer: None,
            today: None,
        }
    }

    /// Use a specific financial-data service
    pub fn financial_data(mut self, service: Arc<dyn FinancialData>) -> Self {
        self.financial_data = Some(service);
        self
    }

    /// Use a specific news search service
    pub fn news_search(mut self, service: Arc<dyn NewsSearch>) -> Self {
        self.news_search = Some(service);
        self
    }

    /// Use a specific text completer
    pub fn completer(mut self, service: Arc<dyn TextCompleter>) -> Self {
        self.completer = Some(service);
        self
    }

    /// Fix the date the personas see; defaults to the local date at run time
    pub fn today(mut self, date: NaiveDate) -> Self {
        self.today = Some(date);
        self
    }

    /// Validate the configuration and assemble the pipeline
    ///
    /// Credentials are checked before any service is created.
    pub fn build(self) -> Result<Pipeline> {
        self.config.validate()?;

        let financial_data: Arc<dyn FinancialData> = match self.financial_data {
            Some(service) => service,
            None => match self.config.data.provider {
                DataProvider::Yahoo => Arc::new(YahooFinanceClient::from_settings(&self.config.data)?),
                DataProvider::AlphaVantage => {
                    Arc::new(AlphaVantageClient::from_settings(&self.config.data)?)
                }
            },
        };

        let news_search: Arc<dyn NewsSearch> = match self.news_search {
            Some(service) => service,
            None => Arc::new(DuckDuckGoClient::from_settings(&self.config.news)?),
        };

        let completer: Arc<dyn TextCompleter> = match self.completer {
            Some(service) => service,
            None => Arc::new(LlmCompleter::from_settings(&self.config.llm)?),
        };

        Ok(Pipeline {
            normalizer: SymbolNormalizer::from_settings(&self.config.symbols),
            writer: ReportWriter::new(&self.config.output),
            config: self.config,
            financial_data,
            news_search,
            completer,
            today: self.today,
        })
    }
}

/// Runs the four stages for one symbol
pub struct Pipeline {
    config: AdvisorConfig,
    normalizer: SymbolNormalizer,
    financial_data: Arc<dyn FinancialData>,
    news_search: Arc<dyn NewsSearch>,
    completer: Arc<dyn TextCompleter>,
    writer: ReportWriter,
    today: Option<NaiveDate>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("normalizer", &self.normalizer)
            .field("writer", &self.writer)
            .field("today", &self.today)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder(config: AdvisorConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    /// Build a pipeline with services created from the configuration
    pub fn from_config(config: AdvisorConfig) -> Result<Self> {
        PipelineBuilder::new(config).build()
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Normalize a symbol without running anything
    pub fn normalize(&self, input: &str) -> Result<Ticker> {
        self.normalizer.normalize(input)
    }

    /// Run every stage for `input` and write both reports
    #[instrument(skip(self))]
    pub async fn run(&self, input: &str) -> Result<PipelineReport> {
        let ticker = self.normalizer.normalize(input)?;
        let today = format_date(self.today.unwrap_or_else(|| Local::now().date_naive()));
        let vars = TaskVars::new(&ticker, today);
        info!("Running advisor for {} (input {:?})", ticker, ticker.input());

        let (financials, news) = if self.config.concurrent_research {
            let (financials, news) = tokio::join!(
                self.research_financials(&ticker, &vars),
                self.research_news(&vars)
            );
            (financials?, news?)
        } else {
            let financials = self.research_financials(&ticker, &vars).await?;
            let news = self.research_news(&vars).await?;
            (financials, news)
        };

        let analysis = self.analyse(&vars, financials, news).await?;
        let analysis_path = self.writer.write_analysis(&analysis).await?;

        let recommendation = self.recommend(&ticker, &vars, &analysis).await?;
        let recommendation_path = self.writer.write_recommendation(&recommendation).await?;

        info!("Advisor run for {} complete", ticker);
        Ok(PipelineReport {
            ticker,
            analysis,
            recommendation,
            analysis_path,
            recommendation_path,
        })
    }

    async fn research_financials(&self, ticker: &Ticker, vars: &TaskVars) -> Result<String> {
        info!("Stage 1/4: data research for {}", ticker);
        let financials = self.financial_data.fetch_financials(ticker).await?;

        if !self.config.summarize_research {
            return Ok(financials);
        }
        let persona = Persona::data_researcher(&vars.today);
        let task = TaskPrompt::FINANCIALS.render(vars)?;
        self.completer.complete(&persona, &task, &[financials]).await
    }

    async fn research_news(&self, vars: &TaskVars) -> Result<String> {
        info!("Stage 2/4: news research for {}", vars.stock);
        let mut sections = Vec::with_capacity(self.config.news.queries.len());
        for template in &self.config.news.queries {
            let query = render_template(template, vars)?;
            sections.push(self.news_search.search_news(&query).await?);
        }
        let news = format!(
            "## Latest news for {}\n\n{}",
            vars.stock,
            sections.join("\n")
        );

        if !self.config.summarize_research {
            return Ok(news);
        }
        let persona = Persona::news_researcher(&vars.today);
        let task = TaskPrompt::NEWS.render(vars)?;
        self.completer.complete(&persona, &task, &[news]).await
    }

    async fn analyse(&self, vars: &TaskVars, financials: String, news: String) -> Result<String> {
        info!("Stage 3/4: analysis of {}", vars.ticker);
        let persona = Persona::analyst(&vars.today);
        let task = TaskPrompt::ANALYSE.render(vars)?;
        self.completer
            .complete(&persona, &task, &[financials, news])
            .await
    }

    async fn recommend(&self, ticker: &Ticker, vars: &TaskVars, analysis: &str) -> Result<String> {
        info!("Stage 4/4: recommendation for {}", ticker);
        let price = match self.financial_data.latest_price(ticker).await {
            Ok(price) => format!("Current stock price of {ticker}: {price:.2}"),
            Err(e) => {
                warn!("Price lookup for {} failed: {}", ticker, e);
                format!("Current stock price of {ticker}: unavailable ({e})")
            }
        };

        let persona = Persona::financial_expert(&vars.today);
        let task = TaskPrompt::ADVISE.render(vars)?;
        self.completer
            .complete(&persona, &task, &[analysis.to_string(), price])
            .await
    }
}
