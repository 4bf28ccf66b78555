//! Scenario execution with live progress.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use surge_core::{HttpTransportFactory, LoadTest, StubTransportFactory, TransportFactory};

use crate::report::RunResults;
use crate::scenario::ScenarioFile;

/// Runs one scenario file against its targets, or against a stub in dry-run mode.
pub struct ScenarioRunner {
    scenario: ScenarioFile,
    dry_run: bool,
    show_progress: bool,
}

impl ScenarioRunner {
    pub fn new(scenario: ScenarioFile) -> Self {
        Self {
            scenario,
            dry_run: false,
            show_progress: true,
        }
    }

    /// Answer every request locally with `200 OK`.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn scenario(&self) -> &ScenarioFile {
        &self.scenario
    }

    /// Run the load test.
    pub async fn run(&self) -> anyhow::Result<RunResults> {
        self.scenario.validate()?;

        let transport: Arc<dyn TransportFactory> = if self.dry_run {
            Arc::new(StubTransportFactory::ok())
        } else {
            Arc::new(HttpTransportFactory::new(self.scenario.request_timeout()))
        };
        let test = LoadTest::new(self.scenario.chain()?, self.scenario.load_config())?
            .with_transport(transport);

        info!(
            scenario = %self.scenario.name,
            dry_run = self.dry_run,
            "Running scenario"
        );

        let started_at = chrono::Utc::now();
        let progress = if self.show_progress {
            Some(self.spawn_progress(&test)?)
        } else {
            None
        };

        let stats = test.run().await;

        if let Some((bar, ticker)) = progress {
            ticker.abort();
            bar.finish_with_message(format!(
                "requests: {} errors: {}",
                test.store().recorded(),
                test.store().errors()
            ));
        }
        let stats = stats?;

        Ok(RunResults {
            scenario: self.scenario.name.clone(),
            description: self.scenario.description.clone(),
            started_at,
            users: self.scenario.users,
            duration_secs: self.scenario.duration_secs,
            elapsed_secs: stats.elapsed.as_secs_f64(),
            dry_run: self.dry_run,
            users_failed: stats.users_failed,
            passes_completed: stats.passes_completed,
            step_names: test.chain().names(),
            summary: test.summary().await,
        })
    }

    fn spawn_progress(
        &self,
        test: &LoadTest,
    ) -> anyhow::Result<(ProgressBar, tokio::task::JoinHandle<()>)> {
        let bar = ProgressBar::new(self.scenario.duration_secs);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}s {msg}")?
                .progress_chars("##-"),
        );

        let store = test.store();
        let ticker_bar = bar.clone();
        let ticker = tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let mut interval = tokio::time::interval(Duration::from_millis(250));
            loop {
                interval.tick().await;
                ticker_bar.set_position(started.elapsed().as_secs());
                ticker_bar.set_message(format!(
                    "requests: {} errors: {}",
                    store.recorded(),
                    store.errors()
                ));
            }
        });
        Ok((bar, ticker))
    }
}
