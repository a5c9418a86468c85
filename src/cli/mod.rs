//! CLI command handling
//!
//! Builds the orchestrator from configuration and formats results.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;

use crate::adapter::WaitPolicy;
use crate::commands::Commands;
use crate::common::{paths, Config, Result};
use crate::form::FormFixture;
use crate::orchestrator::{TestOrchestrator, TestRun};
use crate::report::{ResultReporter, ScenarioOutcome};
use crate::scenario::{ScenarioContract, ScenarioKind};
use crate::session::{Capabilities, SessionManager};
use crate::webdriver::WebDriverClient;

/// Dispatch a CLI command
///
/// Returns `Ok(false)` when a test ran and failed.
pub async fn dispatch(command: Commands) -> Result<bool> {
    match command {
        Commands::Run {
            scenario,
            profile,
            local,
            diagnostics,
            fixture,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let contract = contract(scenario, fixture.as_deref())?;
            let capabilities = profile_capabilities(&config, &profile, local, diagnostics)?;
            let orchestrator = orchestrator(&config)?;

            print_header(&contract, &[profile]);
            let run = orchestrator.run(&contract, &capabilities).await;
            print_run(&run);

            Ok(report_exit(run))
        }

        Commands::RunAll {
            scenario,
            profiles,
            local,
            diagnostics,
            fixture,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let contract = contract(scenario, fixture.as_deref())?;
            let tests = profiles
                .iter()
                .map(|p| {
                    profile_capabilities(&config, p, local, diagnostics)
                        .map(|caps| (contract.clone(), caps))
                })
                .collect::<Result<Vec<_>>>()?;
            let orchestrator = orchestrator(&config)?;

            print_header(&contract, &profiles);
            let runs = orchestrator.run_all(&tests).await;
            for run in &runs {
                print_run(run);
            }

            let passed = runs.iter().filter(|r| r.passed()).count();
            let summary = format!("{}/{} passed", passed, runs.len());
            if passed == runs.len() {
                println!("{}", summary.green().bold());
            } else {
                println!("{}", summary.red().bold());
            }

            let mut all_passed = true;
            for run in runs {
                all_passed &= report_exit(run);
            }
            Ok(all_passed)
        }

        Commands::Profiles { config } => {
            let config = load_config(config.as_deref())?;
            if config.profiles.is_empty() {
                println!("No profiles configured");
                if let Some(path) = paths::config_path() {
                    println!("Add [profiles.<name>] sections to {}", path.display());
                }
                return Ok(true);
            }

            println!("Profiles:");
            for (name, caps) in &config.profiles {
                let platform = caps
                    .platform()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|_| "?".to_string());
                let target = caps
                    .app
                    .as_deref()
                    .or(caps.browser_name.as_deref())
                    .unwrap_or("-");
                let local = if caps.is_local { " (local)" } else { "" };
                println!("  {} {} {}{}", name.bold(), platform, target.dimmed(), local);
            }
            Ok(true)
        }

        Commands::Status { local, config } => {
            let config = load_config(config.as_deref())?;
            let (url, credentials) = if local {
                (config.local.url.as_str(), None)
            } else {
                (config.grid.url.as_str(), config.grid.credentials())
            };

            let status =
                WebDriverClient::grid_status(url, credentials, config.timeouts.request()).await?;
            if status.ready {
                println!("{} {} {}", "✓".green(), url, status.message.dimmed());
            } else {
                println!("{} {} {}", "✗".red(), url, status.message);
            }
            Ok(status.ready)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
}

fn contract(kind: ScenarioKind, fixture: Option<&Path>) -> Result<ScenarioContract> {
    let fixture = match fixture {
        Some(path) => FormFixture::load(path)?,
        None => FormFixture::astro_sky(),
    };
    Ok(ScenarioContract::new(kind, fixture))
}

fn profile_capabilities(
    config: &Config,
    profile: &str,
    local: bool,
    diagnostics: bool,
) -> Result<Capabilities> {
    let mut caps = config.profile(profile)?;
    caps.is_local |= local;
    if caps.session_name.is_none() {
        caps.session_name = Some(profile.to_string());
    }
    // Validate early so a bad profile fails before any session is opened
    caps.platform()?;

    Ok(if diagnostics {
        SessionManager::with_diagnostics(&caps)
    } else {
        caps
    })
}

fn orchestrator(config: &Config) -> Result<TestOrchestrator> {
    Ok(TestOrchestrator::new(
        Arc::new(SessionManager::new(config)),
        ResultReporter::from_config(config)?,
        WaitPolicy::from(&config.timeouts),
    ))
}

fn print_header(contract: &ScenarioContract, profiles: &[String]) {
    println!(
        "\n{} {} {}",
        "Running Test:".blue().bold(),
        contract.name().white().bold(),
        format!("on {}", profiles.join(", ")).dimmed()
    );
}

fn print_run(run: &TestRun) {
    let trace = run
        .trace
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" → ");
    let session = run.session_id.as_deref().unwrap_or("no session");

    match &run.outcome {
        ScenarioOutcome::Pass => println!(
            "  {} {} {} ({:.1}s)",
            "✓".green(),
            run.target.bold(),
            session.dimmed(),
            run.duration.as_secs_f64()
        ),
        ScenarioOutcome::Fail { kind, message } => {
            println!(
                "  {} {} {} ({:.1}s)",
                "✗".red(),
                run.target.bold(),
                session.dimmed(),
                run.duration.as_secs_f64()
            );
            println!("    {} {}", format!("{}:", kind).red(), message);
        }
    }
    println!("    {}", trace.dimmed());
    if let Some(id) = &run.record_id {
        println!("    record {}", id.dimmed());
    }
}

/// Re-signal a failed run on the local channel; `true` when it passed
fn report_exit(run: TestRun) -> bool {
    match run.into_result() {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(error = %e, "Test failed");
            false
        }
    }
}
