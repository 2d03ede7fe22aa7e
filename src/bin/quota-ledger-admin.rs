//! Operational tasks that don't belong on the HTTP surface (§4.J):
//! validating a constraint file offline, printing/generating the YAML
//! config, forcing an immediate discovery pass, and printing reports.

use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

use quota_ledger::application::use_cases::{DiscoveryFilter, DiscoveryUseCase, ReportBuilder};
use quota_ledger::application::dto::ReportFilter;
use quota_ledger::config::Config;
use quota_ledger::domain::services::ConstraintCompiler;
use quota_ledger::domain::value_objects::{ClusterId, Unit};
use quota_ledger::infrastructure::identity::StubIdentityService;
use quota_ledger::infrastructure::persistence::InMemoryAggregationRepository;

#[derive(Debug)]
enum Command {
    ConfigShow { path: Option<String> },
    ConfigGenerate,
    ConstraintsValidate { cluster: String, file: String },
    DiscoveryRun { cluster: String },
    Report { scope: String, id: String },
    Help,
}

fn print_help() {
    println!(
        r#"
quota-ledger-admin

USAGE:
    quota-ledger-admin <COMMAND> [OPTIONS]

CONFIG COMMANDS:
    config show [path]
        Load and print the effective configuration as YAML.

    config generate
        Print an example YAML configuration document.

CONSTRAINT COMMANDS:
    constraints validate <cluster> <file>
        Compile a declarative constraint file offline and report every
        syntax or clause-inconsistency error found.

DISCOVERY COMMANDS:
    discovery run <cluster>
        Force an immediate domain/project discovery pass against a
        fixture identity service (use for local testing of reconcile
        logic; a running server discovers continuously).

REPORT COMMANDS:
    report cluster <cluster-id>
    report domain <domain-uuid>
    report project <project-uuid>
        Print a report as pretty JSON.

    help
        Show this help message.
"#
    );
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        return Ok(Command::Help);
    }

    match args[1].as_str() {
        "config" => match args.get(2).map(String::as_str) {
            Some("show") => Ok(Command::ConfigShow { path: args.get(3).cloned() }),
            Some("generate") => Ok(Command::ConfigGenerate),
            _ => Ok(Command::Help),
        },
        "constraints" => match args.get(2).map(String::as_str) {
            Some("validate") => {
                if args.len() < 5 {
                    anyhow::bail!("Usage: constraints validate <cluster> <file>");
                }
                Ok(Command::ConstraintsValidate { cluster: args[3].clone(), file: args[4].clone() })
            }
            _ => Ok(Command::Help),
        },
        "discovery" => match args.get(2).map(String::as_str) {
            Some("run") => {
                if args.len() < 4 {
                    anyhow::bail!("Usage: discovery run <cluster>");
                }
                Ok(Command::DiscoveryRun { cluster: args[3].clone() })
            }
            _ => Ok(Command::Help),
        },
        "report" => {
            if args.len() < 4 {
                anyhow::bail!("Usage: report <cluster|domain|project> <id>");
            }
            Ok(Command::Report { scope: args[2].clone(), id: args[3].clone() })
        }
        _ => Ok(Command::Help),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    match parse_args()? {
        Command::ConfigShow { path } => {
            let config = Config::load(path.map(Into::into))?;
            println!("{}", serde_yaml::to_string(&config)?);
        }

        Command::ConfigGenerate => {
            println!("{}", Config::example());
        }

        Command::ConstraintsValidate { cluster, file } => {
            let content = std::fs::read_to_string(&file)?;
            let mut error_count = 0;
            for (lineno, line) in content.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let mut parts = line.splitn(3, '\t');
                let expr = match (parts.next(), parts.next(), parts.next()) {
                    (Some(_), Some(_), Some(expr)) => expr,
                    _ => {
                        println!("line {lineno}: malformed (expected scope<TAB>resource<TAB>expression)");
                        error_count += 1;
                        continue;
                    }
                };
                let outcome = ConstraintCompiler::compile(Unit::None, expr);
                for e in &outcome.errors {
                    println!("line {lineno}: {e}");
                    error_count += 1;
                }
            }
            if error_count == 0 {
                println!("cluster {cluster}: constraint file {file} is valid");
            } else {
                anyhow::bail!("{error_count} error(s) found in {file}");
            }
        }

        Command::DiscoveryRun { cluster } => {
            let cluster_id = ClusterId::new(&cluster)?;
            let identity = StubIdentityService::new();
            let repo = InMemoryAggregationRepository::new();
            let constraints = quota_ledger::domain::services::ConstraintStore::new();
            let use_case = DiscoveryUseCase {
                cluster: &cluster_id,
                identity: &identity,
                repo: &repo,
                constraints: &constraints,
            };
            let outcome = use_case.run(&DiscoveryFilter::none(), &[]).await?;
            println!(
                "discovered: {} new domain(s), {} new project(s), {} project(s) marked for deletion",
                outcome.domains_inserted, outcome.projects_inserted, outcome.projects_marked_for_deletion
            );
        }

        Command::Report { scope, id } => {
            let repo = Arc::new(InMemoryAggregationRepository::new());
            let cluster_id = ClusterId::new("default")?;
            let cluster = quota_ledger::domain::entities::Cluster::new(cluster_id, Vec::new(), 0.0)?;
            let registry = quota_ledger::domain::services::ResourceRegistryBuilder::new().build();
            let builder = ReportBuilder { cluster: &cluster, registry: &registry, repo: repo.as_ref() };
            let filter = ReportFilter::default();
            match scope.as_str() {
                "cluster" => {
                    let report = builder.cluster_report(&filter).await?;
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                "domain" => {
                    let uuid: Uuid = id.parse()?;
                    let report = builder.domain_report(uuid, &filter).await?;
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                "project" => {
                    let uuid: Uuid = id.parse()?;
                    let report = builder.project_report(uuid, &filter).await?;
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                _ => anyhow::bail!("unknown report scope: {scope} (expected cluster, domain, or project)"),
            }
        }

        Command::Help => print_help(),
    }

    Ok(())
}
