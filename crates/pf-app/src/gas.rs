//! Gas-only variant: condition, upgrade and manage an existing biogas stream.

use crate::error::AppResult;
use crate::feed::interpret_feed;
use crate::pipeline::{build_train, put_methane, put_stream, route, run_config, size};
use crate::result::{Ledger, Severity, SimulationResult, Variant, put, single_pass};
use pf_project::{EngineConfig, FeedKind, Project};
use pf_stages::StageKind;
use pf_topology::select_gas_train;

/// Simulate gas handling for the first declared gas feed.
///
/// Stops with an error-severity warning and an empty result when no gas flow
/// can be read.
pub fn run_gas_only(project: &Project, config: &EngineConfig) -> AppResult<SimulationResult> {
    let mut ledger = Ledger::default();
    let config = run_config(project, config, &mut ledger);

    let mut gas_feeds = project.feeds_of(FeedKind::Gas);
    let Some((index, def)) = gas_feeds.next() else {
        ledger.warn("feed_streams", "no gas feed stream declared", Severity::Error);
        return Ok(SimulationResult::empty(Variant::GasOnly, ledger));
    };
    if gas_feeds.next().is_some() {
        ledger.warn(
            "feed_streams",
            "only the first gas feed is simulated",
            Severity::Info,
        );
    }
    let Some(feed) = interpret_feed(def, index, &mut ledger) else {
        return Ok(SimulationResult::empty(Variant::GasOnly, ledger));
    };

    let mut stages = build_train(&select_gas_train(), &config);
    route(&feed, &mut stages)?;
    let equipment = size(&stages, &mut ledger);

    let mut summary = std::collections::BTreeMap::new();
    put_stream(&mut summary, "feed_gas", &feed);
    put_methane(&mut summary, &feed);
    if let Some(upgrader) = stages.iter().find(|s| s.kind == StageKind::GasUpgrading) {
        put(&mut summary, "rng_product", upgrader.effluent.flow(), "Nm3/d");
    }
    tracing::info!(
        project = %project.name,
        flow = feed.flow(),
        equipment = equipment.len(),
        "gas-only run complete"
    );

    Ok(SimulationResult {
        variant: Variant::GasOnly,
        stages,
        recycle_streams: Vec::new(),
        equipment,
        convergence: single_pass(),
        assumptions: ledger.assumptions,
        warnings: ledger.warnings,
        summary,
    })
}
