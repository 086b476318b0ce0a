//! Scrap Arena Server binary.
//!
//! `scrap-arena-server` runs an offline demo match and verifies its
//! transcript; `scrap-arena-server --serve [addr]` runs the WebSocket
//! server.

use std::collections::BTreeMap;
use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use scrap_arena::{
    TICK_RATE, VERSION,
    game::{
        authority::Authority,
        events::GameEventData,
        fighter::{EntityId, Team},
        input::InputSnapshot,
        replay::RoundTranscript,
        tick::{ArenaConfig, ArenaPhase, ArenaState, tick},
    },
    network::{ArenaServer, ServerConfig},
};

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Scrap Arena Server v{}", VERSION);
    info!("Tick rate: {} Hz", TICK_RATE);

    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("--serve") {
        let bind_addr = args
            .get(2)
            .cloned()
            .unwrap_or_else(|| "127.0.0.1:9001".to_string());

        let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
        return runtime
            .block_on(ArenaServer::new(ServerConfig { bind_addr, ..ServerConfig::default() }).run())
            .context("server stopped");
    }

    demo_match();
    Ok(())
}

/// Scripted input: close on the nearest opponent, striking on a personal
/// rhythm. Deterministic - it reads only simulation state.
fn scripted_input(state: &ArenaState, id: EntityId, t: u32) -> InputSnapshot {
    let Some(me) = state.registry.get(id) else {
        return InputSnapshot::new();
    };

    // Nearest living opponent, lowest id on ties
    let mut nearest: Option<(EntityId, i32)> = None;
    for other in state.registry.iter() {
        if other.team == me.team || !state.registry.is_alive(other.id) {
            continue;
        }
        let dist = me.body.position.distance_squared(other.body.position);
        if nearest.map(|(_, best)| dist < best).unwrap_or(true) {
            nearest = Some((other.id, dist));
        }
    }

    let Some((target_id, dist)) = nearest else {
        return InputSnapshot::new();
    };
    let target = match state.registry.get(target_id) {
        Some(f) => f,
        None => return InputSnapshot::new(),
    };

    let dx = target.body.position.x - me.body.position.x;
    let dy = target.body.position.y - me.body.position.y;
    let mut snap = InputSnapshot::with_stick(
        if dx > 0 { 100 } else if dx < 0 { -100 } else { 0 },
        if dy > 0 { 100 } else if dy < 0 { -100 } else { 0 },
    );

    // Sprint while far out, swing on a per-fighter rhythm when near
    let near = dist < scrap_arena::core::fixed::to_fixed(9.0); // within 3 units
    snap.set_run(!near);
    if near && t % (23 + id.0 * 7) == 0 {
        snap.set_attack(true);
    }
    snap
}

/// Run a scripted 2v2 match offline, then verify its transcript.
fn demo_match() {
    info!("=== Starting Demo Match ===");

    let config = ArenaConfig {
        base_health: 400,
        next_round_delay_ticks: 120,
        leave_delay_ticks: 60,
        ..ArenaConfig::default()
    };

    let match_id = [1u8; 16];
    let rng_seed = 12345u64;
    let mut state = ArenaState::new(match_id, rng_seed, &config);

    let roster = [
        (EntityId(1), "red"),
        (EntityId(2), "red"),
        (EntityId(3), "blue"),
        (EntityId(4), "blue"),
    ];
    for (id, team) in roster {
        state.add_fighter(id, Team::new(team), &config);
    }
    let authority = Authority::host_of(roster.iter().map(|(id, _)| *id));

    let mut transcript = RoundTranscript::new(
        match_id,
        rng_seed,
        roster
            .iter()
            .map(|(id, team)| (*id, Team::new(*team)))
            .collect(),
        config.clone(),
    );

    state.start_round(&config);

    let mut total_events = 0usize;
    let mut last_report = 0u32;

    for _ in 0..200_000u32 {
        let t = state.tick + 1;

        let mut inputs = BTreeMap::new();
        for (id, _) in roster {
            let snap = scripted_input(&state, id, t);
            inputs.insert(id, snap);
            transcript.record_input(t, id, snap);
        }

        let contacts = state.sense_contacts();
        for contact in &contacts {
            transcript.record_contact(t, *contact);
        }

        let result = tick(&mut state, &inputs, &contacts, &authority, &config);
        total_events += result.events.len();

        for event in &result.events {
            match &event.data {
                GameEventData::HitLanded { attacker, target, damage, .. } => {
                    info!("fighter {attacker} hit {target} for {damage} damage");
                }
                GameEventData::FighterDefeated { entity, team } => {
                    info!("fighter {entity} ({team}) knocked out");
                }
                GameEventData::RoundEnded { round, winning_team, wins } => match winning_team {
                    Some(team) => info!("round {round} to {team} ({wins} wins)"),
                    None => info!("round {round} drawn"),
                },
                GameEventData::MatchEnded { winning_team } => {
                    info!("match over, {winning_team} takes it");
                }
                GameEventData::RoundStarted { round } => info!("round {round} begins"),
            }
        }

        if state.tick.saturating_sub(last_report) >= 600 {
            last_report = state.tick;
            info!(
                "tick {}: {} alive, {} events so far",
                state.tick,
                state.registry.alive_count(),
                total_events
            );
        }

        if matches!(state.phase, ArenaPhase::Ended) {
            break;
        }
    }

    let final_hash = state.compute_hash();
    transcript.finalize(state.tick, final_hash);

    info!("=== Match Results ===");
    info!("Final tick: {}", state.tick);
    info!("Final state hash: {}", hex::encode(final_hash));
    for (team, wins) in state.controller.scoreboard.standings() {
        info!("{team}: {wins} round(s)");
    }
    info!(
        "Transcript: {} input deltas, {} bytes",
        transcript.input_delta_count(),
        transcript.encode().map(|b| b.len()).unwrap_or(0)
    );

    info!("=== Verifying Determinism ===");
    let verification = transcript.verify();
    if verification.matches {
        info!("DETERMINISM VERIFIED: replay reproduced the live hash");
    } else {
        info!(
            "DETERMINISM FAILURE: live {} vs replay {}",
            hex::encode(verification.expected),
            hex::encode(verification.replayed)
        );
    }
}
