use std::process::ExitCode;
use std::time::Duration;

use room_stream::{BugUnitId, FixOutcome, RoomStreamer};
use tracing::{debug, error, info, warn};

use super::bootstrap::{AppWiring, DemoSettings};
use super::sim::{SimActor, SimVisualFactory};

type Streamer = RoomStreamer<SimVisualFactory, SimActor>;

/// Host frame times replayed by the headless loop, in milliseconds.
const FRAME_PATTERN_MS: [u64; 6] = [16, 17, 16, 33, 16, 120];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatrolState {
    Walking,
    Fixing { bug: BugUnitId, remaining: Duration },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct FixTally {
    counted: u32,
    already_counted: u32,
    orphaned: u32,
}

impl FixTally {
    fn record(&mut self, outcome: FixOutcome) {
        match outcome {
            FixOutcome::Counted { .. } => self.counted = self.counted.saturating_add(1),
            FixOutcome::AlreadyCounted { .. } => {
                self.already_counted = self.already_counted.saturating_add(1)
            }
            FixOutcome::Orphaned => self.orphaned = self.orphaned.saturating_add(1),
            FixOutcome::Ignored => {}
        }
    }
}

/// Walks the actor back and forth between two room bounds and stops in every
/// tracked room that still has live, unfixed bug units.
#[derive(Debug)]
struct Patrol {
    state: PatrolState,
    direction: f32,
    walk_speed: f32,
    min_position: f32,
    max_position: f32,
    fix_duration: Duration,
    tally: FixTally,
}

impl Patrol {
    fn new(settings: &DemoSettings, spacing: f32) -> Self {
        let bound = settings.patrol_rooms as f32 * spacing;
        Self {
            state: PatrolState::Walking,
            direction: 1.0,
            walk_speed: settings.walk_speed,
            min_position: -bound,
            max_position: bound,
            fix_duration: settings.fix_duration,
            tally: FixTally::default(),
        }
    }

    fn tick(&mut self, dt: Duration, streamer: &mut Streamer, actor: &SimActor) {
        match self.state {
            PatrolState::Fixing { bug, remaining } => {
                if remaining > dt {
                    self.state = PatrolState::Fixing {
                        bug,
                        remaining: remaining.saturating_sub(dt),
                    };
                    return;
                }
                if let Some(unit) = streamer.factory().bug(bug) {
                    unit.finish_fix();
                }
                let outcome = streamer.notify_bug_fixed(bug);
                debug!(bug = %bug, outcome = ?outcome, "patrol_fix_finished");
                self.tally.record(outcome);
                self.state = PatrolState::Walking;
            }
            PatrolState::Walking => {
                if let Some(bug) = next_unfixed_bug(streamer) {
                    if let Some(unit) = streamer.factory().bug(bug) {
                        unit.start_fix();
                    }
                    self.state = PatrolState::Fixing {
                        bug,
                        remaining: self.fix_duration,
                    };
                    return;
                }
                self.walk(dt, actor);
            }
        }
    }

    fn walk(&mut self, dt: Duration, actor: &SimActor) {
        let mut next = actor.position() + self.direction * self.walk_speed * dt.as_secs_f32();
        if next >= self.max_position {
            next = self.max_position;
            self.direction = -1.0;
        } else if next <= self.min_position {
            next = self.min_position;
            self.direction = 1.0;
        }
        actor.set_position(next);
    }
}

fn next_unfixed_bug(streamer: &Streamer) -> Option<BugUnitId> {
    if !streamer.has_unfixed_bugs_in_current_slot() {
        return None;
    }
    streamer
        .bugs_in_slot(streamer.current_sequence())
        .iter()
        .find(|unit| unit.is_active() && !unit.is_being_fixed())
        .map(|unit| unit.id())
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring { config, settings } = app;
    let spacing = config.spacing;
    let factory = SimVisualFactory::new(config.variants.clone());
    let actor = SimActor::at(0.0);
    let mut streamer = RoomStreamer::new(config, factory, actor.clone());

    if let Err(err) = streamer.initialize() {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }
    let _ = streamer.subscribe_completion(|event| {
        info!(
            total_fixed = event.total_fixed,
            total_discovered = event.total_discovered,
            "completion_observed"
        );
    });

    let mut patrol = Patrol::new(&settings, spacing);
    simulate(&settings, &mut streamer, &mut patrol, &actor);
    final_sweep(&mut streamer);
    log_window(&streamer);

    streamer.teardown();
    let (created, repositioned, destroyed) = streamer.factory().counters();
    info!(
        created,
        repositioned,
        destroyed,
        counted = patrol.tally.counted,
        already_counted = patrol.tally.already_counted,
        orphaned = patrol.tally.orphaned,
        "demo_finished"
    );
    ExitCode::SUCCESS
}

fn simulate(
    settings: &DemoSettings,
    streamer: &mut Streamer,
    patrol: &mut Patrol,
    actor: &SimActor,
) {
    let mut accumulator = Duration::ZERO;
    let mut simulated = Duration::ZERO;
    let mut since_stats = Duration::ZERO;
    let mut frame = 0usize;

    while simulated < settings.run_duration {
        let frame_dt = Duration::from_millis(FRAME_PATTERN_MS[frame % FRAME_PATTERN_MS.len()]);
        frame = frame.wrapping_add(1);
        accumulator = accumulator.saturating_add(frame_dt);

        let plan = plan_sim_steps(accumulator, settings.fixed_dt, settings.max_ticks_per_frame);
        accumulator = plan.remaining_accumulator;
        if plan.dropped_backlog > Duration::ZERO {
            debug!(
                dropped_ms = plan.dropped_backlog.as_secs_f64() * 1000.0,
                "sim_backlog_dropped"
            );
        }

        for _ in 0..plan.ticks_to_run {
            patrol.tick(settings.fixed_dt, streamer, actor);
            let _ = streamer.update(settings.fixed_dt);
            simulated = simulated.saturating_add(settings.fixed_dt);
            since_stats = since_stats.saturating_add(settings.fixed_dt);
        }

        if since_stats >= settings.stats_interval {
            since_stats = Duration::ZERO;
            log_stats(streamer, actor, simulated);
        }
    }
}

/// Fixes everything still live in the window, then resyncs the ledger so
/// bugs that were recycled away unfixed stop counting against completion.
fn final_sweep(streamer: &mut Streamer) {
    let pending: Vec<BugUnitId> = streamer
        .window_snapshot()
        .iter()
        .flat_map(|entry| streamer.bugs_in_slot(entry.sequence))
        .filter(|unit| unit.is_active())
        .map(|unit| unit.id())
        .collect();
    for id in &pending {
        if let Some(unit) = streamer.factory().bug(*id) {
            unit.finish_fix();
        }
        let _ = streamer.notify_bug_fixed(*id);
    }

    let (fixed, total) = streamer.global_bug_stats();
    info!(
        swept = pending.len(),
        fixed,
        total,
        stale = streamer.remaining_bugs(),
        "sweep_finished"
    );
    streamer.rescan_all();
    let (fixed, total) = streamer.global_bug_stats();
    info!(
        fixed,
        total,
        completed = streamer.is_completed(),
        completions = streamer.completion_count(),
        "ledger_resynced"
    );
}

fn log_stats(streamer: &Streamer, actor: &SimActor, simulated: Duration) {
    let (fixed, total) = streamer.global_bug_stats();
    let (lo, hi) = streamer
        .window()
        .and_then(|window| window.sequence_range())
        .unwrap_or_default();
    info!(
        simulated_s = simulated.as_secs(),
        actor_position = actor.position(),
        sequence = streamer.current_sequence(),
        window_lo = lo,
        window_hi = hi,
        fixed,
        total,
        orphaned = streamer.orphaned_fix_count(),
        "stream_stats"
    );
}

fn log_window(streamer: &Streamer) {
    match serde_json::to_string(&streamer.window_snapshot()) {
        Ok(json) => info!(window = json.as_str(), "window_snapshot"),
        Err(err) => warn!(error = %err, "window_snapshot_encode_failed"),
    }
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}
