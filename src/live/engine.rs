//! Per-connection live-stream state machine.
//!
//! ```text
//! INIT ──(first section loops on a timer)──▶ LOOP ──(counted groups exhausted)──▶ CLOSED
//!   │
//!   └──(otherwise)──▶ SEQUENTIAL_DRAIN ──▶ IDLE_LISTEN
//!
//! cancellation (client gone, deadline, shutdown) ──▶ CLOSED from any state
//! ```
//!
//! The engine never touches the session: the caller settles the cursor with
//! [`start_position`] before the stream's headers go out.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::bridge::{Signals, Subscription};
use crate::observability::metrics;
use crate::render::{render, RenderContext};
use crate::routing::Frontmatter;
use crate::sequence::{clamp, group_at, next_group, select_and_advance, Group, SectionEntry};
use crate::session::{HitCounters, SessionState};

/// Why a stream stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Server shutdown.
    Cancelled,
    /// The client disconnected.
    ClientGone,
    /// The configured maximum stream lifetime elapsed.
    Deadline,
    /// Every counted loop group ran out.
    Finished,
    /// A section failed to render.
    RenderFailed,
}

/// Tunables shared by every live stream.
#[derive(Debug, Clone, Copy)]
pub struct LiveSettings {
    /// Wait between sequential sections whose file sets no `delay`.
    pub default_delay: Duration,
    /// Hard cap on a stream's lifetime.
    pub max_lifetime: Option<Duration>,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            default_delay: Duration::from_millis(crate::routing::template::DEFAULT_DELAY_MS),
            max_lifetime: None,
        }
    }
}

/// Pick where a live stream starts and settle the session cursor.
///
/// Timer-driven loops resume from the stored cursor without moving it.
/// Everything else plays from the first section and advances the cursor
/// the same way an HTML request would.
pub fn start_position(state: &mut SessionState, key: &str, entries: &[SectionEntry]) -> usize {
    match entries.first() {
        Some(first) if first.options.is_timed_loop() => clamp(state.position(key), entries.len()),
        Some(_) => {
            select_and_advance(state, key, entries);
            0
        }
        None => 0,
    }
}

/// Bridge messages addressed to one live connection.
pub struct Inbox {
    rx: mpsc::Receiver<Bytes>,
    open: bool,
    _subscriptions: Vec<Subscription>,
}

impl Inbox {
    /// An inbox fed by `subscriptions`, which stay open as long as it lives.
    pub fn new(rx: mpsc::Receiver<Bytes>, subscriptions: Vec<Subscription>) -> Self {
        Self {
            rx,
            open: true,
            _subscriptions: subscriptions,
        }
    }

    /// Next message. Once every sender is gone this waits forever.
    async fn recv(&mut self) -> Bytes {
        if self.open {
            if let Some(payload) = self.rx.recv().await {
                return payload;
            }
            self.open = false;
        }
        std::future::pending().await
    }
}

/// Position inside a timer-driven loop.
#[derive(Debug, Clone, Copy)]
struct LoopState {
    /// Entries the loop cycles through.
    scope: Group,
    /// Offset of the first displayed entry within `scope`.
    offset: usize,
    /// Displays so far in this scope, the initial one included.
    ticks: usize,
    /// Total displays allowed, `None` for forever.
    budget: Option<usize>,
    interval: Duration,
}

impl LoopState {
    fn for_scope(scope: Group, offset: usize, options: &Frontmatter) -> Self {
        Self {
            scope,
            offset,
            ticks: 1,
            budget: options.passes().map(|passes| passes * scope.len),
            interval: options.loop_interval(),
        }
    }

    /// A group taken over from an exhausted one. Nothing of it is shown yet.
    fn adopted(scope: Group, options: &Frontmatter) -> Self {
        Self {
            ticks: 0,
            ..Self::for_scope(scope, 0, options)
        }
    }

    fn exhausted(&self) -> bool {
        self.budget.is_some_and(|budget| self.ticks >= budget)
    }

    /// Advance one display and return the entry to show.
    fn step(&mut self) -> usize {
        let position = self.scope.start + (self.offset + self.ticks) % self.scope.len;
        self.ticks += 1;
        position
    }
}

/// Outcome of waiting for the next event.
enum Wake {
    Stop(StreamEnd),
    Tick,
    Message(Bytes),
}

/// One live connection's state.
pub struct LiveEngine {
    entries: Vec<SectionEntry>,
    position: usize,
    ctx: RenderContext,
    counters: HitCounters,
    settings: LiveSettings,
}

impl LiveEngine {
    pub fn new(
        entries: Vec<SectionEntry>,
        position: usize,
        ctx: RenderContext,
        counters: HitCounters,
        settings: LiveSettings,
    ) -> Self {
        let position = clamp(position, entries.len());
        Self {
            entries,
            position,
            ctx,
            counters,
            settings,
        }
    }

    /// Drive the stream until it ends, sending rendered fragments to `out`.
    pub async fn run(
        mut self,
        out: mpsc::Sender<String>,
        mut inbox: Inbox,
        cancel: CancellationToken,
    ) -> StreamEnd {
        metrics::live_stream_opened();
        let deadline = self.settings.max_lifetime.map(|d| Instant::now() + d);
        let end = self.drive(&out, &mut inbox, &cancel, deadline).await;
        metrics::live_stream_closed();
        tracing::debug!(url = %self.ctx.url, ?end, messages = self.ctx.message_count, "Live stream closed");
        end
    }

    async fn drive(
        &mut self,
        out: &mpsc::Sender<String>,
        inbox: &mut Inbox,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> StreamEnd {
        if self.entries.is_empty() {
            return StreamEnd::Finished;
        }

        if let Err(end) = self.emit_current(out).await {
            return end;
        }

        if self.entries[0].options.is_timed_loop() {
            return self.run_loop(out, inbox, cancel, deadline).await;
        }
        match self.drain(out, inbox, cancel, deadline).await {
            Ok(()) => self.idle(out, inbox, cancel, deadline).await,
            Err(end) => end,
        }
    }

    /// LOOP: advance on every timer tick, re-render on bridge messages.
    async fn run_loop(
        &mut self,
        out: &mpsc::Sender<String>,
        inbox: &mut Inbox,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> StreamEnd {
        let current = self.entries[self.position].options;
        let options = if current.is_timed_loop() {
            current
        } else {
            self.entries[0].options
        };

        let mut state = if options.passes().is_some() {
            // Counted loops cycle only the file being shown.
            match group_at(&self.entries, self.position) {
                Some(group) => LoopState::for_scope(group, self.position - group.start, &options),
                None => return StreamEnd::Finished,
            }
        } else {
            let whole = Group {
                start: 0,
                len: self.entries.len(),
            };
            LoopState::for_scope(whole, self.position, &options)
        };
        let mut ticker = new_ticker(state.interval);

        loop {
            let wake = tokio::select! {
                end = stopped(out, cancel, deadline) => Wake::Stop(end),
                _ = ticker.tick() => Wake::Tick,
                payload = inbox.recv() => Wake::Message(payload),
            };

            match wake {
                Wake::Stop(end) => return end,
                Wake::Message(payload) => {
                    if let Err(end) = self.on_message(out, payload).await {
                        return end;
                    }
                }
                Wake::Tick if !state.exhausted() => {
                    self.position = state.step();
                    if let Err(end) = self.tick(out).await {
                        return end;
                    }
                }
                Wake::Tick => {
                    let Some(next) = next_group(&self.entries, state.scope) else {
                        return StreamEnd::Finished;
                    };
                    let next_options = self.entries[next.start].options;

                    if next_options.is_timed_loop() {
                        // Its first section shows on the next tick of the new interval.
                        state = LoopState::adopted(next, &next_options);
                        ticker = new_ticker(state.interval);
                        continue;
                    }

                    for position in next.start..next.end() {
                        self.position = position;
                        if let Err(end) = self.tick(out).await {
                            return end;
                        }
                    }
                    return StreamEnd::Finished;
                }
            }
        }
    }

    /// SEQUENTIAL_DRAIN: show the remaining sections one by one, pausing
    /// for the displayed section's delay before each.
    async fn drain(
        &mut self,
        out: &mpsc::Sender<String>,
        inbox: &mut Inbox,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<(), StreamEnd> {
        while self.position + 1 < self.entries.len() {
            let delay = Duration::from_millis(
                self.entries[self.position]
                    .options
                    .effective_delay_ms(self.settings.default_delay.as_millis() as u64),
            );
            let wait = time::sleep(delay);
            tokio::pin!(wait);

            loop {
                let wake = tokio::select! {
                    end = stopped(out, cancel, deadline) => Wake::Stop(end),
                    _ = &mut wait => Wake::Tick,
                    payload = inbox.recv() => Wake::Message(payload),
                };
                match wake {
                    Wake::Stop(end) => return Err(end),
                    Wake::Message(payload) => self.on_message(out, payload).await?,
                    Wake::Tick => break,
                }
            }

            self.position += 1;
            self.refresh();
            self.emit_current(out).await?;
        }
        Ok(())
    }

    /// IDLE_LISTEN: re-render the last section whenever signals arrive.
    async fn idle(
        &mut self,
        out: &mpsc::Sender<String>,
        inbox: &mut Inbox,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> StreamEnd {
        loop {
            let wake = tokio::select! {
                end = stopped(out, cancel, deadline) => Wake::Stop(end),
                payload = inbox.recv() => Wake::Message(payload),
            };
            match wake {
                Wake::Stop(end) => return end,
                Wake::Message(payload) => {
                    if let Err(end) = self.on_message(out, payload).await {
                        return end;
                    }
                }
                Wake::Tick => {}
            }
        }
    }

    /// A timer step: new iteration, fresh counters, render the current entry.
    async fn tick(&mut self, out: &mpsc::Sender<String>) -> Result<(), StreamEnd> {
        self.ctx.loop_iteration += 1;
        self.refresh();
        self.emit_current(out).await
    }

    /// Merge signals from the bridge and re-render in place.
    async fn on_message(&mut self, out: &mpsc::Sender<String>, payload: Bytes) -> Result<(), StreamEnd> {
        match Signals::from_json(&payload) {
            Ok(incoming) => {
                metrics::record_bridge_received();
                self.ctx.signals.merge(incoming);
            }
            Err(e) => {
                tracing::warn!(url = %self.ctx.url, error = %e, "Ignoring undecodable bridge message");
                return Ok(());
            }
        }
        self.refresh();
        self.emit_current(out).await
    }

    fn refresh(&mut self) {
        self.ctx.refresh_hits(&self.counters);
    }

    /// Render the entry at `position` and send it. Empty bodies send nothing.
    async fn emit_current(&mut self, out: &mpsc::Sender<String>) -> Result<(), StreamEnd> {
        let body = &self.entries[self.position].body;
        if body.is_empty() {
            return Ok(());
        }

        let html = match render(body, &self.ctx.to_template_data()) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(url = %self.ctx.url, position = self.position, error = %e, "Live render failed");
                return Err(StreamEnd::RenderFailed);
            }
        };

        out.send(html).await.map_err(|_| StreamEnd::ClientGone)?;
        metrics::record_patch();
        self.ctx.message_count += 1;
        Ok(())
    }
}

fn new_ticker(period: Duration) -> time::Interval {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Resolves when the stream must stop for a reason outside the engine.
async fn stopped(
    out: &mpsc::Sender<String>,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
) -> StreamEnd {
    let lifetime = async {
        match deadline {
            Some(at) => time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        _ = cancel.cancelled() => StreamEnd::Cancelled,
        _ = out.closed() => StreamEnd::ClientGone,
        _ = lifetime => StreamEnd::Deadline,
    }
}
