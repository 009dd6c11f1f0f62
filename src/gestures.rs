//! Turns pointer input on the rendered document into playback commands.
//!
//! A click on a word speaks the word. A double click or a long press on a word,
//! or a click anywhere else inside a sentence, speaks the sentence. A long press
//! swallows the click that ends it.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackCommand {
    SpeakWord { segment: usize, token: usize },
    SpeakSentence { segment: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Word { segment: usize, token: usize },
    /// Inside a sentence but not on a word token.
    Sentence { segment: usize },
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Word { segment: usize, token: usize },
    Sentence { segment: usize },
    /// The element holding the whole document; the walk stops here.
    Root,
    Other,
}

pub trait RenderNode: Sized {
    fn role(&self) -> NodeRole;
    fn parent(&self) -> Option<Self>;
}

/// A word only when the node itself is a word; otherwise walk up to the nearest
/// sentence container.
pub fn hit_target<N: RenderNode>(node: N) -> HitTarget {
    if let NodeRole::Word { segment, token } = node.role() {
        return HitTarget::Word { segment, token };
    }
    let mut current = Some(node);
    while let Some(candidate) = current {
        match candidate.role() {
            NodeRole::Sentence { segment } => return HitTarget::Sentence { segment },
            NodeRole::Root => return HitTarget::Outside,
            NodeRole::Word { .. } | NodeRole::Other => current = candidate.parent(),
        }
    }
    HitTarget::Outside
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Down { target: HitTarget },
    Up,
    /// Press aborted (pointer left, scroll started).
    Cancel,
    Click { target: HitTarget, count: u32 },
}

#[derive(Debug, Clone, Copy)]
struct Press {
    segment: usize,
    deadline: Instant,
    fired: bool,
}

/// Gesture state for one pointer. Time is passed in, so callers decide whether
/// it is real or simulated.
#[derive(Debug)]
pub struct GestureArbiter {
    long_press: Duration,
    press: Option<Press>,
}

impl GestureArbiter {
    pub fn new(long_press: Duration) -> Self {
        Self { long_press, press: None }
    }

    /// Drops any armed press, e.g. when the document under it is replaced.
    pub fn reset(&mut self) {
        self.press = None;
    }

    /// When the pending long press would fire, if one is armed.
    pub fn long_press_deadline(&self) -> Option<Instant> {
        self.press.filter(|press| !press.fired).map(|press| press.deadline)
    }

    pub fn handle(&mut self, event: PointerEvent, now: Instant) -> Option<PlaybackCommand> {
        match event {
            PointerEvent::Down { target } => {
                self.pointer_down(target, now);
                None
            }
            PointerEvent::Up => self.pointer_up(now),
            PointerEvent::Cancel => {
                self.press = None;
                None
            }
            PointerEvent::Click { target, count } => self.click(target, count),
        }
    }

    fn pointer_down(&mut self, target: HitTarget, now: Instant) {
        self.press = match target {
            HitTarget::Word { segment, .. } => Some(Press {
                segment,
                deadline: now + self.long_press,
                fired: false,
            }),
            _ => None,
        };
    }

    /// The long-press timer; fires at most once per press.
    pub fn fire_long_press(&mut self, now: Instant) -> Option<PlaybackCommand> {
        let press = self.press.as_mut()?;
        if press.fired || now < press.deadline {
            return None;
        }
        press.fired = true;
        debug!(segment = press.segment, "long press");
        Some(PlaybackCommand::SpeakSentence { segment: press.segment })
    }

    fn pointer_up(&mut self, now: Instant) -> Option<PlaybackCommand> {
        let fired_now = self.fire_long_press(now);
        if !self.press.map_or(false, |press| press.fired) {
            self.press = None;
        }
        fired_now
    }

    /// Platforms report a double click as a count-1 click followed by a count-2
    /// click, so one double click yields `SpeakWord` then `SpeakSentence`. The
    /// second supersedes the first in playback; clicks are not delayed to wait
    /// for a possible second one.
    fn click(&mut self, target: HitTarget, count: u32) -> Option<PlaybackCommand> {
        if self.press.take().map_or(false, |press| press.fired) {
            debug!("click swallowed after long press");
            return None;
        }
        match target {
            HitTarget::Word { segment, .. } if count >= 2 => Some(PlaybackCommand::SpeakSentence { segment }),
            HitTarget::Word { segment, token } => Some(PlaybackCommand::SpeakWord { segment, token }),
            HitTarget::Sentence { segment } => Some(PlaybackCommand::SpeakSentence { segment }),
            HitTarget::Outside => None,
        }
    }
}

/// Feeds pointer events through the arbiter until the channel closes.
///
/// While a press is armed, its deadline and the next pointer event race; the
/// first one to fire wins and the other is dropped.
pub async fn drive_gestures<F>(arbiter: &mut GestureArbiter, mut events: mpsc::Receiver<PointerEvent>, mut on_command: F)
where
    F: FnMut(PlaybackCommand),
{
    loop {
        let next = match arbiter.long_press_deadline() {
            Some(deadline) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {
                        if let Some(command) = arbiter.fire_long_press(Instant::now()) {
                            on_command(command);
                        }
                        continue;
                    }
                    event = events.recv() => event,
                }
            }
            None => events.recv().await,
        };

        let Some(event) = next else {
            break;
        };
        if let Some(command) = arbiter.handle(event, Instant::now()) {
            on_command(command);
        }
    }
}
