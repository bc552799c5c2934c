//! Headless animation timing.
//!
//! Frames never render here; what matters to gameplay is how long a clip
//! runs (attack windows, kill sequences) and when a one-shot finishes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-frame interval used when a definition file omits one, in milliseconds.
pub const DEFAULT_FRAME_INTERVAL_MS: f32 = 10.0;

/// Authored clip data as it appears in definition files.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClipDef {
    pub frames: u32,
    #[serde(default = "default_interval")]
    pub frame_interval_ms: f32,
    #[serde(default)]
    pub looping: bool,
}

fn default_interval() -> f32 {
    DEFAULT_FRAME_INTERVAL_MS
}

impl ClipDef {
    pub fn duration(&self) -> f32 {
        self.frames as f32 * self.frame_interval_ms / 1000.0
    }
}

/// A character's full set of clips, keyed by state name (`"idle"`,
/// `"attacking"`, ...). States without an authored clip fall back to the
/// fallback clip chosen at construction.
#[derive(Clone, Debug)]
pub struct AnimationSet {
    clips: HashMap<String, ClipDef>,
    fallback: ClipDef,
}

impl AnimationSet {
    /// Build from authored clips. `fallback_key` names the clip substituted
    /// for states with no clip of their own; if it is missing too there is
    /// nothing renderable and construction fails.
    pub fn new(clips: HashMap<String, ClipDef>, fallback_key: &str) -> Option<Self> {
        let fallback = clips.get(fallback_key)?.clone();
        Some(Self { clips, fallback })
    }

    pub fn clip(&self, key: &str) -> &ClipDef {
        self.clips.get(key).unwrap_or(&self.fallback)
    }

    pub fn has_clip(&self, key: &str) -> bool {
        self.clips.contains_key(key)
    }

    /// Duration of the clip for `key` (fallback duration if unauthored).
    pub fn duration(&self, key: &str) -> f32 {
        self.clip(key).duration()
    }
}

/// Plays one clip at a time, tracking frame index and one-shot completion.
#[derive(Clone, Debug)]
pub struct Animator {
    current_key: String,
    frames: u32,
    frame_interval: f32,
    looping: bool,
    frame: u32,
    timer: f32,
    finished: bool,
}

impl Animator {
    pub fn new(key: &str, clip: &ClipDef) -> Self {
        let mut animator = Self {
            current_key: String::new(),
            frames: 1,
            frame_interval: DEFAULT_FRAME_INTERVAL_MS / 1000.0,
            looping: true,
            frame: 0,
            timer: 0.0,
            finished: false,
        };
        animator.play(key, clip);
        animator
    }

    /// Switch to a clip, restarting it. Re-playing the current clip is a
    /// no-op so a held state does not stutter its animation every frame.
    pub fn play(&mut self, key: &str, clip: &ClipDef) {
        if self.current_key == key {
            return;
        }
        self.current_key = key.to_string();
        self.frames = clip.frames.max(1);
        self.frame_interval = clip.frame_interval_ms.max(0.001) / 1000.0;
        self.looping = clip.looping;
        self.frame = 0;
        self.timer = 0.0;
        self.finished = false;
    }

    pub fn current_key(&self) -> &str {
        &self.current_key
    }

    pub fn current_frame(&self) -> u32 {
        self.frame
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance the clip. Returns true on the tick a one-shot completes.
    pub fn update(&mut self, dt: f32) -> bool {
        if self.finished {
            return false;
        }
        self.timer += dt;
        while self.timer >= self.frame_interval {
            self.timer -= self.frame_interval;
            if self.frame + 1 < self.frames {
                self.frame += 1;
            } else if self.looping {
                self.frame = 0;
            } else {
                self.finished = true;
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(frames: u32, interval_ms: f32, looping: bool) -> ClipDef {
        ClipDef {
            frames,
            frame_interval_ms: interval_ms,
            looping,
        }
    }

    #[test]
    fn missing_interval_defaults() {
        let parsed: ClipDef = serde_json::from_str(r#"{"frames": 4}"#).unwrap();
        assert_eq!(parsed.frame_interval_ms, DEFAULT_FRAME_INTERVAL_MS);
        assert!(!parsed.looping);
    }

    #[test]
    fn one_shot_reports_completion_once() {
        let c = clip(3, 100.0, false);
        let mut animator = Animator::new("attacking", &c);
        assert!(!animator.update(0.15)); // frame 1
        assert!(!animator.update(0.1)); // frame 2
        assert!(animator.update(0.1)); // done
        assert!(animator.is_finished());
        assert!(!animator.update(0.1));
    }

    #[test]
    fn looping_clip_wraps_and_never_finishes() {
        let c = clip(2, 50.0, true);
        let mut animator = Animator::new("running", &c);
        for _ in 0..20 {
            assert!(!animator.update(0.05));
        }
        assert!(!animator.is_finished());
    }

    #[test]
    fn replaying_current_clip_does_not_restart() {
        let c = clip(4, 50.0, true);
        let mut animator = Animator::new("idle", &c);
        animator.update(0.06);
        let frame = animator.current_frame();
        animator.play("idle", &c);
        assert_eq!(animator.current_frame(), frame);
    }

    #[test]
    fn animation_set_falls_back_for_unknown_states() {
        let mut clips = HashMap::new();
        clips.insert("idle".to_string(), clip(2, 100.0, true));
        let set = AnimationSet::new(clips, "idle").unwrap();
        assert_eq!(set.clip("dodging_forward").frames, 2);
        assert!(!set.has_clip("dodging_forward"));
        assert!(AnimationSet::new(HashMap::new(), "idle").is_none());
    }
}
