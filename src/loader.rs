//! Boot loader screen
//!
//! A scripted, timed sequence of joke loading messages with a progress bar.
//! The script is pure data; the frontend advances it with wall-clock time and
//! mirrors [`LoaderView`] into the DOM.

const NORMAL_MESSAGES: [&str; 10] = [
    "Initializing quantum flux capacitor...",
    "Downloading more RAM...",
    "Teaching AI to play Pong...",
    "Reticulating splines...",
    "Generating witty loading messages...",
    "Solving P vs NP problem...",
    "Proving Fermat's Last Theorem...",
    "Calculating the meaning of life...",
    "Compressing time itself...",
    "Dividing by zero...",
];

const COMMODORE_MESSAGES: [&str; 6] = [
    "LOAD \"*\",8,1",
    "SEARCHING FOR JINGLE-ROCKET",
    "LOADING",
    "?SYNTAX ERROR",
    "?DEVICE NOT PRESENT",
    "PRESS PLAY ON TAPE",
];

const FILE_BROWSING_MESSAGES: [&str; 8] = [
    "Accessing system files...",
    "Found user's browser history...",
    "Oh my... what's this folder?",
    "😳 These images are... interesting",
    "Better delete this quickly",
    "No one needs to see that",
    "Clearing browser history...",
    "Pretending this never happened",
];

/// One message held on screen for a fixed time
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderStep {
    pub message: &'static str,
    /// Progress bar fill (0-100) while the message is shown
    pub progress: f32,
    pub duration_ms: f64,
    /// Show the striped retro pattern behind the message
    pub retro: bool,
}

/// Spread `messages` evenly over `duration_ms` and a progress range
fn sequence(
    steps: &mut Vec<LoaderStep>,
    messages: &[&'static str],
    duration_ms: f64,
    progress: (f32, f32),
    retro: bool,
) {
    let per_message = duration_ms / messages.len() as f64;
    let per_progress = (progress.1 - progress.0) / messages.len() as f32;
    for (i, message) in messages.iter().copied().enumerate() {
        steps.push(LoaderStep {
            message,
            progress: progress.0 + per_progress * i as f32,
            duration_ms: per_message,
            retro,
        });
    }
}

/// The full boot script
pub fn script() -> Vec<LoaderStep> {
    let mut steps = Vec::new();
    sequence(&mut steps, &NORMAL_MESSAGES[..4], 4000.0, (0.0, 30.0), false);
    sequence(&mut steps, &COMMODORE_MESSAGES, 5000.0, (30.0, 50.0), true);
    // The bar holds where the retro load stalled
    let stalled_at = steps.last().map(|s| s.progress).unwrap_or(30.0);
    steps.push(LoaderStep {
        message: "WRONG SYSTEM DETECTED!",
        progress: stalled_at,
        duration_ms: 1000.0,
        retro: true,
    });
    sequence(&mut steps, &NORMAL_MESSAGES[4..7], 3000.0, (50.0, 70.0), false);
    sequence(&mut steps, &FILE_BROWSING_MESSAGES, 6000.0, (70.0, 90.0), false);
    sequence(&mut steps, &NORMAL_MESSAGES[7..], 2000.0, (90.0, 100.0), false);
    steps.push(LoaderStep {
        message: "Loading complete!",
        progress: 100.0,
        duration_ms: 500.0,
        retro: false,
    });
    steps
}

/// Where the loader is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderStatus {
    /// "Press any key" prompt
    WaitingForKey,
    /// Showing step `n`
    Running(usize),
    /// Loader hidden, menu may show
    Done,
}

/// What the loader overlay should display
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderView {
    pub visible: bool,
    pub press_play: bool,
    pub message: &'static str,
    pub progress: f32,
    pub retro: bool,
}

/// Runs the boot script
#[derive(Debug, Clone)]
pub struct Loader {
    steps: Vec<LoaderStep>,
    status: LoaderStatus,
    step_elapsed_ms: f64,
}

impl Loader {
    /// A loader waiting for a key, or already done when `skip` is set
    pub fn new(skip: bool) -> Self {
        Self {
            steps: script(),
            status: if skip {
                LoaderStatus::Done
            } else {
                LoaderStatus::WaitingForKey
            },
            step_elapsed_ms: 0.0,
        }
    }

    pub fn status(&self) -> LoaderStatus {
        self.status
    }

    pub fn is_done(&self) -> bool {
        self.status == LoaderStatus::Done
    }

    /// Any key starts the sequence; later presses are ignored
    pub fn key_pressed(&mut self) {
        if self.status == LoaderStatus::WaitingForKey {
            log::info!("Loader started");
            self.status = LoaderStatus::Running(0);
            self.step_elapsed_ms = 0.0;
        }
    }

    /// Advance by wall-clock milliseconds; returns true when the loader just finished
    pub fn advance(&mut self, dt_ms: f64) -> bool {
        let LoaderStatus::Running(mut index) = self.status else {
            return false;
        };
        self.step_elapsed_ms += dt_ms.max(0.0);

        while self.step_elapsed_ms >= self.steps[index].duration_ms {
            self.step_elapsed_ms -= self.steps[index].duration_ms;
            index += 1;
            if index >= self.steps.len() {
                log::info!("Loader complete");
                self.status = LoaderStatus::Done;
                return true;
            }
        }
        self.status = LoaderStatus::Running(index);
        false
    }

    pub fn view(&self) -> LoaderView {
        match self.status {
            LoaderStatus::WaitingForKey => LoaderView {
                visible: true,
                press_play: true,
                message: "",
                progress: 0.0,
                retro: false,
            },
            LoaderStatus::Running(index) => {
                let step = &self.steps[index];
                LoaderView {
                    visible: true,
                    press_play: false,
                    message: step.message,
                    progress: step.progress,
                    retro: step.retro,
                }
            }
            LoaderStatus::Done => LoaderView {
                visible: false,
                press_play: false,
                message: "",
                progress: 100.0,
                retro: false,
            },
        }
    }

    /// Total scripted time once started
    pub fn total_ms(&self) -> f64 {
        self.steps.iter().map(|s| s.duration_ms).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_shape() {
        let steps = script();
        assert_eq!(steps.len(), 4 + 6 + 1 + 3 + 8 + 3 + 1);
        assert_eq!(steps[0].message, "Initializing quantum flux capacitor...");
        assert_eq!(steps[4].message, "LOAD \"*\",8,1");
        assert_eq!(steps[10].message, "WRONG SYSTEM DETECTED!");
        assert_eq!(steps.last().map(|s| s.message), Some("Loading complete!"));

        for pair in steps.windows(2) {
            assert!(pair[1].progress >= pair[0].progress);
        }
        assert!(steps.iter().all(|s| s.progress <= 100.0));
    }

    #[test]
    fn test_total_duration() {
        let loader = Loader::new(false);
        assert!((loader.total_ms() - 21_500.0).abs() < 1e-6);
    }

    #[test]
    fn test_waits_for_key() {
        let mut loader = Loader::new(false);
        assert!(!loader.advance(60_000.0));
        assert_eq!(loader.status(), LoaderStatus::WaitingForKey);
        assert!(loader.view().press_play);

        loader.key_pressed();
        assert_eq!(loader.status(), LoaderStatus::Running(0));
        assert!(!loader.view().press_play);
    }

    #[test]
    fn test_runs_to_completion() {
        let mut loader = Loader::new(false);
        loader.key_pressed();

        assert!(!loader.advance(999.0));
        assert_eq!(loader.status(), LoaderStatus::Running(0));
        assert!(!loader.advance(1.0));
        assert_eq!(loader.status(), LoaderStatus::Running(1));

        // Jump into the retro section
        assert!(!loader.advance(3000.0));
        assert!(loader.view().retro);

        let mut finished = false;
        for _ in 0..2000 {
            if loader.advance(16.0) {
                finished = true;
                break;
            }
        }
        assert!(finished);
        assert!(loader.is_done());
        assert!(!loader.view().visible);
        assert!(!loader.advance(16.0));
    }

    #[test]
    fn test_skip_flag() {
        let loader = Loader::new(true);
        assert!(loader.is_done());
        assert!(!loader.view().visible);
    }
}
