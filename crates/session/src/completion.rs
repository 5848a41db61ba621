// Decides whether closing or finishing should ask the user to mark the item complete

/// Which completion question to ask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPrompt {
    /// Closed late in the item; `percent` is the watched share, rounded
    AlmostFinished { percent: u8 },
    /// The stream reached its end
    EndReached,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionPolicy {
    threshold: f64,
}

impl CompletionPolicy {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Prompt for a user-initiated close at `current_time` of `duration`
    pub fn on_close(&self, current_time: f64, duration: Option<f64>) -> Option<CompletionPrompt> {
        let duration = duration.filter(|d| d.is_finite() && *d > 0.0)?;
        let fraction = (current_time / duration).clamp(0.0, 1.0);
        if fraction >= self.threshold {
            Some(CompletionPrompt::AlmostFinished {
                percent: (fraction * 100.0).round() as u8,
            })
        } else {
            None
        }
    }

    pub fn on_ended(&self) -> CompletionPrompt {
        CompletionPrompt::EndReached
    }
}

impl Default for CompletionPolicy {
    fn default() -> Self {
        Self::new(marquee_core::config::DEFAULT_COMPLETION_THRESHOLD)
    }
}
