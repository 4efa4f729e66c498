use std::time::{Duration, Instant};

use crate::{
    foundation::error::{LyricError, LyricResult},
    surface::RenderSurface,
};

/// How the exporter decides a seek has been drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettlePolicy {
    /// Pump the surface until its generation counter moves past the value sampled before the
    /// seek. Fails with an encoding error after `timeout`.
    RenderGeneration { timeout: Duration, poll: Duration },
    /// Pump once, then wait a fixed time and assume the surface caught up.
    FixedDelay(Duration),
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self::RenderGeneration {
            timeout: Duration::from_secs(2),
            poll: Duration::from_millis(1),
        }
    }
}

/// Blocks until `surface` reflects time `t`. `before` is the generation sampled before the
/// redraw request.
pub(crate) fn settle(
    surface: &mut dyn RenderSurface,
    t: f64,
    before: u64,
    policy: SettlePolicy,
) -> LyricResult<()> {
    match policy {
        SettlePolicy::RenderGeneration { timeout, poll } => {
            let deadline = Instant::now() + timeout;
            loop {
                surface.pump(t)?;
                if surface.generation() > before {
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    return Err(LyricError::encoding(format!(
                        "surface did not redraw within {timeout:?} (t={t:.3}s)"
                    )));
                }
                std::thread::sleep(poll);
            }
        }
        SettlePolicy::FixedDelay(delay) => {
            surface.pump(t)?;
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            Ok(())
        }
    }
}
